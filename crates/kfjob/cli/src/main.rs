use std::path::PathBuf;

use anyhow::Result;
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod config;
mod job;
mod providers;
mod spinner;

use job::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "kfjob")]
#[command(about = "kfjob - Build images from training code and generate Kubeflow training jobs")]
struct Args {
    /// Config file, defaults to ~/.kfjob/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log more (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs, Debug)]
struct JobArgs {
    /// Job request file (TOML)
    #[arg(short, long)]
    request: PathBuf,
    /// Namespace for the generated job, overrides the config
    #[arg(short, long)]
    namespace: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct BuilderArgs {
    /// Builder provider ("img" or "mock"), overrides the config
    #[arg(short, long)]
    builder: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the job object for a request
    Generate {
        #[command(flatten)]
        target: JobArgs,
        /// Image to run, overrides the one in the request
        #[arg(short, long)]
        image: Option<String>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
    /// Build and push an image from source code
    Build {
        #[command(flatten)]
        target: JobArgs,
        #[command(flatten)]
        builder: BuilderArgs,
        /// Training code to bake into the image
        #[arg(short, long)]
        source: PathBuf,
    },
    /// Build an image, then print the job object that runs it
    Run {
        #[command(flatten)]
        target: JobArgs,
        #[command(flatten)]
        builder: BuilderArgs,
        #[arg(short, long)]
        source: PathBuf,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,
    },
    /// Generate a job (building its image first if a source is given) and apply it to the cluster
    Submit {
        #[command(flatten)]
        target: JobArgs,
        #[command(flatten)]
        builder: BuilderArgs,
        #[arg(short, long)]
        source: Option<PathBuf>,
    },
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = dispatch(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(args: Args) -> Result<()> {
    let mut config = config::load(args.config.as_deref())?;

    let (target, builder) = match &args.command {
        Commands::Generate { target, .. } => (target, None),
        Commands::Build { target, builder, .. }
        | Commands::Run { target, builder, .. }
        | Commands::Submit { target, builder, .. } => (target, Some(builder)),
    };
    if let Some(namespace) = &target.namespace {
        config.namespace = namespace.clone();
    }
    if let Some(provider) = builder.and_then(|b| b.builder.as_ref()) {
        config.builder.provider = provider.clone();
    }

    match args.command {
        Commands::Generate { target, image, output } => {
            job::handle_generate(&config, &target.request, image, output)
        }
        Commands::Build { target, source, .. } => job::handle_build(&config, &target.request, &source),
        Commands::Run { target, source, output, .. } => {
            job::handle_run(&config, &target.request, &source, output)
        }
        Commands::Submit { target, source, .. } => {
            job::handle_submit(&config, &target.request, source.as_deref())
        }
    }
}
