use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use kfjob_core::{JobGenerator, JobRequest, PyTorchJob, TFJob, TrainingJob};
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::{info, warn};

use crate::config::Config;
use crate::providers;
use crate::spinner::create_spinner;

const FIELD_MANAGER: &str = "kfjob";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

pub fn handle_generate(config: &Config, request: &Path, image: Option<String>, output: OutputFormat) -> Result<()> {
    let mut request = load_request(request)?;
    if let Some(image) = image {
        request = request.with_image(image);
    }
    let job = generate(&config.namespace, &request)?;
    println!("{}", render(&job, output)?);
    Ok(())
}

pub fn handle_build(config: &Config, request: &Path, source: &Path) -> Result<()> {
    let request = load_request(request)?;
    let image = build_image(config, source, &request)?;
    println!("{}", image);
    Ok(())
}

pub fn handle_run(config: &Config, request: &Path, source: &Path, output: OutputFormat) -> Result<()> {
    let request = load_request(request)?;
    let image = build_image(config, source, &request)?;
    let job = generate(&config.namespace, &request.with_image(image))?;
    println!("{}", render(&job, output)?);
    Ok(())
}

pub fn handle_submit(config: &Config, request: &Path, source: Option<&Path>) -> Result<()> {
    let mut request = load_request(request)?;
    if let Some(source) = source {
        let image = build_image(config, source, &request)?;
        request = request.with_image(image);
    }
    let job = generate(&config.namespace, &request)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let spinner = create_spinner(format!("Submitting {} {}...", job.kind(), job.name()));
    match runtime.block_on(apply(&job, &config.namespace)) {
        Ok(()) => {
            spinner.finish_with_message(format!("Submitted {} {} to namespace {}", job.kind(), job.name(), config.namespace));
            Ok(())
        }
        Err(e) => {
            spinner.abandon_with_message("Submission failed");
            Err(e)
        }
    }
}

pub fn load_request(path: &Path) -> Result<JobRequest> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read job request {}", path.display()))?;
    let request: JobRequest = toml::from_str(&content)
        .with_context(|| format!("Failed to parse job request {}", path.display()))?;
    Ok(request)
}

fn build_image(config: &Config, source: &Path, request: &JobRequest) -> Result<String> {
    let code = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;
    let builder = providers::create_builder(&config.builder)?;

    let spinner = create_spinner(format!("Building image for {}...", request.generate_name()));
    match builder.source_to_image(&code, request) {
        Ok(image) => {
            spinner.finish_and_clear();
            info!(image = %image, "image ready");
            Ok(image)
        }
        Err(e) => {
            spinner.abandon_with_message("Image build failed");
            Err(e).context(format!("Failed to build image for {}", request.generate_name()))
        }
    }
}

fn generate(namespace: &str, request: &JobRequest) -> Result<TrainingJob> {
    if request.image().is_empty() {
        warn!(name = request.generate_name(), "request has no image, containers will have an empty image");
    }
    let job = JobGenerator::new(namespace)
        .generate(request)
        .with_context(|| format!("Failed to generate {} job {}", request.framework(), request.generate_name()))?;
    Ok(job)
}

pub fn render(job: &TrainingJob, format: OutputFormat) -> Result<String> {
    let text = match format {
        OutputFormat::Yaml => serde_yaml::to_string(job)?,
        OutputFormat::Json => serde_json::to_string_pretty(job)?,
    };
    Ok(text)
}

async fn apply(job: &TrainingJob, namespace: &str) -> Result<()> {
    let client = Client::try_default()
        .await
        .context("Failed to connect to the Kubernetes cluster")?;
    let params = PatchParams::apply(FIELD_MANAGER);

    match job {
        TrainingJob::TensorFlow(job) => {
            let api: Api<TFJob> = Api::namespaced(client, namespace);
            api.patch(&job.name_any(), &params, &Patch::Apply(job)).await?;
        }
        TrainingJob::PyTorch(job) => {
            let api: Api<PyTorchJob> = Api::namespaced(client, namespace);
            api.patch(&job.name_any(), &params, &Patch::Apply(job)).await?;
        }
    }
    Ok(())
}
