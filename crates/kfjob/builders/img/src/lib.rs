//! Builds and pushes job images with the `img` tool.
//!
//! Each build goes through Staging (source and Dockerfile written to a fresh temporary
//! directory), Building (`img build`), Pushing (`img push`) and ends in Done or Failed.
//! There are no retries; the first failure is returned as is and a built but unpushed image
//! stays in the local store.

mod runner;
mod templates;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use kfjob_core::{BuildError, ImageBuilder, JobRequest};
use tempfile::TempDir;
use tracing::{debug, info, warn};

pub use runner::{CommandOutput, CommandRunner, SystemRunner};
pub use templates::{DockerfileTemplates, PYTORCH_TEMPLATE, TENSORFLOW_TEMPLATE};

pub const DEFAULT_PROGRAM: &str = "img";
pub const DEFAULT_OWNER: &str = "kfjob";

const WORKDIR_PREFIX: &str = "kfjob-code.";
const CODE_FILE: &str = "code.py";
const DOCKERFILE: &str = "Dockerfile";
const IMAGE_TAG: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Staging,
    Building,
    Pushing,
    Done,
    Failed,
}

pub struct ImgBuilder<R = SystemRunner> {
    owner: String,
    program: String,
    templates: DockerfileTemplates,
    runner: R,
    work_root: Option<PathBuf>,
    keep_workdir: bool,
    // img shares one local image store between invocations
    store: Mutex<()>,
}

impl ImgBuilder {
    pub fn new(owner: impl Into<String>) -> Self {
        ImgBuilder::with_runner(owner, SystemRunner)
    }
}

impl<R: CommandRunner> ImgBuilder<R> {
    pub fn with_runner(owner: impl Into<String>, runner: R) -> Self {
        ImgBuilder {
            owner: owner.into(),
            program: DEFAULT_PROGRAM.to_string(),
            templates: DockerfileTemplates::default(),
            runner,
            work_root: None,
            keep_workdir: false,
            store: Mutex::new(()),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_templates(mut self, templates: DockerfileTemplates) -> Self {
        self.templates = templates;
        self
    }

    /// Directory staging directories are created in. Defaults to the system temp dir.
    pub fn with_work_root(mut self, work_root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(work_root.into());
        self
    }

    /// Leave staging directories on disk after the build instead of removing them.
    pub fn with_keep_workdir(mut self, keep_workdir: bool) -> Self {
        self.keep_workdir = keep_workdir;
        self
    }

    /// `<owner>/<generate-name>:v1`
    pub fn image_name(&self, request: &JobRequest) -> String {
        format!("{}/{}:{}", self.owner, request.generate_name(), IMAGE_TAG)
    }

    /// Prepares a build without running it, so its state can be inspected along the way.
    pub fn start<'a>(&'a self, code: &'a str, request: &'a JobRequest) -> BuildRun<'a, R> {
        BuildRun {
            builder: self,
            code,
            request,
            image: self.image_name(request),
            history: Vec::new(),
        }
    }

    fn invoke(&self, args: Vec<OsString>) -> Result<CommandOutput, BuildError> {
        debug!(program = %self.program, ?args, "running build tool");
        self.runner
            .run(&self.program, &args)
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl<R: CommandRunner> ImageBuilder for ImgBuilder<R> {
    fn source_to_image(&self, code: &str, request: &JobRequest) -> Result<String, BuildError> {
        self.start(code, request).run()
    }
}

/// A single pass through the build state machine.
pub struct BuildRun<'a, R> {
    builder: &'a ImgBuilder<R>,
    code: &'a str,
    request: &'a JobRequest,
    image: String,
    history: Vec<BuildState>,
}

impl<'a, R: CommandRunner> BuildRun<'a, R> {
    /// Latest state, `None` before the run starts.
    pub fn state(&self) -> Option<BuildState> {
        self.history.last().copied()
    }

    pub fn history(&self) -> &[BuildState] {
        &self.history
    }

    pub fn run(&mut self) -> Result<String, BuildError> {
        match self.drive() {
            Ok(image) => {
                self.enter(BuildState::Done);
                info!(image = %image, "image pushed");
                Ok(image)
            }
            Err(err) => {
                self.enter(BuildState::Failed);
                warn!(image = %self.image, error = %err, "image build failed");
                Err(err)
            }
        }
    }

    fn drive(&mut self) -> Result<String, BuildError> {
        let builder = self.builder;

        self.enter(BuildState::Staging);
        let workdir = self.stage()?;

        let _store = builder.store.lock().unwrap_or_else(PoisonError::into_inner);

        self.enter(BuildState::Building);
        let output = builder.invoke(vec![
            "build".into(),
            "-t".into(),
            self.image.clone().into(),
            workdir.path().into(),
        ])?;
        if !output.success {
            return Err(BuildError::Build {
                image: self.image.clone(),
                output: output.combined(),
            });
        }

        self.enter(BuildState::Pushing);
        let output = builder.invoke(vec!["push".into(), self.image.clone().into()])?;
        if !output.success {
            return Err(BuildError::Push {
                image: self.image.clone(),
                output: output.combined(),
            });
        }

        if builder.keep_workdir {
            let kept = workdir.keep();
            info!(path = %kept.display(), "kept staging directory");
        }
        Ok(self.image.clone())
    }

    fn stage(&self) -> Result<TempDir, BuildError> {
        let builder = self.builder;
        let mut tempdir = tempfile::Builder::new();
        tempdir.prefix(WORKDIR_PREFIX);
        let workdir = match &builder.work_root {
            Some(root) => tempdir.tempdir_in(root)?,
            None => tempdir.tempdir()?,
        };

        write_context(
            workdir.path(),
            self.code,
            builder.templates.select(self.request.framework()),
        )?;
        debug!(path = %workdir.path().display(), "staged build context");
        Ok(workdir)
    }

    fn enter(&mut self, state: BuildState) {
        debug!(image = %self.image, ?state, "build state");
        self.history.push(state);
    }
}

fn write_context(dir: &Path, code: &str, dockerfile: &str) -> std::io::Result<()> {
    fs::write(dir.join(CODE_FILE), code)?;
    fs::write(dir.join(DOCKERFILE), dockerfile)
}
