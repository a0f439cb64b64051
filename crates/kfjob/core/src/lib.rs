pub mod crd;
pub mod error;
pub mod generator;
pub mod request;
pub mod resource;

pub use crd::{CleanPodPolicy, PyTorchJob, TFJob};
pub use error::{BuildError, GenerateError, ParseFrameworkError, ResolveError};
pub use generator::{JobGenerator, TrainingJob};
pub use request::{Framework, JobRequest, Replicas};
pub use resource::{ReplicaRole, ResourceLimits, Resources, RoleResources};

/// Turns user source code into a pushed container image.
///
/// Implementations are picked when the application is wired together (see the
/// `builder.provider` config key), never by looking at the request itself.
pub trait ImageBuilder: Send + Sync {
    /// Returns the image reference the job's containers should run.
    fn source_to_image(&self, code: &str, request: &JobRequest) -> Result<String, BuildError>;
}
