use thiserror::Error;

use crate::resource::ReplicaRole;

/// A role's resource specification could not be turned into limits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("invalid {resource} quantity {value:?} for {role} replicas")]
    InvalidQuantity {
        role: ReplicaRole,
        resource: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{role} replica count {count} does not fit in a 32-bit integer")]
    ReplicaOverflow { role: ReplicaRole, count: u32 },
}

#[derive(Debug, Error)]
pub enum BuildError {
    /// Writing the source or Dockerfile into the staging directory failed
    #[error("failed to stage build context: {0}")]
    Stage(#[from] std::io::Error),

    /// The external build tool could not be started at all
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("failed to build image {image}: {output}")]
    Build { image: String, output: String },

    #[error("failed to push image {image}: {output}")]
    Push { image: String, output: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown framework '{0}', expected 'tensorflow' or 'pytorch'")]
pub struct ParseFrameworkError(pub String);
