use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::crd::CleanPodPolicy;
use crate::error::ParseFrameworkError;
use crate::resource::Resources;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    TensorFlow,
    PyTorch,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framework::TensorFlow => write!(f, "tensorflow"),
            Framework::PyTorch => write!(f, "pytorch"),
        }
    }
}

impl FromStr for Framework {
    type Err = ParseFrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tensorflow" => Ok(Framework::TensorFlow),
            "pytorch" => Ok(Framework::PyTorch),
            _ => Err(ParseFrameworkError(s.to_string())),
        }
    }
}

/// Replica counts per role. TensorFlow jobs use `ps` and `worker`, PyTorch jobs use
/// `master` and `worker`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replicas {
    #[serde(default)]
    pub ps: u32,
    #[serde(default)]
    pub worker: u32,
    #[serde(default)]
    pub master: u32,
}

/// A distributed training job as the user asked for it.
///
/// Requests are immutable: the `with_*` methods hand back a new value, which is how the
/// image produced by an [`ImageBuilder`](crate::ImageBuilder) gets attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct JobRequest {
    generate_name: String,
    framework: Framework,
    #[serde(default)]
    image: String,
    #[serde(default)]
    replicas: Replicas,
    #[serde(default)]
    clean_pod_policy: CleanPodPolicy,
    #[serde(default)]
    resources: Resources,
}

impl JobRequest {
    pub fn new(generate_name: impl Into<String>, framework: Framework) -> Self {
        JobRequest {
            generate_name: generate_name.into(),
            framework,
            image: String::new(),
            replicas: Replicas::default(),
            clean_pod_policy: CleanPodPolicy::default(),
            resources: Resources::default(),
        }
    }

    pub fn with_image(self, image: impl Into<String>) -> Self {
        JobRequest {
            image: image.into(),
            ..self
        }
    }

    pub fn with_replicas(self, replicas: Replicas) -> Self {
        JobRequest { replicas, ..self }
    }

    pub fn with_clean_pod_policy(self, clean_pod_policy: CleanPodPolicy) -> Self {
        JobRequest {
            clean_pod_policy,
            ..self
        }
    }

    pub fn with_resources(self, resources: Resources) -> Self {
        JobRequest { resources, ..self }
    }

    pub fn generate_name(&self) -> &str {
        &self.generate_name
    }

    pub fn framework(&self) -> Framework {
        self.framework
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn replicas(&self) -> Replicas {
        self.replicas
    }

    pub fn clean_pod_policy(&self) -> CleanPodPolicy {
        self.clean_pod_policy
    }

    pub fn resources(&self) -> &Resources {
        &self.resources
    }
}
