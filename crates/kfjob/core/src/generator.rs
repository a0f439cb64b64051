use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec, ResourceRequirements};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use tracing::debug;

use crate::crd::{
    PYTORCH_CONTAINER_NAME, PyTorchJob, PyTorchJobSpec, PyTorchReplicaType, ReplicaSpec,
    TF_CONTAINER_NAME, TFJob, TFJobSpec, TFReplicaType,
};
use crate::error::GenerateError;
use crate::request::{Framework, JobRequest};
use crate::resource::{Limits, ReplicaRole, ResourceLimits};

/// Builds Kubeflow job objects for a single namespace.
///
/// The namespace is fixed when the generator is created so every job it produces lands in
/// the same place, whatever the request says.
#[derive(Debug, Clone)]
pub struct JobGenerator {
    namespace: String,
}

/// A generated job of either supported framework.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrainingJob {
    TensorFlow(TFJob),
    PyTorch(PyTorchJob),
}

impl TrainingJob {
    pub fn kind(&self) -> &'static str {
        match self {
            TrainingJob::TensorFlow(_) => "TFJob",
            TrainingJob::PyTorch(_) => "PyTorchJob",
        }
    }

    pub fn name(&self) -> String {
        match self {
            TrainingJob::TensorFlow(job) => job.name_any(),
            TrainingJob::PyTorch(job) => job.name_any(),
        }
    }
}

impl JobGenerator {
    pub fn new(namespace: impl Into<String>) -> Self {
        JobGenerator {
            namespace: namespace.into(),
        }
    }

    /// Generates the job object matching the request's framework.
    pub fn generate(&self, request: &JobRequest) -> Result<TrainingJob, GenerateError> {
        match request.framework() {
            Framework::TensorFlow => self.generate_tf_job(request).map(TrainingJob::TensorFlow),
            Framework::PyTorch => self.generate_pytorch_job(request).map(TrainingJob::PyTorch),
        }
    }

    pub fn generate_tf_job(&self, request: &JobRequest) -> Result<TFJob, GenerateError> {
        let replicas = request.replicas();
        let ps_count = narrow(ReplicaRole::PS, replicas.ps)?;
        let worker_count = narrow(ReplicaRole::Worker, replicas.worker)?;
        let clean_pod_policy = request.clean_pod_policy();

        let ps_limits = request.resources().ps_limits()?;
        let worker_limits = request.resources().worker_limits()?;

        let spec = TFJobSpec {
            clean_pod_policy: Some(clean_pod_policy),
            tf_replica_specs: BTreeMap::from([
                (
                    TFReplicaType::PS,
                    replica_spec(TF_CONTAINER_NAME, request.image(), ps_count, ps_limits),
                ),
                (
                    TFReplicaType::Worker,
                    replica_spec(TF_CONTAINER_NAME, request.image(), worker_count, worker_limits),
                ),
            ]),
        };

        let mut job = TFJob::new(request.generate_name(), spec);
        job.meta_mut().namespace = Some(self.namespace.clone());

        debug!(
            name = request.generate_name(),
            namespace = %self.namespace,
            ps = ps_count,
            worker = worker_count,
            "generated TFJob"
        );
        Ok(job)
    }

    pub fn generate_pytorch_job(&self, request: &JobRequest) -> Result<PyTorchJob, GenerateError> {
        let replicas = request.replicas();
        let master_count = narrow(ReplicaRole::Master, replicas.master)?;
        let worker_count = narrow(ReplicaRole::Worker, replicas.worker)?;
        let clean_pod_policy = request.clean_pod_policy();

        let master_limits = request.resources().master_limits()?;
        let worker_limits = request.resources().worker_limits()?;

        let spec = PyTorchJobSpec {
            clean_pod_policy: Some(clean_pod_policy),
            pytorch_replica_specs: BTreeMap::from([
                (
                    PyTorchReplicaType::Master,
                    replica_spec(PYTORCH_CONTAINER_NAME, request.image(), master_count, master_limits),
                ),
                (
                    PyTorchReplicaType::Worker,
                    replica_spec(PYTORCH_CONTAINER_NAME, request.image(), worker_count, worker_limits),
                ),
            ]),
        };

        let mut job = PyTorchJob::new(request.generate_name(), spec);
        job.meta_mut().namespace = Some(self.namespace.clone());

        debug!(
            name = request.generate_name(),
            namespace = %self.namespace,
            master = master_count,
            worker = worker_count,
            "generated PyTorchJob"
        );
        Ok(job)
    }
}

fn narrow(role: ReplicaRole, count: u32) -> Result<i32, GenerateError> {
    i32::try_from(count).map_err(|_| GenerateError::ReplicaOverflow { role, count })
}

/// One pod template with a single container. Only limits are set, never requests.
fn replica_spec(container_name: &str, image: &str, replicas: i32, limits: Limits) -> ReplicaSpec {
    let resources = (!limits.is_empty()).then(|| ResourceRequirements {
        limits: Some(limits),
        ..Default::default()
    });

    ReplicaSpec {
        replicas: Some(replicas),
        template: PodTemplateSpec {
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: container_name.to_string(),
                    image: Some(image.to_string()),
                    resources,
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        },
    }
}
