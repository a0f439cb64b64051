//! Kubeflow training job resources.
//!
//! These mirror the parts of the `kubeflow.org/v1` TFJob and PyTorchJob schemas that the
//! generator fills in. The training operators own the real definitions; the `crdgen` binary
//! only emits these for local test clusters.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Container name the TF operator looks for in every replica.
pub const TF_CONTAINER_NAME: &str = "tensorflow";
/// Container name the PyTorch operator looks for in every replica.
pub const PYTORCH_CONTAINER_NAME: &str = "pytorch";

/// Which pods the operator deletes once the job finishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum CleanPodPolicy {
    All,
    #[default]
    Running,
    None,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default)]
    pub template: PodTemplateSpec,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum TFReplicaType {
    PS,
    Worker,
}

#[derive(CustomResource, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeflow.org",
    version = "v1",
    kind = "TFJob",
    plural = "tfjobs",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct TFJobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_pod_policy: Option<CleanPodPolicy>,
    pub tf_replica_specs: BTreeMap<TFReplicaType, ReplicaSpec>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PyTorchReplicaType {
    Master,
    Worker,
}

#[derive(CustomResource, Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeflow.org",
    version = "v1",
    kind = "PyTorchJob",
    plural = "pytorchjobs",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct PyTorchJobSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean_pod_policy: Option<CleanPodPolicy>,
    pub pytorch_replica_specs: BTreeMap<PyTorchReplicaType, ReplicaSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::{CustomResourceExt, Resource};

    #[test]
    fn kinds_match_the_training_operators() {
        assert_eq!(TFJob::kind(&()), "TFJob");
        assert_eq!(PyTorchJob::kind(&()), "PyTorchJob");
        assert_eq!(TFJob::api_version(&()), "kubeflow.org/v1");
        assert_eq!(TFJob::crd_name(), "tfjobs.kubeflow.org");
        assert_eq!(PyTorchJob::crd_name(), "pytorchjobs.kubeflow.org");
    }

    #[test]
    fn replica_specs_serialize_with_operator_field_names() {
        let spec = TFJobSpec {
            clean_pod_policy: Some(CleanPodPolicy::All),
            tf_replica_specs: BTreeMap::from([(
                TFReplicaType::PS,
                ReplicaSpec {
                    replicas: Some(1),
                    ..Default::default()
                },
            )]),
        };
        let value = serde_json::to_value(TFJob::new("mnist-1", spec)).unwrap();

        assert_eq!(value["kind"], "TFJob");
        assert_eq!(value["apiVersion"], "kubeflow.org/v1");
        assert_eq!(value["spec"]["cleanPodPolicy"], "All");
        assert_eq!(value["spec"]["tfReplicaSpecs"]["PS"]["replicas"], 1);
    }
}
