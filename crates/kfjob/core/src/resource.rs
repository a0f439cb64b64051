//! Per-role resource limits.
//!
//! Requests carry resources as plain strings (`cpu = "500m"`). Resolving them into
//! `Quantity` values happens here, one role at a time, so the generator never deals with
//! the raw form.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

pub const CPU: &str = "cpu";
pub const MEMORY: &str = "memory";
pub const GPU: &str = "nvidia.com/gpu";

/// Resource name to quantity, ready to drop into a container's `resources.limits`.
pub type Limits = BTreeMap<String, Quantity>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaRole {
    PS,
    Worker,
    Master,
}

impl fmt::Display for ReplicaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicaRole::PS => write!(f, "PS"),
            ReplicaRole::Worker => write!(f, "Worker"),
            ReplicaRole::Master => write!(f, "Master"),
        }
    }
}

/// Role-scoped access to resource limits.
pub trait ResourceLimits {
    fn ps_limits(&self) -> Result<Limits, ResolveError>;
    fn worker_limits(&self) -> Result<Limits, ResolveError>;
    fn master_limits(&self) -> Result<Limits, ResolveError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu: Option<String>,
}

/// Resources for every role of a job. A role left out gets no limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps: Option<RoleResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker: Option<RoleResources>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master: Option<RoleResources>,
}

impl ResourceLimits for Resources {
    fn ps_limits(&self) -> Result<Limits, ResolveError> {
        resolve(ReplicaRole::PS, self.ps.as_ref())
    }

    fn worker_limits(&self) -> Result<Limits, ResolveError> {
        resolve(ReplicaRole::Worker, self.worker.as_ref())
    }

    fn master_limits(&self) -> Result<Limits, ResolveError> {
        resolve(ReplicaRole::Master, self.master.as_ref())
    }
}

/// Resolves one role's resources into limits, failing on the first malformed quantity.
pub fn resolve(role: ReplicaRole, resources: Option<&RoleResources>) -> Result<Limits, ResolveError> {
    let Some(resources) = resources else {
        return Ok(Limits::new());
    };

    [
        (CPU, resources.cpu.as_deref()),
        (MEMORY, resources.memory.as_deref()),
        (GPU, resources.gpu.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|value| (name, value)))
    .map(|(name, value)| {
        parse_quantity(value)
            .map(|quantity| (name.to_string(), quantity))
            .ok_or_else(|| ResolveError::InvalidQuantity {
                role,
                resource: name.to_string(),
                value: value.to_string(),
            })
    })
    .collect()
}

/// Accepts values in the Kubernetes quantity form: a signed decimal followed by an
/// optional binary (`Ki`..`Ei`), decimal (`n`..`E`) or exponent (`e3`) suffix.
pub fn parse_quantity(value: &str) -> Option<Quantity> {
    let value = value.trim();
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    let split = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(split);

    if !number.bytes().any(|b| b.is_ascii_digit()) || number.matches('.').count() > 1 {
        return None;
    }

    let suffix_ok = match suffix {
        "" | "Ki" | "Mi" | "Gi" | "Ti" | "Pi" | "Ei" => true,
        "n" | "u" | "m" | "k" | "M" | "G" | "T" | "P" | "E" => true,
        _ => is_exponent(suffix),
    };

    suffix_ok.then(|| Quantity(value.to_string()))
}

fn is_exponent(suffix: &str) -> bool {
    let Some(exponent) = suffix.strip_prefix(['e', 'E']) else {
        return false;
    };
    let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(cpu: &str, memory: &str) -> RoleResources {
        RoleResources {
            cpu: Some(cpu.to_string()),
            memory: Some(memory.to_string()),
            gpu: None,
        }
    }

    #[test]
    fn accepts_common_quantity_forms() {
        for value in ["1", "500m", "0.5", ".5", "2Gi", "128Mi", "1e3", "1E-2", "+4", "3k", " 2Gi "] {
            assert!(parse_quantity(value).is_some(), "{value} should parse");
        }
    }

    #[test]
    fn rejects_malformed_quantities() {
        for value in ["", "   ", "Gi", "lots", "1.2.3", "2GB", "1e", "-", "1 Gi"] {
            assert!(parse_quantity(value).is_none(), "{value} should not parse");
        }
    }

    #[test]
    fn resolves_configured_resources_by_name() {
        let resources = Resources {
            worker: Some(RoleResources {
                gpu: Some("2".to_string()),
                ..role("4", "8Gi")
            }),
            ..Default::default()
        };

        let limits = resources.worker_limits().unwrap();
        assert_eq!(limits.len(), 3);
        assert_eq!(limits[CPU], Quantity("4".to_string()));
        assert_eq!(limits[MEMORY], Quantity("8Gi".to_string()));
        assert_eq!(limits[GPU], Quantity("2".to_string()));
    }

    #[test]
    fn missing_role_resolves_to_no_limits() {
        let resources = Resources::default();
        assert!(resources.ps_limits().unwrap().is_empty());
        assert!(resources.master_limits().unwrap().is_empty());
    }

    #[test]
    fn malformed_quantity_names_the_role_and_resource() {
        let resources = Resources {
            master: Some(role("2", "a lot")),
            ..Default::default()
        };

        assert_eq!(
            resources.master_limits(),
            Err(ResolveError::InvalidQuantity {
                role: ReplicaRole::Master,
                resource: MEMORY.to_string(),
                value: "a lot".to_string(),
            })
        );
    }
}
