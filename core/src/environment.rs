use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("environment must list at least one namespace")]
    EmptyNamespaces,
    #[error("environment references unknown schedule {0:?}")]
    UnknownSchedule(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPolicy {
    pub size: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEnvironment {
    pub namespaces: Vec<String>,
    pub schedule: String,
    #[serde(default, rename = "batch")]
    pub batch: Option<RawBatchPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawBatchPolicy {
    pub size: u32,
    pub timeout: u64,
}

/// A named, ordered group of Kubernetes namespaces managed as one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Environment {
    pub namespaces: Vec<String>,
    pub schedule: String,
    pub batch: Option<BatchPolicy>,
}

impl RawEnvironment {
    /// Validates namespace non-emptiness. Schedule-name resolution is the
    /// caller's responsibility (it needs the full set of declared schedules).
    pub fn validate(self) -> Result<Environment, EnvironmentError> {
        if self.namespaces.is_empty() {
            return Err(EnvironmentError::EmptyNamespaces);
        }
        Ok(Environment {
            namespaces: self.namespaces,
            schedule: self.schedule,
            batch: self.batch.map(|b| BatchPolicy {
                size: b.size,
                timeout_seconds: b.timeout,
            }),
        })
    }
}

/// Point-in-time snapshot of a namespace's workloads, fetched from the
/// cluster on demand and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamespaceState {
    pub pods: u32,
    pub cpu: f64,
    pub memory: u64,
}

impl NamespaceState {
    pub fn is_up(&self) -> bool {
        self.pods > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_namespaces() {
        let raw = RawEnvironment {
            namespaces: vec![],
            schedule: "main".into(),
            batch: None,
        };
        assert_eq!(raw.validate().unwrap_err(), EnvironmentError::EmptyNamespaces);
    }

    #[test]
    fn namespace_state_is_up_iff_pods_positive() {
        assert!(!NamespaceState { pods: 0, cpu: 0.0, memory: 0 }.is_up());
        assert!(NamespaceState { pods: 1, cpu: 0.1, memory: 1024 }.is_up());
    }
}
