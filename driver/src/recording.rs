//! In-memory [`WorkloadDriver`] fake used by controller and integration
//! tests: records calls instead of talking to a cluster.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use scheduler_core::{BatchPolicy, NamespaceState};

use crate::{reject_if_protected, DriverError, WorkloadDriver};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    Down(Vec<String>),
    Up(Vec<String>, Option<BatchPolicy>),
    GetState(Vec<String>),
}

/// A fake driver that never touches a cluster: it just remembers what it
/// was asked to do, and serves canned [`NamespaceState`]s back out.
#[derive(Default)]
pub struct RecordingWorkloadDriver {
    calls: Mutex<Vec<RecordedCall>>,
    states: Mutex<HashMap<String, NamespaceState>>,
}

impl RecordingWorkloadDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_state(&self, namespace: impl Into<String>, state: NamespaceState) {
        self.states.lock().expect("states poisoned").insert(namespace.into(), state);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls poisoned").clone()
    }
}

#[async_trait]
impl WorkloadDriver for RecordingWorkloadDriver {
    async fn scale_down(&self, namespaces: &[String]) -> Result<(), DriverError> {
        for ns in namespaces {
            reject_if_protected(ns)?;
        }
        self.calls
            .lock()
            .expect("calls poisoned")
            .push(RecordedCall::Down(namespaces.to_vec()));
        Ok(())
    }

    async fn scale_up(
        &self,
        namespaces: &[String],
        batch: Option<BatchPolicy>,
    ) -> Result<(), DriverError> {
        for ns in namespaces {
            reject_if_protected(ns)?;
        }
        self.calls
            .lock()
            .expect("calls poisoned")
            .push(RecordedCall::Up(namespaces.to_vec(), batch));
        Ok(())
    }

    async fn get_state(
        &self,
        namespaces: &[String],
    ) -> Result<HashMap<String, NamespaceState>, DriverError> {
        for ns in namespaces {
            reject_if_protected(ns)?;
        }
        self.calls
            .lock()
            .expect("calls poisoned")
            .push(RecordedCall::GetState(namespaces.to_vec()));

        let states = self.states.lock().expect("states poisoned");
        Ok(namespaces
            .iter()
            .map(|ns| {
                let state = states.get(ns).copied().unwrap_or(NamespaceState {
                    pods: 0,
                    cpu: 0.0,
                    memory: 0,
                });
                (ns.clone(), state)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let driver = RecordingWorkloadDriver::new();
        let namespaces = vec!["a".to_string(), "b".to_string()];

        driver.scale_down(&namespaces).await.unwrap();
        driver.scale_up(&namespaces, None).await.unwrap();

        assert_eq!(
            driver.calls(),
            vec![
                RecordedCall::Down(namespaces.clone()),
                RecordedCall::Up(namespaces.clone(), None),
            ]
        );
    }

    #[tokio::test]
    async fn rejects_protected_namespace() {
        let driver = RecordingWorkloadDriver::new();
        let namespaces = vec!["kube-system".to_string()];
        let err = driver.scale_down(&namespaces).await.unwrap_err();
        assert!(matches!(err, DriverError::ProtectedNamespace(ref ns) if ns == "kube-system"));
    }

    #[tokio::test]
    async fn get_state_defaults_to_zero_for_unseeded_namespace() {
        let driver = RecordingWorkloadDriver::new();
        let state = driver.get_state(&["unseen".to_string()]).await.unwrap();
        assert_eq!(state["unseen"].pods, 0);
    }
}
