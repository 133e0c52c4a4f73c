//! The workload driver is the scheduler's only side-effecting collaborator:
//! it is the abstract surface through which controllers scale Kubernetes
//! workloads, independent of the concrete client backing it.

pub mod kube_driver;
pub mod quantity;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;

use std::collections::HashMap;

use async_trait::async_trait;
use scheduler_core::{BatchPolicy, NamespaceState};
use thiserror::Error;

pub use kube_driver::KubeWorkloadDriver;

/// The well-known annotation this scheduler uses to remember a workload's
/// replica count from before it was scaled to zero.
pub const REPLICAS_ANNOTATION: &str = "ns.scheduler/replicas";

/// Namespaces this scheduler will never modify, regardless of what an
/// environment's config lists.
pub fn protected_namespaces() -> &'static [&'static str] {
    &["kube-system"]
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("namespace {0:?} is protected and cannot be scaled by this scheduler")]
    ProtectedNamespace(String),
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to patch {kind} {namespace}/{name}: {source}")]
    PatchFailed {
        kind: &'static str,
        namespace: String,
        name: String,
        #[source]
        source: kube::Error,
    },
}

/// Abstract UP/DOWN/STATE operations over an ordered list of namespaces.
///
/// Implementations must process namespaces and workloads in the order each
/// method documents below; the scheduler core depends only on this trait,
/// never on a concrete client.
#[async_trait]
pub trait WorkloadDriver: Send + Sync {
    /// Scale every workload in `namespaces` to zero, namespaces in reverse
    /// order, Deployments before StatefulSets within each namespace.
    async fn scale_down(&self, namespaces: &[String]) -> Result<(), DriverError>;

    /// Restore every zero-replica workload in `namespaces` to its last
    /// observed non-zero replica count, namespaces in forward order,
    /// StatefulSets before Deployments within each namespace. When `batch`
    /// is set, pause `timeout_seconds` after every `size` workloads scaled
    /// up within one namespace.
    async fn scale_up(
        &self,
        namespaces: &[String],
        batch: Option<BatchPolicy>,
    ) -> Result<(), DriverError>;

    /// Current pods/cpu/memory per namespace, summed across Deployments and
    /// StatefulSets.
    async fn get_state(
        &self,
        namespaces: &[String],
    ) -> Result<HashMap<String, NamespaceState>, DriverError>;
}

pub(crate) fn reject_if_protected(namespace: &str) -> Result<(), DriverError> {
    if protected_namespaces().contains(&namespace) {
        return Err(DriverError::ProtectedNamespace(namespace.to_string()));
    }
    Ok(())
}
