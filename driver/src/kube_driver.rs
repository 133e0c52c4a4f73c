//! Concrete [`WorkloadDriver`] backed by a live `kube::Client`, scaling
//! Deployments and StatefulSets via JSON merge-patch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use scheduler_core::{BatchPolicy, NamespaceState};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::quantity::{parse_cpu, parse_memory};
use crate::{reject_if_protected, DriverError, WorkloadDriver, REPLICAS_ANNOTATION};

const FIELD_MANAGER: &str = "ns-scheduler";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Up,
    Down,
}

/// Scales Kubernetes Deployments and StatefulSets to implement namespace
/// up/down transitions, and reports aggregate namespace state.
pub struct KubeWorkloadDriver {
    client: Client,
    /// Per-namespace count of workloads scaled up since the last pause,
    /// mirroring the batching counter the original implementation keeps.
    batch_counters: Mutex<HashMap<String, AtomicU32>>,
}

impl KubeWorkloadDriver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            batch_counters: Mutex::new(HashMap::new()),
        }
    }

    fn deployments(&self, namespace: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn stateful_sets(&self, namespace: &str) -> Api<StatefulSet> {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Increments the batch counter for `namespace`; returns `true` once it
    /// exceeds `policy.size`, in which case the counter is reset to 1 and the
    /// caller should pause for `policy.timeout_seconds`.
    fn batch_full(&self, namespace: &str, policy: &BatchPolicy) -> bool {
        let mut counters = self.batch_counters.lock().expect("batch counters poisoned");
        batch_full_in(&mut counters, namespace, policy)
    }

    /// Patches one workload if `compute_patch` says it needs one. A patch
    /// failure is logged and swallowed, never propagated, so it doesn't
    /// abort the rest of the batch.
    #[instrument(skip(self, patch_params), fields(kind = kind, namespace, name))]
    async fn scale_deployment(
        &self,
        action: Action,
        namespace: &str,
        name: &str,
        current_replicas: i32,
        annotations: &HashMap<String, String>,
        kind: &'static str,
        patch_params: &PatchParams,
    ) {
        let Some(patch) = compute_patch(action, current_replicas, annotations) else {
            debug!(namespace, name, current_replicas, "left intact");
            return;
        };

        let result = if kind == "Deployment" {
            self.deployments(namespace)
                .patch(name, patch_params, &Patch::Merge(&patch))
                .await
                .map(|_| ())
        } else {
            self.stateful_sets(namespace)
                .patch(name, patch_params, &Patch::Merge(&patch))
                .await
                .map(|_| ())
        };

        match result {
            Ok(()) => info!(namespace, name, kind, "scaled"),
            Err(source) => {
                let err = DriverError::PatchFailed {
                    kind,
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    source,
                };
                warn!(namespace, name, kind, error = %err, "failed to patch workload, continuing batch");
            }
        }
    }
}

fn batch_full_in(
    counters: &mut HashMap<String, AtomicU32>,
    namespace: &str,
    policy: &BatchPolicy,
) -> bool {
    let counter = counters
        .entry(namespace.to_string())
        .or_insert_with(|| AtomicU32::new(0));
    let count = counter.fetch_add(1, Ordering::SeqCst) + 1;
    if count > policy.size && policy.timeout_seconds > 0 {
        counter.store(1, Ordering::SeqCst);
        true
    } else {
        false
    }
}

/// Mirrors the original implementation's `modify_workload`: computes the
/// merge patch (if any) for one workload given the requested action.
fn compute_patch(
    action: Action,
    current_replicas: i32,
    annotations: &HashMap<String, String>,
) -> Option<serde_json::Value> {
    let before_down: i32 = annotations
        .get(REPLICAS_ANNOTATION)
        .and_then(|v| v.parse().ok())
        .unwrap_or(1);

    let desired_replicas = match action {
        Action::Down => 0,
        Action::Up if current_replicas == 0 => before_down,
        Action::Up => current_replicas,
    };

    let mut patch = serde_json::Map::new();

    if action == Action::Down && (current_replicas > 0 || !annotations.contains_key(REPLICAS_ANNOTATION)) {
        patch.insert(
            "metadata".into(),
            json!({ "annotations": { REPLICAS_ANNOTATION: current_replicas.to_string() } }),
        );
    }

    if current_replicas != desired_replicas {
        patch.insert("spec".into(), json!({ "replicas": desired_replicas }));
    }

    if patch.is_empty() {
        None
    } else {
        Some(serde_json::Value::Object(patch))
    }
}

fn annotations_of(meta: &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta) -> HashMap<String, String> {
    meta.annotations.clone().unwrap_or_default()
}

#[async_trait]
impl WorkloadDriver for KubeWorkloadDriver {
    async fn scale_down(&self, namespaces: &[String]) -> Result<(), DriverError> {
        let patch_params = PatchParams::apply(FIELD_MANAGER);

        for namespace in namespaces.iter().rev() {
            reject_if_protected(namespace)?;
            info!(namespace, "shutting down namespace");

            let deployments = self.deployments(namespace).list(&Default::default()).await?;
            let stateful_sets = self.stateful_sets(namespace).list(&Default::default()).await?;

            for d in &deployments.items {
                let name = d.metadata.name.clone().unwrap_or_default();
                let replicas = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
                let annotations = annotations_of(&d.metadata);
                self.scale_deployment(
                    Action::Down,
                    namespace,
                    &name,
                    replicas,
                    &annotations,
                    "Deployment",
                    &patch_params,
                )
                .await;
            }
            for s in &stateful_sets.items {
                let name = s.metadata.name.clone().unwrap_or_default();
                let replicas = s.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
                let annotations = annotations_of(&s.metadata);
                self.scale_deployment(
                    Action::Down,
                    namespace,
                    &name,
                    replicas,
                    &annotations,
                    "StatefulSet",
                    &patch_params,
                )
                .await;
            }
        }
        Ok(())
    }

    async fn scale_up(
        &self,
        namespaces: &[String],
        batch: Option<BatchPolicy>,
    ) -> Result<(), DriverError> {
        let patch_params = PatchParams::apply(FIELD_MANAGER);

        for namespace in namespaces {
            reject_if_protected(namespace)?;
            info!(namespace, "starting up namespace");

            let deployments = self.deployments(namespace).list(&Default::default()).await?;
            let stateful_sets = self.stateful_sets(namespace).list(&Default::default()).await?;

            for s in &stateful_sets.items {
                if let Some(policy) = &batch {
                    if self.batch_full(namespace, policy) {
                        debug!(namespace, seconds = policy.timeout_seconds, "pausing batch");
                        tokio::time::sleep(tokio::time::Duration::from_secs(policy.timeout_seconds)).await;
                    }
                }
                let name = s.metadata.name.clone().unwrap_or_default();
                let replicas = s.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
                let annotations = annotations_of(&s.metadata);
                self.scale_deployment(
                    Action::Up,
                    namespace,
                    &name,
                    replicas,
                    &annotations,
                    "StatefulSet",
                    &patch_params,
                )
                .await;
            }
            for d in &deployments.items {
                if let Some(policy) = &batch {
                    if self.batch_full(namespace, policy) {
                        debug!(namespace, seconds = policy.timeout_seconds, "pausing batch");
                        tokio::time::sleep(tokio::time::Duration::from_secs(policy.timeout_seconds)).await;
                    }
                }
                let name = d.metadata.name.clone().unwrap_or_default();
                let replicas = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
                let annotations = annotations_of(&d.metadata);
                self.scale_deployment(
                    Action::Up,
                    namespace,
                    &name,
                    replicas,
                    &annotations,
                    "Deployment",
                    &patch_params,
                )
                .await;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, namespaces))]
    async fn get_state(
        &self,
        namespaces: &[String],
    ) -> Result<HashMap<String, NamespaceState>, DriverError> {
        let mut state = HashMap::new();

        for namespace in namespaces {
            if reject_if_protected(namespace).is_err() {
                warn!(namespace, "skipping protected namespace in state query");
                continue;
            }

            let deployments = self.deployments(namespace).list(&Default::default()).await?;
            let stateful_sets = self.stateful_sets(namespace).list(&Default::default()).await?;

            let (d_pods, d_cpu, d_mem) = sum_deployments(&deployments.items);
            let (s_pods, s_cpu, s_mem) = sum_stateful_sets(&stateful_sets.items);

            state.insert(
                namespace.clone(),
                NamespaceState {
                    pods: d_pods + s_pods,
                    cpu: d_cpu + s_cpu,
                    memory: d_mem + s_mem,
                },
            );
        }

        debug!(?state, "collected namespace state");
        Ok(state)
    }
}

fn sum_deployments(items: &[Deployment]) -> (u32, f64, u64) {
    let mut pods = 0u32;
    let mut cpu = 0.0f64;
    let mut memory = 0u64;

    for d in items {
        let Some(spec) = &d.spec else { continue };
        let replicas = spec.replicas.unwrap_or(0).max(0) as u32;
        pods += replicas;
        for container in &spec.template.spec.as_ref().map(|s| s.containers.clone()).unwrap_or_default() {
            let Some(resources) = &container.resources else { continue };
            let Some(requests) = &resources.requests else { continue };
            if let Some(mem) = requests.get("memory") {
                memory += parse_memory(&mem.0) * replicas as u64;
            }
            if let Some(c) = requests.get("cpu") {
                cpu += parse_cpu(&c.0) * replicas as f64;
            }
        }
    }
    (pods, cpu, memory)
}

fn sum_stateful_sets(items: &[StatefulSet]) -> (u32, f64, u64) {
    let mut pods = 0u32;
    let mut cpu = 0.0f64;
    let mut memory = 0u64;

    for s in items {
        let Some(spec) = &s.spec else { continue };
        let replicas = spec.replicas.unwrap_or(0).max(0) as u32;
        pods += replicas;
        for container in &spec.template.spec.as_ref().map(|s| s.containers.clone()).unwrap_or_default() {
            let Some(resources) = &container.resources else { continue };
            let Some(requests) = &resources.requests else { continue };
            if let Some(mem) = requests.get("memory") {
                memory += parse_memory(&mem.0) * replicas as u64;
            }
            if let Some(c) = requests.get("cpu") {
                cpu += parse_cpu(&c.0) * replicas as f64;
            }
        }
    }
    (pods, cpu, memory)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn down_from_nonzero_records_annotation_and_zeroes() {
        let patch = compute_patch(Action::Down, 3, &annotations(&[])).unwrap();
        assert_eq!(patch["spec"]["replicas"], 0);
        assert_eq!(patch["metadata"]["annotations"][REPLICAS_ANNOTATION], "3");
    }

    #[test]
    fn down_already_zero_with_annotation_is_noop() {
        let patch = compute_patch(Action::Down, 0, &annotations(&[(REPLICAS_ANNOTATION, "2")]));
        assert!(patch.is_none());
    }

    #[test]
    fn down_already_zero_without_annotation_still_records() {
        let patch = compute_patch(Action::Down, 0, &annotations(&[])).unwrap();
        assert_eq!(patch["metadata"]["annotations"][REPLICAS_ANNOTATION], "0");
        assert!(patch.get("spec").is_none());
    }

    #[test]
    fn up_from_zero_restores_annotated_replicas() {
        let patch = compute_patch(Action::Up, 0, &annotations(&[(REPLICAS_ANNOTATION, "4")])).unwrap();
        assert_eq!(patch["spec"]["replicas"], 4);
        assert!(patch.get("metadata").is_none());
    }

    #[test]
    fn up_from_zero_defaults_to_one_without_annotation() {
        let patch = compute_patch(Action::Up, 0, &annotations(&[])).unwrap();
        assert_eq!(patch["spec"]["replicas"], 1);
    }

    #[test]
    fn up_already_nonzero_is_noop() {
        let patch = compute_patch(Action::Up, 5, &annotations(&[(REPLICAS_ANNOTATION, "5")]));
        assert!(patch.is_none());
    }

    #[test]
    fn batch_counter_trips_after_configured_size() {
        let mut counters: HashMap<String, AtomicU32> = HashMap::new();
        let policy = BatchPolicy { size: 2, timeout_seconds: 1 };
        assert!(!batch_full_in(&mut counters, "ns-a", &policy));
        assert!(!batch_full_in(&mut counters, "ns-a", &policy));
        assert!(batch_full_in(&mut counters, "ns-a", &policy));
    }

    #[test]
    fn zero_timeout_never_trips_batch() {
        let mut counters: HashMap<String, AtomicU32> = HashMap::new();
        let policy = BatchPolicy { size: 1, timeout_seconds: 0 };
        assert!(!batch_full_in(&mut counters, "ns-a", &policy));
        assert!(!batch_full_in(&mut counters, "ns-a", &policy));
        assert!(!batch_full_in(&mut counters, "ns-a", &policy));
    }

    #[test]
    fn down_then_up_is_an_identity_on_replicas_absent_external_mutation() {
        let down_patch = compute_patch(Action::Down, 3, &annotations(&[])).unwrap();
        let recorded_annotation = down_patch["metadata"]["annotations"][REPLICAS_ANNOTATION]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(down_patch["spec"]["replicas"], 0);

        let up_patch =
            compute_patch(Action::Up, 0, &annotations(&[(REPLICAS_ANNOTATION, &recorded_annotation)]))
                .unwrap();
        assert_eq!(up_patch["spec"]["replicas"], 3);
    }
}
