use scheduler_core::{Action, NamespaceState};
use serde::Serialize;

/// The controller's internal state machine position, guarded alongside the
/// action queue. Never leaves this set of three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    ActionInProgress,
    ManualActionScheduled,
}

/// One namespace's reported workload state, as surfaced over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceStateEntry {
    pub namespace_name: String,
    pub state: NamespaceState,
}

/// The externally observable label for an environment, distinct from the
/// internal `ControllerState`: `ActionInProgress` is the only state shared
/// between the two; `Up`/`Down` are derived from the driver's reported
/// namespace states, not from the controller's own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnvStateLabel {
    #[serde(rename = "Up")]
    Up,
    #[serde(rename = "Down")]
    Down,
    #[serde(rename = "Action in progress")]
    ActionInProgress,
}

/// Full snapshot returned by `GET /state/{env}` and as one element of
/// `GET /state_all`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvState {
    pub env_name: String,
    pub env_state: EnvStateLabel,
    pub env_schedule: String,
    pub next_action: Option<Action>,
    pub namespaces: Vec<NamespaceStateEntry>,
}
