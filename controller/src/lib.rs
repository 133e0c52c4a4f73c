//! The scheduling state machine: one [`EnvironmentController`] per managed
//! environment, collected in a [`Registry`] and driven by a [`Supervisor`].

pub mod environment_controller;
pub mod error;
pub mod registry;
pub mod state;
pub mod supervisor;

pub use environment_controller::{EnvironmentController, DEFAULT_RECALCULATION_WINDOW_DAYS, DEFAULT_TICK_INTERVAL};
pub use error::ControllerError;
pub use registry::Registry;
pub use state::{ControllerState, EnvState, EnvStateLabel, NamespaceStateEntry};
pub use supervisor::Supervisor;
