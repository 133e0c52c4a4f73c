//! Process bootstrap for the namespace scheduler: CLI flags, `kube::Client`
//! construction, and wiring the config, registry, supervisor and HTTP
//! layers together. The binary (`src/main.rs`) is a thin `tokio::main`
//! shell around [`bootstrap::build_registry`] and [`kube_client::build`].

pub mod bootstrap;
pub mod cli;
pub mod kube_client;

pub use cli::{Cli, LoggingLevel};
