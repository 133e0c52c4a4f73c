use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::registry::Registry;

/// Drives one long-running tick loop per registered environment. Tasks run
/// concurrently and are joined together; cancelling the supervisor's token
/// stops every controller loop at its next tick boundary.
pub struct Supervisor {
    registry: Arc<Registry>,
    cancellation: CancellationToken,
}

impl Supervisor {
    pub fn new(registry: Arc<Registry>, cancellation: CancellationToken) -> Self {
        Self { registry, cancellation }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Spawns one task per controller and awaits all of them. A panicking
    /// controller task is surfaced through the returned `JoinSet` error
    /// rather than being silently dropped.
    pub async fn run(&self) {
        let mut tasks = JoinSet::new();

        for controller in self.registry.controllers() {
            let controller = Arc::clone(controller);
            let cancellation = self.cancellation.clone();
            tasks.spawn(async move {
                let env = controller.env_name().to_string();
                info!(env = %env, "controller loop started");
                let mut interval = tokio::time::interval(controller.tick_interval());
                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            // DateTime<Tz> comparisons are instant-based, so handing
                            // every controller a UTC "now" is correct regardless of
                            // the timezone its own schedule is expressed in.
                            controller.tick(Utc::now().with_timezone(&chrono_tz::Tz::UTC)).await;
                        }
                        _ = cancellation.cancelled() => {
                            info!(env = %env, "controller loop cancelled");
                            break;
                        }
                    }
                }
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                warn!(error = %err, "controller task ended abnormally");
            }
        }
    }
}
