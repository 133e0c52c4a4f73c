use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;

use crate::environment_controller::EnvironmentController;
use crate::error::ControllerError;
use crate::state::EnvState;
use scheduler_core::ActionKind;

/// Process-wide mapping of environment name to controller, built once at
/// startup and handed around as an `Arc<Registry>`. Not a global: each test
/// or process constructs its own.
#[derive(Default)]
pub struct Registry {
    controllers: HashMap<String, Arc<EnvironmentController>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller under its own environment name. Registering an
    /// already-present name is an error, surfaced fatally at startup.
    pub fn register(&mut self, controller: EnvironmentController) -> Result<(), ControllerError> {
        let name = controller.env_name().to_string();
        if self.controllers.contains_key(&name) {
            return Err(ControllerError::EnvironmentAlreadyScheduled(name));
        }
        self.controllers.insert(name, Arc::new(controller));
        Ok(())
    }

    pub fn controllers(&self) -> impl Iterator<Item = &Arc<EnvironmentController>> {
        self.controllers.values()
    }

    fn get(&self, env_name: &str) -> Result<&Arc<EnvironmentController>, ControllerError> {
        self.controllers
            .get(env_name)
            .ok_or_else(|| ControllerError::UnknownEnvironment(env_name.to_string()))
    }

    /// Concurrent fan-out over every registered controller. Each snapshot
    /// independently takes and releases its own controller's guard; this
    /// never blocks action execution beyond the single namespace-state
    /// fetch each snapshot performs.
    pub async fn list_all_states(&self) -> Vec<EnvState> {
        join_all(self.controllers.values().map(|c| c.snapshot())).await
    }

    pub async fn get_state(&self, env_name: &str) -> Result<EnvState, ControllerError> {
        let controller = self.get(env_name)?;
        Ok(controller.snapshot().await)
    }

    /// Delegates to the named controller's `add_manual`, converting "no such
    /// environment" into its own distinct error kind.
    pub async fn request_action(
        &self,
        env_name: &str,
        kind: ActionKind,
        now: chrono::DateTime<chrono_tz::Tz>,
    ) -> Result<(), ControllerError> {
        let controller = self.get(env_name)?;
        controller.add_manual(kind, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use scheduler_core::{HolidayWindow, Schedule, WeekdayRule};
    use workload_driver::recording::RecordingWorkloadDriver;

    fn empty_schedule() -> Schedule {
        Schedule {
            timezone: Tz::UTC,
            weekdays: Vec::<WeekdayRule>::new(),
            holidays: Vec::<HolidayWindow>::new(),
        }
    }

    #[tokio::test]
    async fn unknown_environment_is_an_error() {
        let registry = Registry::new();
        let now = Tz::UTC.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let err = registry.get_state("ghost").await.unwrap_err();
        assert_eq!(err, ControllerError::UnknownEnvironment("ghost".to_string()));

        let err = registry.request_action("ghost", ActionKind::Up, now).await.unwrap_err();
        assert_eq!(err, ControllerError::UnknownEnvironment("ghost".to_string()));
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let driver = Arc::new(RecordingWorkloadDriver::new());
        let now = Tz::UTC.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let mut registry = Registry::new();

        let make = || {
            EnvironmentController::new(
                "prod",
                "business-hours",
                empty_schedule(),
                vec!["team-a".to_string()],
                None,
                driver.clone(),
                now,
            )
        };

        registry.register(make()).unwrap();
        let err = registry.register(make()).unwrap_err();
        assert_eq!(err, ControllerError::EnvironmentAlreadyScheduled("prod".to_string()));
    }
}
