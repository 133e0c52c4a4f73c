use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use config_loader::Config;
use scheduler_controller::Registry;
use tracing::info;
use workload_driver::WorkloadDriver;

/// Builds and registers one controller per configured environment, driven
/// by a shared workload driver. Mirrors `_run_scheduling`'s per-environment
/// task creation in the original source, minus the task spawning itself
/// (the [`scheduler_controller::Supervisor`] owns that).
pub fn build_registry(config: &Config, driver: Arc<dyn WorkloadDriver>) -> anyhow::Result<Registry> {
    let mut registry = Registry::new();
    let now = Utc::now().with_timezone(&Tz::UTC);

    for (env_name, env) in &config.environments {
        let schedule = config
            .schedules
            .get(&env.schedule)
            .expect("config-loader guarantees every environment references a declared schedule");

        info!(env = %env_name, schedule = %env.schedule, "scheduling environment");
        let controller = scheduler_controller::EnvironmentController::new(
            env_name.clone(),
            env.schedule.clone(),
            schedule.clone(),
            env.namespaces.clone(),
            env.batch,
            Arc::clone(&driver),
            now,
        );
        registry.register(controller)?;
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use workload_driver::recording::RecordingWorkloadDriver;

    const TWO_ENV_CONFIG: &str = r#"
schedules:
  business-hours:
    timezone: "UTC"
    weekdays:
      - days: [1, 2, 3, 4, 5]
        start: "08:00"
        stop: "18:00"
envs:
  prod:
    namespaces: ["team-a"]
    schedule: business-hours
  staging:
    namespaces: ["team-b"]
    schedule: business-hours
    batch:
      size: 2
      timeout: 5
"#;

    #[test]
    fn registers_one_controller_per_configured_environment() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(TWO_ENV_CONFIG.as_bytes()).unwrap();
        let config = config_loader::load(file.path()).unwrap();

        let driver: Arc<dyn WorkloadDriver> = Arc::new(RecordingWorkloadDriver::new());
        let registry = build_registry(&config, driver).unwrap();

        assert_eq!(registry.controllers().count(), 2);
    }
}
