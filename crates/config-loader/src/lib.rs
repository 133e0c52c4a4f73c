//! Loads the scheduler's YAML configuration file and validates it into the
//! domain types `scheduler-core` exposes, producing one stable error enum
//! for every way a configuration can be rejected.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use scheduler_core::{Environment, EnvironmentError, RawEnvironment, RawSchedule, Schedule, ScheduleError};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path} as YAML: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config must declare at least one schedule")]
    NoSchedules,

    #[error("config must declare at least one environment")]
    NoEnvironments,

    #[error("schedule {name:?} is invalid: {source}")]
    Schedule {
        name: String,
        #[source]
        source: ScheduleError,
    },

    #[error("environment {name:?} is invalid: {source}")]
    Environment {
        name: String,
        #[source]
        source: EnvironmentError,
    },

    #[error("environment {env:?} references undeclared schedule {schedule:?}")]
    UnknownScheduleReference { env: String, schedule: String },
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    schedules: HashMap<String, RawSchedule>,
    #[serde(default)]
    envs: HashMap<String, RawEnvironment>,
}

/// A fully validated configuration: every schedule and environment parsed
/// and cross-checked against each other.
#[derive(Debug, Clone)]
pub struct Config {
    pub schedules: HashMap<String, Schedule>,
    pub environments: HashMap<String, Environment>,
}

/// Reads `path`, parses it as YAML, and validates the result.
#[instrument]
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed = parse(&raw, path)?;
    debug!(
        schedules = parsed.schedules.len(),
        environments = parsed.envs.len(),
        "parsed config file"
    );
    validate(parsed)
}

fn parse(raw: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

#[instrument(skip(raw))]
fn validate(raw: RawConfig) -> Result<Config, ConfigError> {
    if raw.schedules.is_empty() {
        return Err(ConfigError::NoSchedules);
    }
    if raw.envs.is_empty() {
        return Err(ConfigError::NoEnvironments);
    }

    let schedules = raw
        .schedules
        .into_iter()
        .map(|(name, raw_schedule)| {
            raw_schedule
                .validate()
                .map(|schedule| (name.clone(), schedule))
                .map_err(|source| ConfigError::Schedule { name, source })
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    let environments = raw
        .envs
        .into_iter()
        .map(|(name, raw_env)| {
            let env = raw_env
                .validate()
                .map_err(|source| ConfigError::Environment { name: name.clone(), source })?;
            if !schedules.contains_key(&env.schedule) {
                return Err(ConfigError::UnknownScheduleReference {
                    env: name.clone(),
                    schedule: env.schedule.clone(),
                });
            }
            Ok((name, env))
        })
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(Config { schedules, environments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID: &str = r#"
schedules:
  business-hours:
    timezone: "America/New_York"
    weekdays:
      - days: [1, 2, 3, 4, 5]
        start: "08:00"
        stop: "18:00"
envs:
  prod:
    namespaces: ["team-a", "team-b"]
    schedule: business-hours
"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_valid_config() {
        let file = write_temp(VALID);
        let config = load(file.path()).unwrap();
        assert_eq!(config.schedules.len(), 1);
        assert_eq!(config.environments.len(), 1);
    }

    #[test]
    fn rejects_config_with_no_schedules() {
        let file = write_temp("schedules: {}\nenvs:\n  prod:\n    namespaces: [a]\n    schedule: x\n");
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::NoSchedules));
    }

    #[test]
    fn rejects_environment_referencing_unknown_schedule() {
        let broken = VALID.replace("schedule: business-hours", "schedule: does-not-exist");
        let file = write_temp(&broken);
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownScheduleReference { .. }));
    }

    #[test]
    fn rejects_unparsable_yaml() {
        let file = write_temp("not: [valid: yaml");
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn rejects_missing_file() {
        let err = load(Path::new("/nonexistent/path.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
