use clap::Parser;

/// Brings groups of Kubernetes namespaces up or down on a declarative
/// schedule, with a small HTTP API for manual overrides.
#[derive(Debug, Clone, Parser)]
#[command(name = "ns-scheduler", about = "Scheduling server")]
pub struct Cli {
    /// Path to the config file in YAML format
    #[arg(long, default_value = "config.yaml")]
    pub config_file: String,

    /// Logging level
    #[arg(long, value_enum, default_value = "warning", ignore_case = true)]
    pub logging_level: LoggingLevel,

    /// IP address on which the REST API server will listen
    #[arg(long, default_value = "127.0.0.1")]
    pub listen_host: String,

    /// Port on which the REST API server will listen
    #[arg(long, default_value_t = 5001)]
    pub listen_port: u16,

    /// Run only the scheduler, without starting a REST API server
    #[arg(long)]
    pub no_api: bool,

    /// We run inside a kubernetes cluster
    #[arg(long)]
    pub incluster: bool,

    /// Kubernetes config context to use
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[value(rename_all = "UPPERCASE")]
pub enum LoggingLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LoggingLevel {
    /// Maps onto `tracing`'s level filters; `Critical` has no direct
    /// equivalent so it collapses onto `Error`, same as the original
    /// source's `logging.CRITICAL` mapping has no dedicated `tracing` tier.
    pub fn as_env_filter_directive(self) -> &'static str {
        match self {
            LoggingLevel::Debug => "debug",
            LoggingLevel::Info => "info",
            LoggingLevel::Warning => "warn",
            LoggingLevel::Error => "error",
            LoggingLevel::Critical => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_spec_table() {
        let cli = Cli::parse_from(["ns-scheduler"]);
        assert_eq!(cli.config_file, "config.yaml");
        assert_eq!(cli.logging_level, LoggingLevel::Warning);
        assert_eq!(cli.listen_host, "127.0.0.1");
        assert_eq!(cli.listen_port, 5001);
        assert!(!cli.no_api);
        assert!(!cli.incluster);
        assert!(cli.context.is_none());
    }

    #[test]
    fn accepts_flags() {
        let cli = Cli::parse_from([
            "ns-scheduler",
            "--config-file",
            "/etc/ns-scheduler/config.yaml",
            "--logging-level",
            "debug",
            "--no-api",
            "--incluster",
            "--context",
            "staging",
        ]);
        assert_eq!(cli.config_file, "/etc/ns-scheduler/config.yaml");
        assert_eq!(cli.logging_level, LoggingLevel::Debug);
        assert!(cli.no_api);
        assert!(cli.incluster);
        assert_eq!(cli.context.as_deref(), Some("staging"));
    }
}
