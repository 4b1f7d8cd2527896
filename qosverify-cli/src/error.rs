//! CLI-specific error types and exit code mapping

use qosverify_cloud::CloudClientError;
use qosverify_core::error::QosVerifyError;
use qosverify_scenario::ScenarioError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// At least one scenario finished with the failed outcome.
    #[error("{failed} of {total} scenario(s) failed")]
    ScenarioFailed { failed: usize, total: usize },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from qosverify-core.
    #[error("{0}")]
    Core(#[from] QosVerifyError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                |
    /// |------|----------------------------------------|
    /// | 0    | Success (passed or skipped)            |
    /// | 1    | Scenario failure / command error       |
    /// | 2    | Configuration error                    |
    /// | 10   | IO error                               |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(QosVerifyError::Config(_)) => 2,
            Self::Io(_) | Self::Core(QosVerifyError::Io(_)) => 10,
            Self::JsonSerialize(_)
            | Self::Command(_)
            | Self::ScenarioFailed { .. }
            | Self::Core(_) => 1,
        }
    }
}

impl From<CloudClientError> for CliError {
    fn from(e: CloudClientError) -> Self {
        Self::Core(e.into())
    }
}

impl From<ScenarioError> for CliError {
    fn from(e: ScenarioError) -> Self {
        Self::Core(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qosverify_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err = CliError::from(QosVerifyError::Config(ConfigError::FileNotFound {
            path: "qosverify.toml".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2, "core config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_scenario_failed() {
        let err = CliError::ScenarioFailed {
            failed: 1,
            total: 3,
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "1 of 3 scenario(s) failed");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_cloud_auth_error_is_general_failure() {
        let err = CliError::from(CloudClientError::Auth("401 Unauthorized".to_owned()));
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_cloud_config_error_maps_to_config_exit_code() {
        let err = CliError::from(CloudClientError::Config {
            field: "compute.microversion".to_owned(),
            reason: "expected X.Y".to_owned(),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_scenario_config_error_maps_to_config_exit_code() {
        let err = CliError::from(ScenarioError::Config {
            field: "cloud".to_owned(),
            reason: "missing".to_owned(),
        });
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }
}
