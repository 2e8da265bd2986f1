use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("No response from modem to '{command}'")]
    TransportTimeout { command: String },

    #[error("Unexpected response to '{command}' (expected '{expected}'): {response}")]
    UnexpectedResponse {
        command: String,
        expected: String,
        response: String,
    },

    #[error("Failed to parse {what}: {input:?}")]
    ParseFailure { what: String, input: String },

    #[error("Invalid phone number: {number}")]
    InvalidNumber { number: String },

    #[error("Modem failed to start after {attempts} attempts")]
    StartupFailed { attempts: u32 },

    #[error("GSM bring-up failed at '{command}': {cause}")]
    BringUpFailed { command: String, cause: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Protocol,
    Input,
    Lifecycle,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl GateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GateError::IoError(_) | GateError::SerialError(_) | GateError::TransportTimeout { .. } => {
                ErrorCategory::Transport
            }
            GateError::UnexpectedResponse { .. } | GateError::ParseFailure { .. } => {
                ErrorCategory::Protocol
            }
            GateError::InvalidNumber { .. } => ErrorCategory::Input,
            GateError::StartupFailed { .. } | GateError::BringUpFailed { .. } => {
                ErrorCategory::Lifecycle
            }
            GateError::TomlError(_) | GateError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GateError::InvalidNumber { .. } | GateError::ParseFailure { .. } => ErrorSeverity::Low,
            GateError::TransportTimeout { .. } | GateError::UnexpectedResponse { .. } => {
                ErrorSeverity::Medium
            }
            GateError::IoError(_)
            | GateError::SerialError(_)
            | GateError::TomlError(_)
            | GateError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            GateError::StartupFailed { .. } | GateError::BringUpFailed { .. } => {
                ErrorSeverity::Critical
            }
        }
    }

    /// 致命錯誤: 程序必須停止而不是以半初始化狀態繼續
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            GateError::IoError(_) | GateError::SerialError(_) => {
                "Check that the serial device exists and that the process may open it"
            }
            GateError::TransportTimeout { .. } => {
                "Check modem power and wiring; the command may succeed on the next attempt"
            }
            GateError::UnexpectedResponse { .. } => {
                "Inspect the raw modem response in the debug log"
            }
            GateError::ParseFailure { .. } => "The modem sent malformed text; it was skipped",
            GateError::InvalidNumber { .. } => "Use a 9 digit number, optionally prefixed with +48",
            GateError::StartupFailed { .. } => {
                "Verify the modem power pin and supply, then restart the service"
            }
            GateError::BringUpFailed { .. } => {
                "Check the SIM card, network coverage and APN setting, then restart"
            }
            GateError::TomlError(_) | GateError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and start again"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GateError::StartupFailed { attempts } => {
                format!("The modem did not answer after {} power cycles", attempts)
            }
            GateError::BringUpFailed { command, .. } => {
                format!("The modem could not join the network (stopped at {})", command)
            }
            GateError::InvalidConfigValueError { field, reason, .. } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_errors_are_fatal() {
        assert!(GateError::StartupFailed { attempts: 3 }.is_fatal());
        assert!(GateError::BringUpFailed {
            command: "AT+CPIN?".to_string(),
            cause: "no response".to_string(),
        }
        .is_fatal());
    }

    #[test]
    fn test_per_notification_errors_are_not_fatal() {
        let timeout = GateError::TransportTimeout {
            command: "ATH".to_string(),
        };
        assert!(!timeout.is_fatal());
        assert_eq!(timeout.category(), ErrorCategory::Transport);

        let parse = GateError::ParseFailure {
            what: "phonebook range".to_string(),
            input: "garbage".to_string(),
        };
        assert_eq!(parse.severity(), ErrorSeverity::Low);
        assert_eq!(parse.category(), ErrorCategory::Protocol);
    }
}
