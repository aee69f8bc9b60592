use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Input error: {message}")]
    Input { message: String },

    #[error("External oracle error: {message}")]
    ExternalOracle { message: String },

    #[error("Configuration error ({field}): {message}")]
    Configuration { field: String, message: String },

    #[error("Calculation cancelled before the solar position was obtained")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Oracle,
    Configuration,
    Cancellation,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EngineError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn oracle(message: impl Into<String>) -> Self {
        Self::ExternalOracle {
            message: message.into(),
        }
    }

    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Input { .. } => ErrorCategory::Input,
            Self::ExternalOracle { .. } => ErrorCategory::Oracle,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::Io(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Cancelled => ErrorSeverity::Low,
            Self::ExternalOracle { .. } => ErrorSeverity::Medium,
            Self::Input { .. } => ErrorSeverity::High,
            Self::Configuration { .. } | Self::Io(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether another attempt at the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExternalOracle { .. })
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => {
                "Check the birth moment: YYYY-MM-DDTHH:mm[:ss], a valid IANA zone or offset, and coordinates in range"
            }
            ErrorCategory::Oracle => {
                "Run the listed oracle invocations by hand and inspect their output, or raise the oracle timeout"
            }
            ErrorCategory::Configuration => {
                "Fix the [oracle] section of the config file; swetest needs an existing executable and ephemeris directory"
            }
            ErrorCategory::Cancellation => "Resubmit the calculation if it is still needed",
            ErrorCategory::System => "Check file permissions and paths",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Input { message } => format!("Invalid birth moment: {}", message),
            Self::ExternalOracle { .. } => {
                "The solar position could not be determined".to_string()
            }
            Self::Configuration { field, message } => {
                format!("Configuration problem in '{}': {}", field, message)
            }
            Self::Cancelled => "The calculation was cancelled".to_string(),
            Self::Io(e) => format!("File access failed: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = EngineError::input("bad wall clock");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(!err.is_retryable());

        let err = EngineError::oracle("no longitude");
        assert_eq!(err.category(), ErrorCategory::Oracle);
        assert!(err.is_retryable());

        assert_eq!(EngineError::Cancelled.severity(), ErrorSeverity::Low);
        assert_eq!(
            EngineError::config("oracle.executable", "missing").category(),
            ErrorCategory::Configuration
        );
    }

    #[test]
    fn test_display_keeps_message() {
        let err = EngineError::oracle("attempt A failed");
        assert!(err.to_string().contains("attempt A failed"));

        let err = EngineError::config("oracle.endpoint", "empty");
        assert_eq!(
            err.to_string(),
            "Configuration error (oracle.endpoint): empty"
        );
    }
}
