use thiserror::Error;

#[derive(Error, Debug)]
pub enum HydroError {
    #[error("Strain API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration field {field} is invalid: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Calculation error: {message}")]
    CalculationError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Storage,
    Configuration,
    Input,
    Calculation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl HydroError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        HydroError::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        HydroError::ValidationError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            HydroError::ApiError(_) => ErrorCategory::Network,
            HydroError::CsvError(_)
            | HydroError::IoError(_)
            | HydroError::SerializationError(_) => ErrorCategory::Storage,
            HydroError::ConfigError { .. }
            | HydroError::MissingConfigError { .. }
            | HydroError::InvalidConfigValueError { .. }
            | HydroError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            HydroError::ValidationError { .. } | HydroError::NotFound { .. } => {
                ErrorCategory::Input
            }
            HydroError::CalculationError { .. } => ErrorCategory::Calculation,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Calculation => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// True for errors caused by the caller's input rather than the environment.
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Input
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            HydroError::ApiError(_) => {
                "Check the strain API base URL and network connectivity, then retry"
            }
            HydroError::CsvError(_) => "Check the export destination and retry",
            HydroError::IoError(_) => "Check that the data directory exists and is writable",
            HydroError::SerializationError(_) => {
                "The JSON file may be corrupted; restore it from a backup or remove it"
            }
            HydroError::ConfigError { .. }
            | HydroError::ConfigValidationError { .. }
            | HydroError::InvalidConfigValueError { .. } => {
                "Review the configuration file against hydro-calc.example.toml"
            }
            HydroError::MissingConfigError { .. } => "Add the missing field to the configuration",
            HydroError::CalculationError { .. } => {
                "Check the nutrient line and supplement names with `hydro-calc lines`"
            }
            HydroError::ValidationError { .. } => "Adjust the input to the allowed range",
            HydroError::NotFound { .. } => "List the available entries and check the spelling",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            HydroError::ApiError(_) => "Could not reach the strain service".to_string(),
            HydroError::NotFound { kind, name } => format!("No {} named '{}'", kind, name),
            HydroError::ValidationError { message } | HydroError::CalculationError { message } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HydroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_client_error() {
        let err = HydroError::not_found("recipe", "Veg Week 2");
        assert!(err.is_client_error());
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.user_friendly_message(), "No recipe named 'Veg Week 2'");
    }

    #[test]
    fn test_io_error_is_critical() {
        let err = HydroError::from(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.category(), ErrorCategory::Storage);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_client_error());
    }
}
