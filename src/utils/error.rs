use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Source '{source_name}' unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    #[error("Not enough history: {available} draw(s) available, at least 2 required")]
    EmptyHistory { available: usize },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Data,
    Network,
    Storage,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        SyncError::MalformedRecord {
            reason: reason.into(),
        }
    }

    pub fn source_unavailable(source_name: &str, message: impl Into<String>) -> Self {
        SyncError::SourceUnavailable {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SyncError::MalformedRecord { .. }
            | SyncError::EmptyHistory { .. }
            | SyncError::SerializationError(_) => ErrorCategory::Data,
            SyncError::SourceUnavailable { .. } | SyncError::ApiError(_) => ErrorCategory::Network,
            SyncError::IoError(_) => ErrorCategory::Storage,
            SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    /// 嚴重程度決定 CLI 的退出碼
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SyncError::MalformedRecord { .. } | SyncError::EmptyHistory { .. } => {
                ErrorSeverity::Low
            }
            SyncError::SourceUnavailable { .. } | SyncError::ApiError(_) => ErrorSeverity::Medium,
            SyncError::SerializationError(_)
            | SyncError::ConfigError { .. }
            | SyncError::ConfigValidationError { .. }
            | SyncError::InvalidConfigValueError { .. }
            | SyncError::MissingConfigError { .. } => ErrorSeverity::High,
            SyncError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Data => "Inspect the source payload; the record will be retried on the next run",
            ErrorCategory::Network => "Check connectivity and endpoint URLs, then re-run; persisted history is untouched",
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
            ErrorCategory::Configuration => "Fix the configuration value reported above and re-run",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SyncError::SourceUnavailable { source_name, .. } => {
                format!("Could not reach the '{}' draw source", source_name)
            }
            SyncError::EmptyHistory { available } => format!(
                "History has only {} draw(s); statistics need at least 2",
                available
            ),
            SyncError::IoError(e) => format!("File operation failed: {}", e),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
