use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Index request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed at {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Io,
    Configuration,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl AuditError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AuditError::HttpError(_) => ErrorCategory::Network,
            AuditError::CsvError(_) | AuditError::SerializationError(_) => ErrorCategory::Data,
            AuditError::IoError(_) => ErrorCategory::Io,
            AuditError::ConfigError { .. }
            | AuditError::MissingConfigError { .. }
            | AuditError::InvalidConfigValueError { .. }
            | AuditError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            AuditError::ProcessingError { .. } => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// 依錯誤類型給出修復建議
    pub fn recovery_suggestion(&self) -> String {
        match self {
            AuditError::HttpError(_) => {
                "Check network access to the package index or run without --check-index".to_string()
            }
            AuditError::CsvError(_) | AuditError::SerializationError(_) => {
                "Check that the report output directory is writable and not corrupted".to_string()
            }
            AuditError::IoError(_) => {
                "Make sure the manifest path exists and is readable".to_string()
            }
            AuditError::ConfigError { .. } | AuditError::ConfigValidationError { .. } => {
                "Review req-audit.toml for syntax errors".to_string()
            }
            AuditError::MissingConfigError { field } => {
                format!("Set '{}' in the config file or pass it on the command line", field)
            }
            AuditError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}'", field)
            }
            AuditError::ProcessingError { .. } => {
                "Re-run with --verbose to see which stage failed".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            AuditError::IoError(e) => format!("Could not read or write a file: {}", e),
            AuditError::HttpError(_) => "Package index could not be reached".to_string(),
            other => other.to_string(),
        }
    }

    /// CLI 結束碼：設定錯誤 2，其餘（I/O、網路、資料、處理）3。1 保留給檢查未通過
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Configuration => 2,
            ErrorCategory::Io
            | ErrorCategory::Network
            | ErrorCategory::Data
            | ErrorCategory::Processing => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
