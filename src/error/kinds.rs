use std::{fmt, io};

/// Crate-wide `Result` type using [`ExportError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Top-level error type for export operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum ExportError {
    /// The export configuration was rejected before any encoding started.
    ConfigInvalid(ConfigInvalid),

    /// An encoder failed while producing the artifact.
    EncodeFailed {
        /// Format being produced ("csv", "xlsx", ...)
        format: String,
        /// Root cause, logged but not shown to end users
        cause: String,
    },

    /// The requested format is not one of the supported formats.
    UnsupportedFormat(String),

    /// Application settings errors.
    Settings(SettingsError),

    /// Saved-configuration store errors.
    Store(StoreError),

    /// I/O errors.
    Io(io::Error),

    /// JSON (de)serialization errors.
    Json(serde_json::Error),
}

/// Reasons an [`crate::model::ExportConfig`] is rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigInvalid {
    /// The field list is empty.
    EmptyFields,

    /// A field key appears more than once.
    DuplicateField(String),

    /// The date range starts after it ends.
    InvertedDateRange { start: String, end: String },

    /// The minimum amount filter is larger than the maximum.
    InvertedAmountRange { min: f64, max: f64 },
}

/// Settings file errors.
#[derive(Debug)]
pub enum SettingsError {
    /// Settings file not found.
    FileNotFound(String),

    /// Settings file could not be parsed.
    InvalidFormat(String),

    /// A value is outside its accepted range.
    InvalidValue { field: String, value: String },
}

/// Saved-configuration store errors.
#[derive(Debug)]
pub enum StoreError {
    /// No configuration with this id exists for the data type.
    NotFound { data_type: String, id: String },

    /// The backing file could not be read or written.
    Backend(String),
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::ConfigInvalid(e) => write!(f, "Invalid export configuration: {e}"),
            ExportError::EncodeFailed { format, .. } => {
                write!(f, "Failed to generate {format} export")
            }
            ExportError::UnsupportedFormat(format) => {
                write!(f, "Unsupported export format: {format}")
            }
            ExportError::Settings(e) => write!(f, "Configuration error: {e}"),
            ExportError::Store(e) => write!(f, "Saved configuration error: {e}"),
            ExportError::Io(e) => write!(f, "I/O error: {e}"),
            ExportError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl fmt::Display for ConfigInvalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigInvalid::EmptyFields => write!(f, "at least one field must be selected"),
            ConfigInvalid::DuplicateField(key) => write!(f, "field '{key}' is selected twice"),
            ConfigInvalid::InvertedDateRange { start, end } => {
                write!(f, "start date {start} is after end date {end}")
            }
            ConfigInvalid::InvertedAmountRange { min, max } => {
                write!(f, "minimum amount {min} is greater than maximum amount {max}")
            }
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            SettingsError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            SettingsError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::NotFound { data_type, id } => {
                write!(f, "No saved configuration '{id}' for {data_type}")
            }
            StoreError::Backend(msg) => write!(f, "Store backend failure: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}
impl std::error::Error for ConfigInvalid {}
impl std::error::Error for SettingsError {}
impl std::error::Error for StoreError {}

impl ExportError {
    /// Build an [`ExportError::EncodeFailed`] and log its root cause.
    ///
    /// The returned error's `Display` stays generic; the cause only goes to the log.
    pub fn encode_failed(format: &str, cause: impl fmt::Display) -> Self {
        let cause = cause.to_string();
        tracing::error!(format, cause = %cause, "export encoding failed");
        ExportError::EncodeFailed {
            format: format.to_string(),
            cause,
        }
    }
}

/* ========================= Conversions to ExportError ========================= */

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err)
    }
}

impl From<ConfigInvalid> for ExportError {
    fn from(err: ConfigInvalid) -> Self {
        ExportError::ConfigInvalid(err)
    }
}

impl From<SettingsError> for ExportError {
    fn from(err: SettingsError) -> Self {
        ExportError::Settings(err)
    }
}

impl From<StoreError> for ExportError {
    fn from(err: StoreError) -> Self {
        ExportError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failed_message_is_generic() {
        let err = ExportError::encode_failed("xlsx", "worksheet name too long");
        assert_eq!(err.to_string(), "Failed to generate xlsx export");
        match err {
            ExportError::EncodeFailed { cause, .. } => {
                assert_eq!(cause, "worksheet name too long")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_invalid_display() {
        let err: ExportError = ConfigInvalid::EmptyFields.into();
        assert!(err.to_string().contains("at least one field"));
    }
}
