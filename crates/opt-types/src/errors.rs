use thiserror::Error;

/// Main error type for Optimist.
///
/// Every variant is fatal to the run that raised it; nothing in the engine
/// retries.
#[derive(Error, Debug)]
pub enum OptError {
    #[error("Point outside bounds for parameter {parameter}: {value} not in [{min}, {max}]")]
    OutOfBounds {
        parameter: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Assign bounds for parameter {parameter}")]
    MissingBounds { parameter: String },

    #[error("Parameter \"{name}\" not defined")]
    UnknownParameter { name: String },

    #[error("Parameter name already exists: {name}")]
    DuplicateParameter { name: String },

    #[error("Dimension mismatch: expected {expected} coordinates, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid bounds for parameter {parameter}: [{min}, {max}]")]
    InvalidBounds {
        parameter: String,
        min: f64,
        max: f64,
    },

    #[error("Zoom with threshold {threshold} left no rows to derive bounds from")]
    EmptyZoom { threshold: f64 },

    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Column mismatch: expected {expected:?}, got {actual:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Structured result is missing the result column \"{column}\"")]
    MissingResultColumn { column: String },

    #[error("Surrogate fit failed: {0}")]
    SurrogateFit(String),

    #[error("Surrogate model has not been fitted")]
    SurrogateNotFitted,

    #[error("Experiment error: {0}")]
    Experiment(String),

    #[error("Actuation of {parameter} failed: {message}")]
    Actuation { parameter: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Arrow error: {0}")]
    Arrow(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<arrow::error::ArrowError> for OptError {
    fn from(err: arrow::error::ArrowError) -> Self {
        OptError::Arrow(err.to_string())
    }
}

/// Result type alias for Optimist operations
pub type OptResult<T> = Result<T, OptError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::OptError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::OptError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::OptError::Config(format!($($arg)*))
    };
}
