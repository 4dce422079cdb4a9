use std::fmt;
use std::io;

/// Error type shared by the cost source, the report pipeline and the sinks
#[derive(Debug)]
pub enum CostLensError {
    /// File I/O error
    Io(io::Error),
    /// JSON (de)serialization error
    Json(serde_json::Error),
    /// CSV writer error
    Csv(csv::Error),
    /// Configuration error
    Config { message: String },
    /// Date parse error
    DateParse {
        input: String,
        expected_format: String,
    },
    /// A breakdown was requested for a grouping dimension we do not know
    InvalidGrouping { requested: String },
    /// The cost source failed or timed out
    SourceUnavailable { query: String, message: String },
}

impl fmt::Display for CostLensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostLensError::Io(err) => write!(f, "I/O error: {}", err),
            CostLensError::Json(err) => write!(f, "JSON error: {}", err),
            CostLensError::Csv(err) => write!(f, "CSV error: {}", err),
            CostLensError::Config { message } => write!(f, "Configuration error: {}", message),
            CostLensError::DateParse {
                input,
                expected_format,
            } => write!(
                f,
                "Date parse error: '{}' (expected format: {})",
                input, expected_format
            ),
            CostLensError::InvalidGrouping { requested } => write!(
                f,
                "Invalid grouping dimension: '{}' (expected CostCenter or UsageType)",
                requested
            ),
            CostLensError::SourceUnavailable { query, message } => {
                write!(f, "Cost source unavailable for {}: {}", query, message)
            }
        }
    }
}

impl std::error::Error for CostLensError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CostLensError::Io(err) => Some(err),
            CostLensError::Json(err) => Some(err),
            CostLensError::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CostLensError {
    fn from(err: io::Error) -> Self {
        CostLensError::Io(err)
    }
}

impl From<serde_json::Error> for CostLensError {
    fn from(err: serde_json::Error) -> Self {
        CostLensError::Json(err)
    }
}

impl From<serde_yaml::Error> for CostLensError {
    fn from(err: serde_yaml::Error) -> Self {
        CostLensError::Config {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for CostLensError {
    fn from(err: csv::Error) -> Self {
        CostLensError::Csv(err)
    }
}

pub type Result<T> = std::result::Result<T, CostLensError>;

impl CostLensError {
    pub fn config_error(message: &str) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }

    pub fn date_parse_error(input: &str, expected_format: &str) -> Self {
        Self::DateParse {
            input: input.to_string(),
            expected_format: expected_format.to_string(),
        }
    }

    pub fn invalid_grouping(requested: &str) -> Self {
        Self::InvalidGrouping {
            requested: requested.to_string(),
        }
    }

    pub fn source_unavailable(query: &str, message: impl fmt::Display) -> Self {
        Self::SourceUnavailable {
            query: query.to_string(),
            message: message.to_string(),
        }
    }

    /// Longer explanation for the CLI, with hints where we have any
    pub fn detailed_message(&self) -> String {
        match self {
            CostLensError::SourceUnavailable { query, message } => format!(
                "Could not retrieve billing data for {}\nError: {}\nCheck your AWS credentials, region and Cost Explorer access.",
                query, message
            ),
            CostLensError::InvalidGrouping { requested } => format!(
                "Unknown breakdown dimension '{}'\nSupported dimensions: CostCenter, UsageType",
                requested
            ),
            _ => self.to_string(),
        }
    }
}
