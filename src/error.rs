use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashboardError>;

#[derive(Debug, Error)]
pub enum DashboardError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    /// Uploaded or received data could not be coerced into a record.
    #[error("parse error{}: {message}", row.map(|r| format!(" at row {r}")).unwrap_or_default())]
    Parse { row: Option<usize>, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    pub fn parse(message: impl Into<String>) -> Self {
        DashboardError::Parse {
            row: None,
            message: message.into(),
        }
    }

    pub fn parse_at(row: usize, message: impl Into<String>) -> Self {
        DashboardError::Parse {
            row: Some(row),
            message: message.into(),
        }
    }

    /// True for failures of a fetch or submit, whatever the cause.
    pub fn is_network(&self) -> bool {
        matches!(self, DashboardError::Network(_) | DashboardError::Api { .. })
    }
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::parse(err.to_string())
        } else {
            DashboardError::Network(err.to_string())
        }
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        let row = err.position().map(|p| p.line() as usize);
        DashboardError::Parse {
            row,
            message: err.to_string(),
        }
    }
}
