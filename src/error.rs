use thiserror::Error;

/// Errors raised by the scoring and selection core and its collaborators.
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Squad incomplete ({selected}/{target}): {reason}")]
    Capacity {
        selected: usize,
        target: usize,
        reason: String,
    },

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl ScoutError {
    pub fn input(message: impl Into<String>) -> Self {
        ScoutError::Input(message.into())
    }

    /// Input errors only poison a single player's computation; callers may skip it.
    pub fn is_input(&self) -> bool {
        matches!(self, ScoutError::Input(_))
    }
}

pub type ScoutResult<T> = Result<T, ScoutError>;
