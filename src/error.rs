use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClosureError {
    #[error("Failed to fetch tracked entities: {0}")]
    Fetch(String),

    #[error("Lookup failed for tracked entity {id}: {message}")]
    Lookup { id: String, message: String },

    #[error(
        "Unable to reconcile {} of {requested} tracked entities ({reconciled} succeeded)",
        .requested - .reconciled
    )]
    ReconciliationIncomplete { requested: usize, reconciled: usize },

    #[error("Payload rejected by server: {0}")]
    Validation(String),

    #[error("Failed to submit payload: {0}")]
    Submit(String),

    #[error("Report export failed: {0}")]
    Report(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ClosureError {
    /// Number of entities that could not be reconciled, if this is a reconciliation failure
    pub fn shortfall(&self) -> Option<usize> {
        match self {
            ClosureError::ReconciliationIncomplete { requested, reconciled } => {
                Some(requested.saturating_sub(*reconciled))
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClosureError>;
