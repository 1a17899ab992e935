#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Conditions callers need to tell apart. Everything else travels as a plain
/// `anyhow::Error`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("Failed to read {name}: {reason}")]
    Ingestion { name: String, reason: String },
    #[error("Invalid API Key. Please check your environment variables.")]
    ModelAuth,
    #[error("{0}")]
    ModelCall(String),
    #[error("The answer stream was interrupted: {0}")]
    StreamInterrupted(String),
    #[error("Cannot send an empty message")]
    EmptyMessage,
    #[error("Please upload a document before asking questions")]
    NotReady,
    #[error("Still working on the previous question")]
    Busy,
    #[error("Documents are still being ingested")]
    IngestionInProgress,
    #[error("No document at position {index}, there are {len} documents")]
    DocumentIndexOutOfRange { index: usize, len: usize },
}

impl ChatError {
    pub fn is_auth(err: &anyhow::Error) -> bool {
        return matches!(err.downcast_ref::<ChatError>(), Some(ChatError::ModelAuth));
    }
}
