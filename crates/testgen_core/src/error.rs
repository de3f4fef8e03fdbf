/// Errors produced by the generation pipeline and its collaborators.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The caller supplied something unusable (empty file set, blank summary,
    /// unknown summary index). Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The content aggregator could not supply file contents.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// The generation backend failed to produce a response.
    #[error("Backend failed: {0}")]
    Backend(String),

    /// Summary generation failed because the backend call failed.
    #[error("Summary generation failed: {cause}")]
    Generation { cause: String },
}

impl Error {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Wrap a backend failure that happened during the summary stage.
    pub fn generation(cause: impl std::fmt::Display) -> Self {
        Error::Generation {
            cause: cause.to_string(),
        }
    }

    /// True for errors caused by the caller rather than a collaborator.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::InvalidInput(_))
    }
}
