#[derive(Debug, thiserror::Error)]
pub enum AutoBrowseError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AutoBrowseError {
    /// Wrap a store failure, keeping the full context chain in the message.
    pub(crate) fn storage(err: anyhow::Error) -> Self {
        Self::Storage(format!("{:#}", err))
    }
}
