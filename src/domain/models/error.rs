use thiserror::Error;

/// Failures reported synchronously by the session controller. Worker and
/// device failures never show up here; they are recorded as state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No conversation is selected. Create or open one before sending a message.")]
    NoActiveConversation,

    #[error("Cannot send an empty message.")]
    EmptyMessage,

    #[error("A response is already being generated. Wait for it to finish or cancel it first.")]
    AlreadyGenerating,

    #[error("The conversation store is not ready yet.")]
    StoreNotReady,

    #[error("The generation worker is unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("No conversation found for id {0}")]
    ConversationNotFound(String),

    #[error("The conversation store failed: {0}")]
    Store(anyhow::Error),
}
