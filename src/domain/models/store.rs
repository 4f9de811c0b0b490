use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

use super::Conversation;
use super::Message;

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum StoreName {
    Yaml,
    Memory,
}

impl StoreName {
    pub fn parse(text: String) -> Option<StoreName> {
        return StoreName::iter().find(|e| return e.to_string() == text);
    }
}

/// Persistence for conversations. Implementations serialize their own
/// writes, so the controller can share one handle across tasks.
#[async_trait]
pub trait ConversationStore {
    async fn conversation(&self, id: &str) -> Result<Option<Conversation>>;

    /// All conversations, in no particular order.
    async fn conversations(&self) -> Result<Vec<Conversation>>;

    async fn create_conversation(&self, conversation: Conversation) -> Result<()>;

    /// Adds the message to the conversation, replacing any existing message
    /// with the same id. Fails if the conversation does not exist.
    async fn add_message(&self, conversation_id: &str, message: Message) -> Result<()>;

    async fn set_conversation_title(&self, id: &str, title: &str) -> Result<()>;

    /// Deletes the conversation. Clears the current pointer if it pointed at
    /// it.
    async fn delete_conversation(&self, id: &str) -> Result<()>;

    async fn delete_all_conversations(&self) -> Result<()>;

    async fn delete_messages(&self, conversation_id: &str) -> Result<()>;

    async fn current_conversation_id(&self) -> Result<Option<String>>;

    async fn set_current_conversation_id(&self, id: Option<String>) -> Result<()>;
}

pub type StoreBox = Arc<dyn ConversationStore + Send + Sync>;
