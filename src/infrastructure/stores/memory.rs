#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::domain::models::Conversation;
use crate::domain::models::ConversationStore;
use crate::domain::models::Message;

/// Conversations kept in memory for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
    conversations: DashMap<String, Conversation>,
    current_id: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn from_conversations(
        conversations: Vec<Conversation>,
        current_id: Option<String>,
    ) -> MemoryStore {
        let by_id = DashMap::new();
        for conversation in conversations {
            by_id.insert(conversation.id.to_string(), conversation);
        }

        let current_id = current_id.filter(|id| return by_id.contains_key(id));
        return MemoryStore {
            conversations: by_id,
            current_id: RwLock::new(current_id),
        };
    }

    /// Applies `f` to the stored conversation and returns the updated copy.
    pub fn update<F: FnOnce(&mut Conversation)>(&self, id: &str, f: F) -> Result<Conversation> {
        if let Some(mut conversation) = self.conversations.get_mut(id) {
            f(&mut conversation);
            return Ok(conversation.clone());
        }

        bail!(format!("No conversation found for id {id}"));
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    #[allow(clippy::implicit_return)]
    async fn conversation(&self, id: &str) -> Result<Option<Conversation>> {
        return Ok(self.conversations.get(id).map(|e| return e.clone()));
    }

    #[allow(clippy::implicit_return)]
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        return Ok(self
            .conversations
            .iter()
            .map(|e| return e.value().clone())
            .collect::<Vec<Conversation>>());
    }

    #[allow(clippy::implicit_return)]
    async fn create_conversation(&self, conversation: Conversation) -> Result<()> {
        if self.conversations.contains_key(&conversation.id) {
            bail!(format!(
                "Conversation {} already exists",
                conversation.id
            ));
        }

        self.conversations
            .insert(conversation.id.to_string(), conversation);
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn add_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        self.update(conversation_id, |conversation| {
            conversation.upsert_message(message);
        })?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn set_conversation_title(&self, id: &str, title: &str) -> Result<()> {
        self.update(id, |conversation| {
            conversation.set_title(title);
        })?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn delete_conversation(&self, id: &str) -> Result<()> {
        self.conversations.remove(id);

        let mut current_id = self.current_id.write().await;
        if current_id.as_deref() == Some(id) {
            *current_id = None;
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn delete_all_conversations(&self) -> Result<()> {
        self.conversations.clear();
        *self.current_id.write().await = None;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn delete_messages(&self, conversation_id: &str) -> Result<()> {
        self.update(conversation_id, |conversation| {
            conversation.clear_messages();
        })?;
        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn current_conversation_id(&self) -> Result<Option<String>> {
        return Ok(self.current_id.read().await.clone());
    }

    #[allow(clippy::implicit_return)]
    async fn set_current_conversation_id(&self, id: Option<String>) -> Result<()> {
        if let Some(id) = &id {
            if !self.conversations.contains_key(id) {
                bail!(format!("No conversation found for id {id}"));
            }
        }

        *self.current_id.write().await = id;
        return Ok(());
    }
}
