#[cfg(test)]
#[path = "yaml_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::MemoryStore;
use crate::domain::models::Conversation;
use crate::domain::models::ConversationStore;
use crate::domain::models::Message;

const STATE_FILE: &str = "state.yaml";

#[derive(Serialize, Deserialize)]
struct ConversationFile {
    version: String,
    conversation: Conversation,
}

#[derive(Default, Serialize, Deserialize)]
struct StateFile {
    current_conversation_id: Option<String>,
}

/// File backed store. Each conversation lives in `<dir>/<id>.yaml` and the
/// current pointer in `<dir>/state.yaml`. Reads are served from memory;
/// every write goes through one lock and is flushed before it returns.
pub struct YamlStore {
    pub dir: path::PathBuf,
    memory: MemoryStore,
    write_lock: Mutex<()>,
}

impl YamlStore {
    pub fn default_dir() -> path::PathBuf {
        return dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("hearth/conversations");
    }

    /// Loads every conversation found in `dir`. A missing directory is an
    /// empty store.
    pub async fn open(dir: path::PathBuf) -> Result<YamlStore> {
        let mut conversations: Vec<Conversation> = vec![];
        let mut state = StateFile::default();

        if dir.exists() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(file) = entries.next_entry().await? {
                let file_path = file.path();
                if file_path.extension().and_then(|e| return e.to_str()) != Some("yaml") {
                    continue;
                }

                let payload = fs::read_to_string(&file_path).await?;
                if file_path.file_name().and_then(|e| return e.to_str()) == Some(STATE_FILE) {
                    state = serde_yaml::from_str(&payload)?;
                    continue;
                }

                let conversation_file: ConversationFile = serde_yaml::from_str(&payload)?;
                conversations.push(conversation_file.conversation);
            }
        }

        tracing::debug!(
            dir = %dir.display(),
            conversations = conversations.len(),
            "Opened conversation store"
        );

        return Ok(YamlStore {
            dir,
            memory: MemoryStore::from_conversations(conversations, state.current_conversation_id),
            write_lock: Mutex::new(()),
        });
    }

    fn get_file_path(&self, id: &str) -> path::PathBuf {
        return self.dir.join(format!("{id}.yaml"));
    }

    async fn write_file(&self, file_path: path::PathBuf, payload: String) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).await?;
        }

        let tmp_path = file_path.with_extension("yaml.tmp");
        let mut file = fs::File::create(&tmp_path).await?;
        file.write_all(payload.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&tmp_path, &file_path).await?;

        return Ok(());
    }

    async fn save_conversation(&self, id: &str) -> Result<()> {
        if let Some(conversation) = self.memory.conversation(id).await? {
            let payload = serde_yaml::to_string(&ConversationFile {
                version: env!("CARGO_PKG_VERSION").to_string(),
                conversation,
            })?;
            self.write_file(self.get_file_path(id), payload).await?;
        }

        return Ok(());
    }

    async fn remove_conversation_file(&self, id: &str) -> Result<()> {
        let file_path = self.get_file_path(id);
        if file_path.exists() {
            fs::remove_file(file_path).await?;
        }

        return Ok(());
    }

    async fn save_state(&self) -> Result<()> {
        let payload = serde_yaml::to_string(&StateFile {
            current_conversation_id: self.memory.current_conversation_id().await?,
        })?;

        return self.write_file(self.dir.join(STATE_FILE), payload).await;
    }
}

#[async_trait]
impl ConversationStore for YamlStore {
    #[allow(clippy::implicit_return)]
    async fn conversation(&self, id: &str) -> Result<Option<Conversation>> {
        return self.memory.conversation(id).await;
    }

    #[allow(clippy::implicit_return)]
    async fn conversations(&self) -> Result<Vec<Conversation>> {
        return self.memory.conversations().await;
    }

    #[allow(clippy::implicit_return)]
    async fn create_conversation(&self, conversation: Conversation) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let id = conversation.id.to_string();
        self.memory.create_conversation(conversation).await?;
        return self.save_conversation(&id).await;
    }

    #[allow(clippy::implicit_return)]
    async fn add_message(&self, conversation_id: &str, message: Message) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.add_message(conversation_id, message).await?;
        return self.save_conversation(conversation_id).await;
    }

    #[allow(clippy::implicit_return)]
    async fn set_conversation_title(&self, id: &str, title: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.set_conversation_title(id, title).await?;
        return self.save_conversation(id).await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_conversation(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.delete_conversation(id).await?;
        self.remove_conversation_file(id).await?;
        return self.save_state().await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_all_conversations(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let ids = self
            .memory
            .conversations()
            .await?
            .iter()
            .map(|e| return e.id.to_string())
            .collect::<Vec<String>>();

        self.memory.delete_all_conversations().await?;
        for id in ids {
            self.remove_conversation_file(&id).await?;
        }

        return self.save_state().await;
    }

    #[allow(clippy::implicit_return)]
    async fn delete_messages(&self, conversation_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.delete_messages(conversation_id).await?;
        return self.save_conversation(conversation_id).await;
    }

    #[allow(clippy::implicit_return)]
    async fn current_conversation_id(&self) -> Result<Option<String>> {
        return self.memory.current_conversation_id().await;
    }

    #[allow(clippy::implicit_return)]
    async fn set_current_conversation_id(&self, id: Option<String>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.memory.set_current_conversation_id(id).await?;
        return self.save_state().await;
    }
}
