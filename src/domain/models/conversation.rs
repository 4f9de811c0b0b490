#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Short identifier used for conversations, e.g. `1a2b3c4d-5e6f`.
pub fn create_id() -> String {
    return Uuid::new_v4()
        .to_string()
        .split('-')
        .enumerate()
        .filter_map(|(idx, str)| {
            if idx > 1 {
                return None;
            }
            return Some(str);
        })
        .collect::<Vec<&str>>()
        .join("-");
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: &str, text: &str) -> Message {
        return Message::with_id(&Uuid::new_v4().to_string(), role, text);
    }

    pub fn with_id(id: &str, role: &str, text: &str) -> Message {
        let now = Utc::now();
        return Message {
            id: id.to_string(),
            role: role.to_string(),
            text: text.to_string(),
            created_at: now,
            updated_at: now,
        };
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub system_prompt: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(title: &str, system_prompt: &str) -> Conversation {
        let now = Utc::now();
        return Conversation {
            id: create_id(),
            title: title.to_string(),
            system_prompt: system_prompt.to_string(),
            messages: vec![],
            created_at: now,
            updated_at: now,
        };
    }

    /// Inserts the message, or replaces the text of an existing message with
    /// the same id. The original `created_at` of a replaced message is kept.
    pub fn upsert_message(&mut self, message: Message) {
        let now = Utc::now();
        if let Some(existing) = self.messages.iter_mut().find(|e| return e.id == message.id) {
            existing.text = message.text;
            existing.role = message.role;
            existing.updated_at = now;
        } else {
            self.messages.push(message);
        }

        self.updated_at = now;
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.updated_at = Utc::now();
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.updated_at = Utc::now();
    }
}

/// Orders conversations most recently updated first. Ties keep their input
/// order.
pub fn sort_by_recent(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| return b.updated_at.cmp(&a.updated_at));
}
