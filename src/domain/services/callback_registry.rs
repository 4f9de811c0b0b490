#[cfg(test)]
#[path = "callback_registry_test.rs"]
mod tests;

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::domain::models::default_stop_sequences;
use crate::domain::models::GenerationResponse;

pub type MessageObserver = Arc<dyn Fn(&GenerationResponse) + Send + Sync>;

pub const DEFAULT_USER_ROLE_NAME: &str = "user";
pub const DEFAULT_ASSISTANT_ROLE_NAME: &str = "assistant";

/// Holds the single response observer and the role names stamped on new
/// messages. Setting an observer replaces the previous one.
pub struct CallbackRegistry {
    observer: RwLock<Option<MessageObserver>>,
    user_role_name: RwLock<String>,
    assistant_role_name: RwLock<String>,
}

impl Default for CallbackRegistry {
    fn default() -> CallbackRegistry {
        return CallbackRegistry {
            observer: RwLock::new(None),
            user_role_name: RwLock::new(DEFAULT_USER_ROLE_NAME.to_string()),
            assistant_role_name: RwLock::new(DEFAULT_ASSISTANT_ROLE_NAME.to_string()),
        };
    }
}

impl CallbackRegistry {
    pub fn set_observer(&self, observer: MessageObserver) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    /// Invokes the registered observer, if any. The lock is released before
    /// the call so an observer may replace itself.
    pub fn notify(&self, response: &GenerationResponse) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(observer) = observer {
            observer(response);
        }
    }

    pub fn user_role_name(&self) -> String {
        return self
            .user_role_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_string();
    }

    pub fn set_user_role_name(&self, name: &str) {
        *self
            .user_role_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = name.to_string();
    }

    pub fn assistant_role_name(&self) -> String {
        return self
            .assistant_role_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_string();
    }

    pub fn set_assistant_role_name(&self, name: &str) {
        *self
            .assistant_role_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = name.to_string();
    }

    pub fn default_stop_sequences(&self) -> Vec<String> {
        return default_stop_sequences(&self.user_role_name(), &self.assistant_role_name());
    }
}
