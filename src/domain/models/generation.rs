#[cfg(test)]
#[path = "generation_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::Conversation;
use super::InitProgress;

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum WorkerName {
    Ollama,
    Echo,
}

impl WorkerName {
    pub fn parse(text: String) -> Option<WorkerName> {
        return WorkerName::iter().find(|e| return e.to_string() == text);
    }
}

/// When streamed assistant text is written to the conversation store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CommitPolicy {
    /// Upsert the assistant message on every streamed response.
    Streaming,
    /// Write the assistant message once, when the terminal response arrives.
    OnFinish,
}

impl CommitPolicy {
    pub fn parse(text: String) -> Option<CommitPolicy> {
        return CommitPolicy::iter().find(|e| return e.to_string() == text);
    }
}

/// Stop strings used when a caller does not supply any. Stopping on either
/// role name keeps the model from writing the next turn itself.
pub fn default_stop_sequences(user_role_name: &str, assistant_role_name: &str) -> Vec<String> {
    return vec![user_role_name.to_string(), assistant_role_name.to_string()];
}

#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub request_id: String,
    pub conversation: Conversation,
    pub stop_sequences: Vec<String>,
    pub max_tokens: u32,
    pub assistant_role_name: String,
}

impl GenerationRequest {
    pub fn last_message_text(&self) -> String {
        return self
            .conversation
            .messages
            .last()
            .map(|e| return e.text.to_string())
            .unwrap_or_default();
    }
}

/// One streamed update for a request. `output_text` holds everything the
/// model has produced for the request so far, not just the latest token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationResponse {
    pub request_id: String,
    pub output_text: String,
    pub is_finished: bool,
    pub error: Option<String>,
}

impl GenerationResponse {
    pub fn partial(request_id: &str, output_text: &str) -> GenerationResponse {
        return GenerationResponse {
            request_id: request_id.to_string(),
            output_text: output_text.to_string(),
            is_finished: false,
            error: None,
        };
    }

    pub fn finished(request_id: &str, output_text: &str) -> GenerationResponse {
        return GenerationResponse {
            request_id: request_id.to_string(),
            output_text: output_text.to_string(),
            is_finished: true,
            error: None,
        };
    }

    pub fn failed(request_id: &str, output_text: &str, error: &str) -> GenerationResponse {
        return GenerationResponse {
            request_id: request_id.to_string(),
            output_text: output_text.to_string(),
            is_finished: true,
            error: Some(error.to_string()),
        };
    }

    pub fn is_error(&self) -> bool {
        return self.error.is_some();
    }
}

#[async_trait]
pub trait GenerationWorker {
    /// Returns the name of the worker.
    fn name(&self) -> WorkerName;

    /// Loads the model. Progress snapshots are sent through `tx` as loading
    /// advances, and must never decrease within one call.
    async fn init<'a>(&self, tx: &'a mpsc::UnboundedSender<InitProgress>) -> Result<()>;

    /// Generates a reply for the last message in the request's conversation.
    /// Each update is sent through `tx` tagged with the request id, with the
    /// final update marked `is_finished`.
    ///
    /// Workers should stop early once `cancel` is triggered. Returning an
    /// error is reported to the caller as a failed terminal response.
    async fn generate<'a>(
        &self,
        request: GenerationRequest,
        tx: &'a mpsc::UnboundedSender<GenerationResponse>,
        cancel: CancellationToken,
    ) -> Result<()>;
}

pub type WorkerBox = Box<dyn GenerationWorker + Send + Sync>;
