#[cfg(test)]
#[path = "ollama_test.rs"]
mod tests;

use std::time::Duration;
use std::time::Instant;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use serde::Deserialize;
use serde::Serialize;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationResponse;
use crate::domain::models::GenerationWorker;
use crate::domain::models::InitProgress;
use crate::domain::models::WorkerName;

fn convert_err(err: reqwest::Error) -> std::io::Error {
    let err_msg = err.to_string();
    return std::io::Error::new(std::io::ErrorKind::Interrupted, err_msg);
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PullRequest {
    name: String,
    stream: bool,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PullResponse {
    #[serde(default)]
    status: String,
    digest: Option<String>,
    total: Option<u64>,
    completed: Option<u64>,
    error: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatOptions {
    num_predict: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Debug)]
struct Layer {
    digest: String,
    total: u64,
    completed: u64,
}

/// Folds the pull stream into load progress. Layers are the chunks, and bytes
/// are summed over every layer seen so far. Ollama only announces a layer
/// when it starts downloading it, so the ratio can dip when a new layer shows
/// up; reported progress holds at its previous high instead.
#[derive(Debug)]
struct PullProgress {
    started: Instant,
    layers: Vec<Layer>,
    current: usize,
    last: InitProgress,
}

impl PullProgress {
    fn new() -> PullProgress {
        return PullProgress {
            started: Instant::now(),
            layers: vec![],
            current: 0,
            last: InitProgress::zero(),
        };
    }

    fn apply(&mut self, res: &PullResponse) -> Option<InitProgress> {
        if let Some(digest) = &res.digest {
            let total = res.total.unwrap_or_default();
            let completed = res.completed.unwrap_or_default().min(total);

            match self.layers.iter().position(|e| return &e.digest == digest) {
                Some(idx) => {
                    let layer = &mut self.layers[idx];
                    layer.total = total;
                    layer.completed = layer.completed.max(completed);
                    self.current = idx;
                }
                None => {
                    self.layers.push(Layer {
                        digest: digest.to_string(),
                        total,
                        completed,
                    });
                    self.current = self.layers.len() - 1;
                }
            }
        } else if res.status != "success" {
            return None;
        }

        let fetched_bytes = self.layers.iter().map(|e| return e.completed).sum::<u64>();
        let total_bytes = self.layers.iter().map(|e| return e.total).sum::<u64>();

        let mut progress = 0.0;
        if total_bytes > 0 {
            // Only the final status may report a complete load.
            progress = (fetched_bytes as f64 / total_bytes as f64).min(0.99);
        }
        if res.status == "success" {
            progress = 1.0;
        }

        self.last = InitProgress {
            progress: progress.max(self.last.progress),
            time_elapsed: self.started.elapsed().as_secs_f64(),
            current_chunk: ((self.current + 1).min(self.layers.len()) as u64)
                .max(self.last.current_chunk),
            total_chunks: self.layers.len() as u64,
            fetched_bytes: fetched_bytes.max(self.last.fetched_bytes),
            total_bytes: total_bytes.max(self.last.total_bytes),
        };

        return Some(self.last);
    }
}

/// Maps conversation roles onto the two roles Ollama understands, with the
/// system prompt first.
fn to_chat_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let mut messages = vec![];
    if !request.conversation.system_prompt.is_empty() {
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: request.conversation.system_prompt.to_string(),
        });
    }

    for message in &request.conversation.messages {
        let mut role = "user";
        if message.role == request.assistant_role_name {
            role = "assistant";
        }

        messages.push(ChatMessage {
            role: role.to_string(),
            content: message.text.to_string(),
        });
    }

    return messages;
}

pub struct Ollama {
    url: String,
    model: String,
    timeout: String,
}

impl Default for Ollama {
    fn default() -> Ollama {
        return Ollama {
            url: Config::get(ConfigKey::OllamaURL),
            model: Config::get(ConfigKey::Model),
            timeout: Config::get(ConfigKey::WorkerHealthCheckTimeout),
        };
    }
}

impl Ollama {
    async fn health_check(&self) -> Result<()> {
        let res = reqwest::Client::new()
            .get(&self.url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        let res = match res {
            Ok(res) => res,
            Err(err) => {
                tracing::error!(error = ?err, url = %self.url, "Ollama is not running");
                bail!("Ollama is not running at {}", self.url);
            }
        };

        if res.status() != 200 {
            tracing::error!(status = res.status().as_u16(), "Ollama health check failed");
            bail!("Ollama health check failed");
        }

        return Ok(());
    }
}

#[async_trait]
impl GenerationWorker for Ollama {
    fn name(&self) -> WorkerName {
        return WorkerName::Ollama;
    }

    #[allow(clippy::implicit_return)]
    async fn init<'a>(&self, tx: &'a mpsc::UnboundedSender<InitProgress>) -> Result<()> {
        if self.model.is_empty() {
            bail!("No model was configured for the Ollama worker. Pass one with --model.");
        }

        self.health_check().await?;

        let res = reqwest::Client::new()
            .post(format!("{url}/api/pull", url = self.url))
            .json(&PullRequest {
                name: self.model.to_string(),
                stream: true,
            })
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                model = %self.model,
                "Failed to pull model from Ollama"
            );
            bail!("Failed to pull model {} from Ollama", self.model);
        }

        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();
        let mut progress = PullProgress::new();

        while let Some(line) = lines_reader.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let pres: PullResponse = serde_json::from_str(&line)?;
            if let Some(err) = pres.error {
                bail!("Ollama failed to pull {}: {err}", self.model);
            }

            tracing::debug!(status = %pres.status, "Pull response");
            if let Some(snapshot) = progress.apply(&pres) {
                tx.send(snapshot)?;
            }
        }

        if !progress.last.is_complete() {
            bail!("Ollama stopped pulling {} before it finished", self.model);
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate<'a>(
        &self,
        request: GenerationRequest,
        tx: &'a mpsc::UnboundedSender<GenerationResponse>,
        cancel: CancellationToken,
    ) -> Result<()> {
        let req = ChatRequest {
            model: self.model.to_string(),
            messages: to_chat_messages(&request),
            stream: true,
            options: ChatOptions {
                num_predict: request.max_tokens,
                stop: request.stop_sequences.clone(),
            },
        };

        let res = reqwest::Client::new()
            .post(format!("{url}/api/chat", url = self.url))
            .json(&req)
            .send()
            .await?;

        if !res.status().is_success() {
            tracing::error!(
                status = res.status().as_u16(),
                "Failed to make chat request to Ollama"
            );
            bail!("Failed to make chat request to Ollama");
        }

        let stream = res.bytes_stream().map_err(convert_err);
        let mut lines_reader = StreamReader::new(stream).lines();
        let mut text = String::new();

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(request_id = %request.request_id, "Ollama chat cancelled");
                    return Ok(());
                }
                line = lines_reader.next_line() => line?,
            };

            let line = match line {
                Some(line) => line,
                None => break,
            };
            if line.trim().is_empty() {
                continue;
            }

            let ores: ChatResponse = serde_json::from_str(&line)?;
            if let Some(err) = ores.error {
                bail!(err);
            }

            if let Some(message) = ores.message {
                text.push_str(&message.content);
            }

            if ores.done {
                tx.send(GenerationResponse::finished(&request.request_id, &text))?;
                return Ok(());
            }

            tx.send(GenerationResponse::partial(&request.request_id, &text))?;
        }

        return Ok(());
    }
}
