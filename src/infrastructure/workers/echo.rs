#[cfg(test)]
#[path = "echo_test.rs"]
mod tests;

use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationResponse;
use crate::domain::models::GenerationWorker;
use crate::domain::models::InitProgress;
use crate::domain::models::WorkerName;

const LOAD_CHUNKS: u64 = 4;
const CHUNK_BYTES: u64 = 250_000_000;

/// Cuts `text` at the first stop sequence found in it. Returns whether a stop
/// sequence matched.
fn truncate_at_stop(text: &mut String, stop_sequences: &[String]) -> bool {
    let cut = stop_sequences
        .iter()
        .filter(|e| return !e.is_empty())
        .filter_map(|e| return text.find(e.as_str()))
        .min();

    if let Some(idx) = cut {
        text.truncate(idx);
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        return true;
    }

    return false;
}

/// Offline worker that pretends to load a model and answers by repeating the
/// last message back one word at a time.
pub struct Echo {
    delay: Duration,
}

impl Default for Echo {
    fn default() -> Echo {
        return Echo {
            delay: Duration::from_millis(40),
        };
    }
}

#[async_trait]
impl GenerationWorker for Echo {
    fn name(&self) -> WorkerName {
        return WorkerName::Echo;
    }

    #[allow(clippy::implicit_return)]
    async fn init<'a>(&self, tx: &'a mpsc::UnboundedSender<InitProgress>) -> Result<()> {
        let started = Instant::now();
        for chunk in 1..=LOAD_CHUNKS {
            tokio::time::sleep(self.delay).await;
            tx.send(InitProgress {
                progress: chunk as f64 / LOAD_CHUNKS as f64,
                time_elapsed: started.elapsed().as_secs_f64(),
                current_chunk: chunk,
                total_chunks: LOAD_CHUNKS,
                fetched_bytes: chunk * CHUNK_BYTES,
                total_bytes: LOAD_CHUNKS * CHUNK_BYTES,
            })?;
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
        let prompt = request.last_message_text();
        let mut text = String::new();

        for word in prompt
            .split_whitespace()
            .take(request.max_tokens as usize)
        {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(request_id = %request.request_id, "Echo cancelled");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.delay) => {}
            }

            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(word);

            if truncate_at_stop(&mut text, &request.stop_sequences) {
                break;
            }

            tx.send(GenerationResponse::partial(&request.request_id, &text))?;
        }

        tx.send(GenerationResponse::finished(&request.request_id, &text))?;

        return Ok(());
    }
}
