#[cfg(test)]
#[path = "worker_proxy_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::domain::models::GenerationRequest;
use crate::domain::models::GenerationResponse;
use crate::domain::models::InitProgress;
use crate::domain::models::SessionError;
use crate::domain::models::WorkerBox;
use crate::domain::models::WorkerName;

enum WorkerCommand {
    Init {
        progress_tx: mpsc::UnboundedSender<InitProgress>,
        done_tx: oneshot::Sender<Result<()>>,
    },
    Generate {
        request: GenerationRequest,
        response_tx: mpsc::UnboundedSender<GenerationResponse>,
        cancel: CancellationToken,
    },
}

/// Handle to a worker running in its own task. Commands are processed one at
/// a time in the order they were sent; the only way to reach the worker is
/// through this handle.
pub struct WorkerProxy {
    name: WorkerName,
    tx: mpsc::UnboundedSender<WorkerCommand>,
}

async fn run_worker(worker: WorkerBox, mut rx: mpsc::UnboundedReceiver<WorkerCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            WorkerCommand::Init {
                progress_tx,
                done_tx,
            } => {
                let res = worker.init(&progress_tx).await;
                if let Err(err) = &res {
                    tracing::error!(worker = %worker.name(), error = ?err, "Worker failed to initialize");
                }
                // The caller may have stopped waiting.
                let _ = done_tx.send(res);
            }
            WorkerCommand::Generate {
                request,
                response_tx,
                cancel,
            } => {
                let request_id = request.request_id.to_string();
                tracing::debug!(worker = %worker.name(), request_id = %request_id, "Generating");

                let res = worker.generate(request, &response_tx, cancel).await;
                if let Err(err) = res {
                    tracing::error!(worker = %worker.name(), request_id = %request_id, error = ?err, "Generation failed");
                    let _ = response_tx.send(GenerationResponse::failed(
                        &request_id,
                        "",
                        &format!("The worker failed with the following error: {err}"),
                    ));
                }
            }
        }
    }

    tracing::debug!(worker = %worker.name(), "Worker stopped");
}

impl WorkerProxy {
    pub fn spawn(worker: WorkerBox) -> WorkerProxy {
        let name = worker.name();
        let (tx, rx) = mpsc::unbounded_channel::<WorkerCommand>();
        tokio::spawn(run_worker(worker, rx));

        return WorkerProxy { name, tx };
    }

    pub fn name(&self) -> WorkerName {
        return self.name.clone();
    }

    pub fn is_available(&self) -> bool {
        return !self.tx.is_closed();
    }

    pub fn init(
        &self,
        progress_tx: mpsc::UnboundedSender<InitProgress>,
        done_tx: oneshot::Sender<Result<()>>,
    ) -> Result<(), SessionError> {
        return self
            .tx
            .send(WorkerCommand::Init {
                progress_tx,
                done_tx,
            })
            .map_err(|_| return self.unavailable());
    }

    pub fn generate(
        &self,
        request: GenerationRequest,
        response_tx: mpsc::UnboundedSender<GenerationResponse>,
        cancel: CancellationToken,
    ) -> Result<(), SessionError> {
        return self
            .tx
            .send(WorkerCommand::Generate {
                request,
                response_tx,
                cancel,
            })
            .map_err(|_| return self.unavailable());
    }

    pub fn unavailable(&self) -> SessionError {
        return SessionError::WorkerUnavailable(format!(
            "the {} worker has stopped running",
            self.name
        ));
    }
}
