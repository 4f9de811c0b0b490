pub mod echo;
pub mod ollama;

use anyhow::Result;

use crate::domain::models::WorkerBox;
use crate::domain::models::WorkerName;

pub struct WorkerManager {}

impl WorkerManager {
    pub fn get(name: WorkerName) -> Result<WorkerBox> {
        match name {
            WorkerName::Ollama => return Ok(Box::<ollama::Ollama>::default()),
            WorkerName::Echo => return Ok(Box::<echo::Echo>::default()),
        }
    }
}
