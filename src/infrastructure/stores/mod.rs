mod memory;
mod yaml;

pub use memory::*;
pub use yaml::*;

use std::path;
use std::sync::Arc;

use anyhow::Result;

use crate::domain::models::StoreBox;
use crate::domain::models::StoreName;

pub struct StoreManager {}

impl StoreManager {
    /// Opens the named store. `dir` is only read by stores that persist to
    /// disk.
    pub async fn get(name: StoreName, dir: path::PathBuf) -> Result<StoreBox> {
        match name {
            StoreName::Yaml => return Ok(Arc::new(YamlStore::open(dir).await?)),
            StoreName::Memory => return Ok(Arc::new(MemoryStore::default())),
        }
    }
}
