pub mod none;
pub mod nvidia_smi;

use anyhow::Result;

use crate::domain::models::DetectorBox;
use crate::domain::models::DetectorName;

pub struct DetectorManager {}

impl DetectorManager {
    pub fn get(name: DetectorName) -> Result<DetectorBox> {
        match name {
            DetectorName::NvidiaSmi => return Ok(Box::<nvidia_smi::NvidiaSmi>::default()),
            DetectorName::None => return Ok(Box::<none::NoDevice>::default()),
        }
    }
}
