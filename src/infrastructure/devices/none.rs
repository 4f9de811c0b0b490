#[cfg(test)]
#[path = "none_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::DetectorName;
use crate::domain::models::DeviceDetector;
use crate::domain::models::DeviceInfo;

/// Never finds a device. Useful on machines where probing is pointless.
#[derive(Default)]
pub struct NoDevice {}

#[async_trait]
impl DeviceDetector for NoDevice {
    fn name(&self) -> DetectorName {
        return DetectorName::None;
    }

    #[allow(clippy::implicit_return)]
    async fn detect(&self) -> Result<Option<DeviceInfo>> {
        return Ok(None);
    }
}
