#[cfg(test)]
#[path = "device_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;

pub const UNSUPPORTED_DEVICE_REASON: &str = "No supported GPU was found in this environment. A GPU is required to run models locally with acceptable performance.";

#[derive(Clone, Debug, PartialEq, Eq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum DetectorName {
    NvidiaSmi,
    None,
}

impl DetectorName {
    pub fn parse(text: String) -> Option<DetectorName> {
        return DetectorName::iter().find(|e| return e.to_string() == text);
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdapterInfo {
    pub vendor: String,
    pub architecture: String,
    pub driver: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub adapter: String,
    pub device: String,
    pub adapter_info: AdapterInfo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeviceOutcome {
    Pending,
    Supported,
    /// Probing finished but found nothing usable.
    Unsupported,
    /// Probing itself errored.
    ProbeFailed,
}

/// Result of capability detection. Device fields and `unsupported_reason`
/// are never populated together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DeviceCapability {
    checked: bool,
    outcome: DeviceOutcome,
    info: Option<DeviceInfo>,
    unsupported_reason: Option<String>,
}

impl Default for DeviceCapability {
    fn default() -> DeviceCapability {
        return DeviceCapability::unchecked();
    }
}

impl DeviceCapability {
    pub fn unchecked() -> DeviceCapability {
        return DeviceCapability {
            checked: false,
            outcome: DeviceOutcome::Pending,
            info: None,
            unsupported_reason: None,
        };
    }

    pub fn supported(info: DeviceInfo) -> DeviceCapability {
        return DeviceCapability {
            checked: true,
            outcome: DeviceOutcome::Supported,
            info: Some(info),
            unsupported_reason: None,
        };
    }

    pub fn unsupported() -> DeviceCapability {
        return DeviceCapability {
            checked: true,
            outcome: DeviceOutcome::Unsupported,
            info: None,
            unsupported_reason: Some(UNSUPPORTED_DEVICE_REASON.to_string()),
        };
    }

    pub fn probe_failed(reason: &str) -> DeviceCapability {
        return DeviceCapability {
            checked: true,
            outcome: DeviceOutcome::ProbeFailed,
            info: None,
            unsupported_reason: Some(reason.to_string()),
        };
    }

    pub fn checked(&self) -> bool {
        return self.checked;
    }

    pub fn outcome(&self) -> DeviceOutcome {
        return self.outcome;
    }

    pub fn is_supported(&self) -> bool {
        return self.info.is_some();
    }

    pub fn adapter(&self) -> Option<&str> {
        return self.info.as_ref().map(|e| return e.adapter.as_str());
    }

    pub fn device(&self) -> Option<&str> {
        return self.info.as_ref().map(|e| return e.device.as_str());
    }

    pub fn adapter_info(&self) -> Option<&AdapterInfo> {
        return self.info.as_ref().map(|e| return &e.adapter_info);
    }

    pub fn unsupported_reason(&self) -> Option<&str> {
        return self.unsupported_reason.as_deref();
    }

    pub fn describe(&self) -> String {
        if !self.checked {
            return "Device detection has not finished yet.".to_string();
        }

        if let Some(info) = &self.info {
            let mut res = format!("{} ({})", info.device, info.adapter);
            if !info.adapter_info.driver.is_empty() {
                res = format!("{res}, driver {}", info.adapter_info.driver);
            }
            if !info.adapter_info.description.is_empty() {
                res = format!("{res}, {}", info.adapter_info.description);
            }
            return res;
        }

        return self.unsupported_reason.clone().unwrap_or_default();
    }
}

#[async_trait]
pub trait DeviceDetector {
    /// Returns the name of the detector.
    fn name(&self) -> DetectorName;

    /// Looks for a device capable of running the model. `Ok(None)` means
    /// probing worked but nothing usable exists. An error means probing
    /// itself failed.
    async fn detect(&self) -> Result<Option<DeviceInfo>>;
}

pub type DetectorBox = Box<dyn DeviceDetector + Send + Sync>;
