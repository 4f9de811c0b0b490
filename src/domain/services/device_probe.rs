#[cfg(test)]
#[path = "device_probe_test.rs"]
mod tests;

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::watch;

use crate::domain::models::DetectorBox;
use crate::domain::models::DeviceCapability;

/// Publishes the outcome of capability detection. `checked` only ever goes
/// from false to true, and detection runs only when asked to.
pub struct DeviceProbe {
    capability: watch::Sender<DeviceCapability>,
    probing: AtomicBool,
}

impl Default for DeviceProbe {
    fn default() -> DeviceProbe {
        let (capability, _) = watch::channel(DeviceCapability::unchecked());
        return DeviceProbe {
            capability,
            probing: AtomicBool::new(false),
        };
    }
}

impl DeviceProbe {
    /// Claims the probe. Returns false if another probe already holds it.
    pub fn try_begin(&self) -> bool {
        if self
            .probing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Device probe already running, skipping");
            return false;
        }

        return true;
    }

    /// Runs the detector once and records the outcome. Returns false without
    /// probing if another probe is already running.
    pub async fn run(&self, detector: &DetectorBox) -> bool {
        if !self.try_begin() {
            return false;
        }

        self.probe(detector).await;
        return true;
    }

    /// Runs the detector for a probe claimed with `try_begin`, then releases
    /// the claim.
    pub async fn probe(&self, detector: &DetectorBox) {
        let capability = match detector.detect().await {
            Ok(Some(info)) => {
                tracing::debug!(adapter = %info.adapter, device = %info.device, "Device detected");
                DeviceCapability::supported(info)
            }
            Ok(None) => {
                tracing::warn!(detector = %detector.name(), "No supported device found");
                DeviceCapability::unsupported()
            }
            Err(err) => {
                tracing::error!(detector = %detector.name(), error = ?err, "Device probe failed");
                DeviceCapability::probe_failed(&err.to_string())
            }
        };

        self.capability.send_replace(capability);
        self.probing.store(false, Ordering::SeqCst);
    }

    pub fn capability(&self) -> DeviceCapability {
        return self.capability.borrow().clone();
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceCapability> {
        return self.capability.subscribe();
    }
}
