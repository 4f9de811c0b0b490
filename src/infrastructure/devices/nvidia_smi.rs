#[cfg(test)]
#[path = "nvidia_smi_test.rs"]
mod tests;

use std::io;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use tokio::process::Command;

use crate::domain::models::AdapterInfo;
use crate::domain::models::DetectorName;
use crate::domain::models::DeviceDetector;
use crate::domain::models::DeviceInfo;

const VENDOR: &str = "nvidia";
const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=name,driver_version,memory.total",
    "--format=csv,noheader",
];

/// Parses the first GPU from `nvidia-smi` CSV output. Lines look like
/// `NVIDIA GeForce RTX 3080, 535.54.03, 10240 MiB`.
fn parse_query_output(stdout: &str) -> Option<DeviceInfo> {
    let line = stdout.lines().map(str::trim).find(|e| return !e.is_empty())?;
    let fields = line
        .split(',')
        .map(|e| return e.trim().to_string())
        .collect::<Vec<String>>();

    let name = fields.first().filter(|e| return !e.is_empty())?;
    let driver = fields.get(1).cloned().unwrap_or_default();
    let memory = fields.get(2).cloned().unwrap_or_default();

    return Some(DeviceInfo {
        adapter: VENDOR.to_string(),
        device: name.to_string(),
        adapter_info: AdapterInfo {
            vendor: VENDOR.to_string(),
            architecture: "".to_string(),
            driver,
            description: memory,
        },
    });
}

/// Looks for an NVIDIA GPU through `nvidia-smi`. A missing binary means there
/// is no supported device; a failing one is a probe error.
pub struct NvidiaSmi {
    binary: String,
}

impl Default for NvidiaSmi {
    fn default() -> NvidiaSmi {
        return NvidiaSmi {
            binary: "nvidia-smi".to_string(),
        };
    }
}

#[async_trait]
impl DeviceDetector for NvidiaSmi {
    fn name(&self) -> DetectorName {
        return DetectorName::NvidiaSmi;
    }

    #[allow(clippy::implicit_return)]
    async fn detect(&self) -> Result<Option<DeviceInfo>> {
        let output = match Command::new(&self.binary).args(QUERY_ARGS).output().await {
            Ok(output) => output,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(binary = %self.binary, "nvidia-smi is not installed");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            bail!("{} exited with {}: {stderr}", self.binary, output.status);
        }

        let stdout = String::from_utf8(output.stdout)?;
        return Ok(parse_query_output(&stdout));
    }
}
