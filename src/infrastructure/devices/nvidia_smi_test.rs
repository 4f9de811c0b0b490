use anyhow::Result;

use super::parse_query_output;
use super::NvidiaSmi;
use crate::domain::models::DeviceCapability;
use crate::domain::models::DeviceDetector;

#[test]
fn it_parses_the_first_gpu() {
    let res = parse_query_output(
        "NVIDIA GeForce RTX 3080, 535.54.03, 10240 MiB\nNVIDIA GeForce RTX 3090, 535.54.03, 24576 MiB\n",
    )
    .unwrap();

    assert_eq!(res.adapter, "nvidia");
    assert_eq!(res.device, "NVIDIA GeForce RTX 3080");
    assert_eq!(res.adapter_info.driver, "535.54.03");
    insta::assert_snapshot!(DeviceCapability::supported(res).describe(), @"NVIDIA GeForce RTX 3080 (nvidia), driver 535.54.03, 10240 MiB");
}

#[test]
fn it_skips_leading_blank_lines() {
    let res = parse_query_output("\n\n  Tesla T4, 525.85.12, 15360 MiB  \n").unwrap();
    assert_eq!(res.device, "Tesla T4");
    assert_eq!(res.adapter_info.description, "15360 MiB");
}

#[test]
fn it_finds_nothing_in_empty_output() {
    assert!(parse_query_output("").is_none());
    assert!(parse_query_output("\n  \n").is_none());
    assert!(parse_query_output(", 535.54.03, 10240 MiB").is_none());
}

#[tokio::test]
async fn it_reports_no_device_when_the_binary_is_missing() -> Result<()> {
    let detector = NvidiaSmi {
        binary: "hearth-test-missing-nvidia-smi".to_string(),
    };

    assert!(detector.detect().await?.is_none());

    return Ok(());
}

#[cfg(unix)]
#[tokio::test]
async fn it_fails_when_the_binary_errors() {
    let detector = NvidiaSmi {
        binary: "false".to_string(),
    };

    assert!(detector.detect().await.is_err());
}
