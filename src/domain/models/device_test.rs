use super::AdapterInfo;
use super::DetectorName;
use super::DeviceCapability;
use super::DeviceInfo;
use super::DeviceOutcome;
use super::UNSUPPORTED_DEVICE_REASON;

fn device_info() -> DeviceInfo {
    return DeviceInfo {
        adapter: "nvidia".to_string(),
        device: "NVIDIA GeForce RTX 3080".to_string(),
        adapter_info: AdapterInfo {
            vendor: "nvidia".to_string(),
            architecture: "".to_string(),
            driver: "535.54.03".to_string(),
            description: "10240 MiB".to_string(),
        },
    };
}

#[test]
fn it_parses_detector_names() {
    assert_eq!(
        DetectorName::parse("nvidia-smi".to_string()),
        Some(DetectorName::NvidiaSmi)
    );
    assert_eq!(DetectorName::parse("none".to_string()), Some(DetectorName::None));
    assert_eq!(DetectorName::parse("metal".to_string()), None);
}

#[test]
fn it_starts_unchecked() {
    let capability = DeviceCapability::default();
    assert!(!capability.checked());
    assert_eq!(capability.outcome(), DeviceOutcome::Pending);
    assert!(capability.adapter().is_none());
    assert!(capability.unsupported_reason().is_none());
}

#[test]
fn it_populates_only_device_fields_when_supported() {
    let capability = DeviceCapability::supported(device_info());
    assert!(capability.checked());
    assert!(capability.is_supported());
    assert_eq!(capability.outcome(), DeviceOutcome::Supported);
    assert_eq!(capability.adapter(), Some("nvidia"));
    assert_eq!(capability.device(), Some("NVIDIA GeForce RTX 3080"));
    assert_eq!(capability.adapter_info().unwrap().driver, "535.54.03");
    assert!(capability.unsupported_reason().is_none());
}

#[test]
fn it_populates_only_the_reason_when_unsupported() {
    let capability = DeviceCapability::unsupported();
    assert!(capability.checked());
    assert!(!capability.is_supported());
    assert_eq!(capability.outcome(), DeviceOutcome::Unsupported);
    assert!(capability.adapter().is_none());
    assert!(capability.device().is_none());
    assert!(capability.adapter_info().is_none());
    assert_eq!(capability.unsupported_reason(), Some(UNSUPPORTED_DEVICE_REASON));
}

#[test]
fn it_keeps_the_failure_message_when_probing_fails() {
    let capability = DeviceCapability::probe_failed("permission denied");
    assert!(capability.checked());
    assert_eq!(capability.outcome(), DeviceOutcome::ProbeFailed);
    assert!(capability.adapter().is_none());
    assert_eq!(capability.unsupported_reason(), Some("permission denied"));
}

#[test]
fn it_describes_capabilities() {
    insta::assert_snapshot!(DeviceCapability::unchecked().describe(), @"Device detection has not finished yet.");
    insta::assert_snapshot!(DeviceCapability::supported(device_info()).describe(), @"NVIDIA GeForce RTX 3080 (nvidia), driver 535.54.03, 10240 MiB");
    insta::assert_snapshot!(DeviceCapability::probe_failed("boom").describe(), @"boom");
}
