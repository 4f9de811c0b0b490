use anyhow::Result;

use super::Config;
use super::ConfigKey;
use crate::application::cli;

#[test]
fn it_serializes_to_valid_toml() -> Result<()> {
    let res = Config::serialize_default(cli::build());
    let doc = res.parse::<toml_edit::Document>()?;

    assert_eq!(doc.get("worker").and_then(|e| return e.as_str()), Some("ollama"));
    assert_eq!(doc.get("max-tokens").and_then(|e| return e.as_integer()), Some(512));
    assert_eq!(
        doc.get("commit-policy").and_then(|e| return e.as_str()),
        Some("streaming")
    );
    assert!(doc.get("config-file").is_none());
    assert!(doc.get("conversation-id").is_none());
    assert!(res.contains("# store-dir = \"\""));
    assert!(res.contains("[possible values: ollama, echo]"));
    assert!(res.contains("[possible values: nvidia-smi, none]"));
    assert!(res.contains("[possible values: yaml, memory]"));

    return Ok(());
}

#[test]
fn it_rejects_non_numeric_values() {
    assert_eq!(Config::parse_u32(ConfigKey::MaxTokens, "64").unwrap(), 64);
    let err = Config::parse_u32(ConfigKey::WorkerHealthCheckTimeout, "soon").unwrap_err();

    insta::assert_snapshot!(err.to_string(), @"Config key 'worker-health-check-timeout' must be a positive number, got 'soon'");
}

#[tokio::test]
async fn it_loads_config_from_file() -> Result<()> {
    let matches = cli::build().try_get_matches_from(vec!["hearth", "-c", "./config.example.toml"])?;
    Config::load(cli::build(), vec![&matches]).await?;
    return Ok(());
}

#[tokio::test]
async fn it_fails_to_loads_config_from_file() -> Result<()> {
    let matches =
        cli::build().try_get_matches_from(vec!["hearth", "-c", "./test/bad-config.toml"])?;
    let res = Config::load(cli::build(), vec![&matches]).await;
    assert!(res.is_err());
    return Ok(());
}
