#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::ArgMatches;
use clap::Command;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use strum::EnumIter;
use strum::EnumVariantNames;
use strum::IntoEnumIterator;
use tokio::fs;

use crate::domain::models::CommitPolicy;
use crate::domain::models::DetectorName;
use crate::domain::models::StoreName;
use crate::domain::models::WorkerName;
use crate::domain::services::DEFAULT_ASSISTANT_ROLE_NAME;
use crate::domain::services::DEFAULT_USER_ROLE_NAME;

static CONFIG: Lazy<DashMap<String, String>> = Lazy::new(DashMap::new);

#[derive(Clone, Copy, Debug, Eq, PartialEq, EnumIter, EnumVariantNames, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConfigKey {
    AssistantRole,
    CommitPolicy,
    ConfigFile,
    ConversationID,
    Detector,
    MaxTokens,
    Model,
    OllamaURL,
    Store,
    StoreDir,
    UserRole,
    Worker,
    WorkerHealthCheckTimeout,
}

pub struct Config {}

impl Config {
    pub fn get(key: ConfigKey) -> String {
        if let Some(val) = CONFIG.get(&key.to_string()) {
            return val.to_string();
        }

        return "".to_string();
    }

    pub fn set(key: ConfigKey, value: &str) {
        CONFIG.insert(key.to_string(), value.to_string());
    }

    pub fn default(key: ConfigKey) -> String {
        let default_worker = WorkerName::Ollama.to_string();
        let default_detector = DetectorName::NvidiaSmi.to_string();
        let default_commit_policy = CommitPolicy::Streaming.to_string();
        let default_store = StoreName::Yaml.to_string();

        #[cfg(not(target_os = "macos"))]
        let config_path = dirs::cache_dir()
            .unwrap_or_else(env::temp_dir)
            .join("hearth/config.toml");
        #[cfg(target_os = "macos")]
        let config_path = dirs::home_dir()
            .unwrap_or_else(env::temp_dir)
            .join(".config/hearth/config.toml");

        let config_path_str = config_path.to_string_lossy().to_string();

        let res: &str = match key {
            ConfigKey::AssistantRole => DEFAULT_ASSISTANT_ROLE_NAME,
            ConfigKey::CommitPolicy => &default_commit_policy,
            ConfigKey::Detector => &default_detector,
            ConfigKey::MaxTokens => "512",
            ConfigKey::Model => "llama3",
            ConfigKey::OllamaURL => "http://localhost:11434",
            ConfigKey::Store => &default_store,
            ConfigKey::StoreDir => "",
            ConfigKey::UserRole => DEFAULT_USER_ROLE_NAME,
            ConfigKey::Worker => &default_worker,
            ConfigKey::WorkerHealthCheckTimeout => "1000",

            // Special
            ConfigKey::ConfigFile => &config_path_str,
            ConfigKey::ConversationID => "",
        };

        return res.to_string();
    }

    pub fn get_u32(key: ConfigKey) -> Result<u32> {
        return Config::parse_u32(key, &Config::get(key));
    }

    /// Parses a numeric value, naming the key when it is not a number.
    fn parse_u32(key: ConfigKey, val: &str) -> Result<u32> {
        if let Ok(res) = val.parse::<u32>() {
            return Ok(res);
        }

        bail!(format!("Config key '{key}' must be a positive number, got '{val}'"));
    }

    pub async fn load(cmd: Command, clap_arg_matches: Vec<&ArgMatches>) -> Result<()> {
        for key in ConfigKey::iter() {
            Config::set(key, &Config::default(key))
        }

        let mut config_file = Config::default(ConfigKey::ConfigFile);
        for matches in clap_arg_matches.as_slice() {
            if let Ok(Some(arg_config_file)) =
                matches.try_get_one::<String>(&ConfigKey::ConfigFile.to_string())
            {
                config_file = arg_config_file.to_string();
            }
        }

        let config_path = path::PathBuf::from(config_file);
        if config_path.exists() {
            let toml_str = fs::read_to_string(config_path).await?;
            let doc = toml_str.parse::<toml_edit::Document>()?;

            for key in ConfigKey::iter() {
                if let Some(val) = doc.get(&key.to_string()) {
                    // Use clap value parsers to do validation.
                    let mut possible_values = vec![];
                    if let Some(arg) = cmd
                        .get_arguments()
                        .find(|e| return e.get_long() == Some(key.to_string().as_str()))
                    {
                        possible_values = arg
                            .get_possible_values()
                            .iter()
                            .map(|e| return e.get_name().to_string())
                            .collect::<Vec<String>>();
                    }

                    if let Some(val_int) = val.as_integer() {
                        Config::set(key, &val_int.to_string());
                    } else if let Some(val_str) = val.as_str() {
                        if val_str.is_empty() {
                            continue;
                        }
                        if !possible_values.is_empty()
                            && !possible_values.contains(&val_str.to_string())
                        {
                            bail!(format!("config.toml has an invalid value for key '{key}': {val_str}\nPossible values are: {}", possible_values.join(", ")));
                        }
                        Config::set(key, val_str);
                    } else {
                        bail!(format!(
                            "config.toml has an invalid value for key '{key}': expected a string or a number"
                        ));
                    }
                }
            }
        }

        for key in ConfigKey::iter() {
            for matches in clap_arg_matches.as_slice() {
                if let Ok(Some(val)) = matches.try_get_one::<String>(&key.to_string()) {
                    if val.is_empty() {
                        continue;
                    }
                    Config::set(key, val)
                }
            }
        }

        tracing::debug!(
            worker = %Config::get(ConfigKey::Worker),
            model = %Config::get(ConfigKey::Model),
            detector = %Config::get(ConfigKey::Detector),
            store = %Config::get(ConfigKey::Store),
            store_dir = %Config::get(ConfigKey::StoreDir),
            commit_policy = %Config::get(ConfigKey::CommitPolicy),
            max_tokens = %Config::get(ConfigKey::MaxTokens),
            "config"
        );

        return Ok(());
    }

    pub fn serialize_default(cmd: Command) -> String {
        let toml_str = ConfigKey::iter()
            .filter_map(|key| {
                if key == ConfigKey::ConversationID || key == ConfigKey::ConfigFile {
                    return None;
                }

                let arg = cmd
                    .get_arguments()
                    .find(|e| return e.get_long() == Some(key.to_string().as_str()))?;

                let mut description = arg
                    .get_help()
                    .map(|e| return e.to_string())
                    .unwrap_or_default();

                description = description
                    .split("[default:")
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_string();

                if !arg.get_possible_values().is_empty() {
                    let possible_values = arg
                        .get_possible_values()
                        .iter()
                        .map(|e| return e.get_name().to_string())
                        .collect::<Vec<String>>()
                        .join(", ");
                    description = format!("{description} [possible values: {}]", possible_values);
                }

                let mut val = Config::default(key);
                if val.is_empty() {
                    val = format!("# {key} = \"\"");
                } else if val.parse::<i32>().is_ok() {
                    val = format!("{key} = {val}");
                } else {
                    val = format!("{key} = \"{val}\"");
                }

                return Some(format!("# {description}\n{val}"));
            })
            .collect::<Vec<String>>()
            .join("\n\n");

        return toml_str;
    }
}
