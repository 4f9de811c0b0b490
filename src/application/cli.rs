use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use yansi::Paint;

use crate::application::repl::help_text;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::sort_by_recent;
use crate::domain::models::CommitPolicy;
use crate::domain::models::Conversation;
use crate::domain::models::ConversationStore;
use crate::domain::models::DetectorName;
use crate::domain::models::StoreName;
use crate::domain::models::WorkerName;
use crate::domain::services::DeviceProbe;
use crate::infrastructure::devices::DetectorManager;
use crate::infrastructure::stores::YamlStore;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

/// Directory holding saved conversations, from config or the cache default.
pub fn store_dir() -> path::PathBuf {
    let dir = Config::get(ConfigKey::StoreDir);
    if dir.is_empty() {
        return YamlStore::default_dir();
    }

    return path::PathBuf::from(dir);
}

pub fn log_path() -> path::PathBuf {
    return dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hearth/debug.log");
}

pub fn format_conversation(conversation: &Conversation) -> String {
    let mut res = format!(
        "- (ID: {}) {}, {}, Messages: {}",
        conversation.id,
        conversation.updated_at.format("%Y-%m-%d %H:%M:%S"),
        conversation.title,
        conversation.messages.len(),
    );

    if let Some(message) = conversation.messages.first() {
        let mut line = message.text.lines().next().unwrap_or_default().to_string();

        if line.chars().count() >= 70 {
            line = format!("{}...", line.chars().take(67).collect::<String>());
        }
        res = format!("{res}, {line}");
    }

    return res;
}

async fn print_conversations_list() -> Result<()> {
    let mut conversations = YamlStore::open(store_dir()).await?.conversations().await?;
    sort_by_recent(&mut conversations);

    let lines = conversations
        .iter()
        .map(|conversation| {
            return format_conversation(conversation);
        })
        .collect::<Vec<String>>();

    if lines.is_empty() {
        println!("There are no conversations available. You should start your first one!");
    } else {
        println!("{}", lines.join("\n"));
    }

    return Ok(());
}

async fn print_device() -> Result<()> {
    let detector_name = DetectorName::parse(Config::get(ConfigKey::Detector));
    let detector = match detector_name {
        Some(name) => DetectorManager::get(name)?,
        None => bail!(format!(
            "No detector implemented for {}",
            Config::get(ConfigKey::Detector)
        )),
    };

    let probe = DeviceProbe::default();
    probe.run(&detector).await;
    println!("{}", probe.capability().describe());

    return Ok(());
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for Hearth")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running Hearth with environment variable RUST_LOG=hearth")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_conversations_delete() -> Command {
    return Command::new("delete")
        .about("Delete one or all conversations.")
        .arg(
            clap::Arg::new(ConfigKey::ConversationID.to_string())
                .short('i')
                .long("id")
                .help("Conversation ID")
                .num_args(1),
        )
        .arg(
            clap::Arg::new("all")
                .long("all")
                .help("Delete all conversations.")
                .action(ArgAction::SetTrue),
        )
        .group(
            ArgGroup::new("delete-args")
                .args([ConfigKey::ConversationID.to_string(), "all".to_string()])
                .required(true),
        );
}

fn subcommand_conversations() -> Command {
    return Command::new("conversations")
        .about("Manage saved conversations.")
        .arg_required_else_help(true)
        .subcommand(Command::new("dir").about("Print the conversations directory path."))
        .subcommand(
            Command::new("list").about("List all saved conversations with their ids and titles."),
        )
        .subcommand(subcommand_conversations_delete());
}

fn arg_worker() -> Arg {
    return Arg::new(ConfigKey::Worker.to_string())
        .short('w')
        .long(ConfigKey::Worker.to_string())
        .env("HEARTH_WORKER")
        .num_args(1)
        .help(format!(
            "The worker that loads the model and generates replies. [default: {}]",
            Config::default(ConfigKey::Worker)
        ))
        .value_parser(PossibleValuesParser::new(WorkerName::VARIANTS));
}

fn arg_worker_health_check_timeout() -> Arg {
    return Arg::new(ConfigKey::WorkerHealthCheckTimeout.to_string())
        .long(ConfigKey::WorkerHealthCheckTimeout.to_string())
        .env("HEARTH_WORKER_HEALTH_CHECK_TIMEOUT")
        .num_args(1)
        .help(
            format!("Time to wait in milliseconds before timing out when doing a healthcheck for a worker. [default: {}]", Config::default(ConfigKey::WorkerHealthCheckTimeout)),
        );
}

fn arg_model() -> Arg {
    return Arg::new(ConfigKey::Model.to_string())
        .short('m')
        .long(ConfigKey::Model.to_string())
        .env("HEARTH_MODEL")
        .num_args(1)
        .help(format!(
            "The model the worker loads. [default: {}]",
            Config::default(ConfigKey::Model)
        ));
}

fn arg_conversation_id() -> Arg {
    return Arg::new(ConfigKey::ConversationID.to_string())
        .short('i')
        .long(ConfigKey::ConversationID.to_string())
        .env("HEARTH_CONVERSATION_ID")
        .num_args(1)
        .help("Resume a saved conversation by ID instead of the last one used.");
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Start chatting. This is the default command.")
        .arg(arg_worker())
        .arg(arg_worker_health_check_timeout())
        .arg(arg_model())
        .arg(arg_conversation_id());
}

fn subcommand_device() -> Command {
    return Command::new("device").about("Detect the device used to run the model and print it.");
}

pub fn build() -> Command {
    let commands_text = help_text()
        .split('\n')
        .map(|line| {
            if line.starts_with('-') {
                return format!("  {line}");
            }
            if line.starts_with("COMMANDS:") || line.starts_with("HOTKEYS:") {
                return Paint::new(format!("CHAT {line}"))
                    .underline()
                    .bold()
                    .to_string();
            }
            return line.to_string();
        })
        .collect::<Vec<String>>()
        .join("\n");

    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("hearth")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .after_help(commands_text)
        .arg_required_else_help(false)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_conversations())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_device())
        .arg(arg_worker())
        .arg(arg_worker_health_check_timeout())
        .arg(arg_model())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("HEARTH_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::OllamaURL.to_string())
                .long(ConfigKey::OllamaURL.to_string())
                .env("HEARTH_OLLAMA_URL")
                .num_args(1)
                .help(format!("Ollama API URL when using the Ollama worker. [default: {}]", Config::default(ConfigKey::OllamaURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::Detector.to_string())
                .short('d')
                .long(ConfigKey::Detector.to_string())
                .env("HEARTH_DETECTOR")
                .num_args(1)
                .help(format!("How to look for a device capable of running the model. [default: {}]", Config::default(ConfigKey::Detector)))
                .value_parser(PossibleValuesParser::new(DetectorName::VARIANTS))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::Store.to_string())
                .long(ConfigKey::Store.to_string())
                .env("HEARTH_STORE")
                .num_args(1)
                .help(format!("Where conversations are kept. The memory store forgets them on exit. [default: {}]", Config::default(ConfigKey::Store)))
                .value_parser(PossibleValuesParser::new(StoreName::VARIANTS))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::StoreDir.to_string())
                .long(ConfigKey::StoreDir.to_string())
                .env("HEARTH_STORE_DIR")
                .num_args(1)
                .help(format!("Directory where conversations are saved. [default: {}]", YamlStore::default_dir().to_string_lossy()))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::UserRole.to_string())
                .long(ConfigKey::UserRole.to_string())
                .env("HEARTH_USER_ROLE")
                .num_args(1)
                .help(format!("Role name stamped on your messages. [default: {}]", Config::default(ConfigKey::UserRole)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::AssistantRole.to_string())
                .long(ConfigKey::AssistantRole.to_string())
                .env("HEARTH_ASSISTANT_ROLE")
                .num_args(1)
                .help(format!("Role name stamped on the model's replies. [default: {}]", Config::default(ConfigKey::AssistantRole)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::MaxTokens.to_string())
                .long(ConfigKey::MaxTokens.to_string())
                .env("HEARTH_MAX_TOKENS")
                .num_args(1)
                .help(format!("Maximum number of tokens generated per reply. [default: {}]", Config::default(ConfigKey::MaxTokens)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::CommitPolicy.to_string())
                .long(ConfigKey::CommitPolicy.to_string())
                .env("HEARTH_COMMIT_POLICY")
                .num_args(1)
                .help(format!("When streamed replies are written to the conversation store. [default: {}]", Config::default(ConfigKey::CommitPolicy)))
                .value_parser(PossibleValuesParser::new(CommitPolicy::VARIANTS))
                .global(true),
        );
}

async fn load_config(matches: &ArgMatches, subcmd_matches: &ArgMatches) -> Result<()> {
    return Config::load(build(), vec![matches, subcmd_matches]).await;
}

pub async fn parse() -> Result<bool> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    println!("{}", log_path().to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }

            return Ok(false);
        }
        Some(("chat", subcmd_matches)) => {
            load_config(&matches, subcmd_matches).await?;
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
            return Ok(false);
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
                return Ok(false);
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
                return Ok(false);
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
                return Ok(false);
            }
            _ => {
                subcommand_config().print_long_help()?;
                return Ok(false);
            }
        },
        Some(("conversations", subcmd_matches)) => {
            load_config(&matches, subcmd_matches).await?;
            match subcmd_matches.subcommand() {
                Some(("dir", _)) => {
                    println!("{}", store_dir().to_string_lossy());
                }
                Some(("list", _)) => {
                    print_conversations_list().await?;
                }
                Some(("delete", delete_matches)) => {
                    let store = YamlStore::open(store_dir()).await?;
                    if let Some(id) =
                        delete_matches.get_one::<String>(&ConfigKey::ConversationID.to_string())
                    {
                        if store.conversation(id).await?.is_none() {
                            bail!(format!("No conversation found for id {id}"));
                        }
                        store.delete_conversation(id).await?;
                        println!("Deleted conversation {id}");
                    } else if delete_matches.get_flag("all") {
                        store.delete_all_conversations().await?;
                        println!("Deleted all conversations");
                    } else {
                        subcommand_conversations_delete().print_long_help()?;
                    }
                }
                _ => {
                    subcommand_conversations().print_long_help()?;
                }
            }
            return Ok(false);
        }
        Some(("device", subcmd_matches)) => {
            load_config(&matches, subcmd_matches).await?;
            print_device().await?;
            return Ok(false);
        }
        _ => {
            Config::load(build(), vec![&matches]).await?;
        }
    }

    return Ok(true);
}
