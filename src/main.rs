#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::process;

use anyhow::bail;
use anyhow::Error;
use anyhow::Result;
use yansi::Paint;

use crate::application::cli;
use crate::application::repl::Repl;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::CommitPolicy;
use crate::domain::models::DetectorName;
use crate::domain::models::StoreName;
use crate::domain::models::WorkerName;
use crate::domain::services::SessionController;
use crate::infrastructure::devices::DetectorManager;
use crate::infrastructure::stores::StoreManager;
use crate::infrastructure::workers::WorkerManager;

fn handle_error(err: Error) {
    eprintln!(
        "{}",
        Paint::red(format!(
            "Oh no! Hearth has failed with the following app version and error.\n\nVersion: {}\nError: {}",
            env!("CARGO_PKG_VERSION"),
            err
        ))
    );

    let backtrace = err.backtrace();
    if backtrace.to_string() == "disabled backtrace" {
        let args = env::args().collect::<Vec<String>>().join(" ");
        eprintln!("\nRunning the following can help explain further what the issue is:");
        eprintln!("\nRUST_BACKTRACE=1 {args}");
    } else {
        eprintln!("\n{}", backtrace);
    }

    process::exit(1);
}

async fn start_chat() -> Result<()> {
    let worker_name = match WorkerName::parse(Config::get(ConfigKey::Worker)) {
        Some(name) => name,
        None => bail!(format!(
            "No worker implemented for {}",
            Config::get(ConfigKey::Worker)
        )),
    };
    let detector_name = match DetectorName::parse(Config::get(ConfigKey::Detector)) {
        Some(name) => name,
        None => bail!(format!(
            "No detector implemented for {}",
            Config::get(ConfigKey::Detector)
        )),
    };
    let commit_policy = match CommitPolicy::parse(Config::get(ConfigKey::CommitPolicy)) {
        Some(policy) => policy,
        None => bail!(format!(
            "Unknown commit policy {}",
            Config::get(ConfigKey::CommitPolicy)
        )),
    };
    let store_name = match StoreName::parse(Config::get(ConfigKey::Store)) {
        Some(name) => name,
        None => bail!(format!(
            "No store implemented for {}",
            Config::get(ConfigKey::Store)
        )),
    };
    let max_tokens = Config::get_u32(ConfigKey::MaxTokens)?;

    let controller = SessionController::new(
        WorkerManager::get(worker_name)?,
        DetectorManager::get(detector_name)?,
        commit_policy,
    );
    controller.set_user_role_name(&Config::get(ConfigKey::UserRole));
    controller.set_assistant_role_name(&Config::get(ConfigKey::AssistantRole));

    controller.attach_store(StoreManager::get(store_name, cli::store_dir()).await?);

    return Repl::new(controller, max_tokens)
        .start(&Config::get(ConfigKey::ConversationID))
        .await;
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));

    let debug_log_dir = env::var("HEARTH_LOG_DIR").unwrap_or_else(|_| {
        return cli::log_path()
            .parent()
            .map(|e| return e.to_string_lossy().to_string())
            .unwrap_or_default();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("hearth")
    {
        tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .init();
    }

    match cli::parse().await {
        Ok(true) => {}
        Ok(false) => process::exit(0),
        Err(err) => {
            handle_error(err);
            return;
        }
    }

    if let Err(err) = start_chat().await {
        handle_error(err);
    }

    process::exit(0);
}
