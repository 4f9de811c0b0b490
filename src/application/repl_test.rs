use std::sync::Arc;

use anyhow::Result;

use super::device_warning;
use super::help_text;
use super::next_delta;
use super::Repl;
use crate::domain::models::AdapterInfo;
use crate::domain::models::CommitPolicy;
use crate::domain::models::DeviceCapability;
use crate::domain::models::DeviceInfo;
use crate::domain::models::SessionError;
use crate::domain::models::SlashCommand;
use crate::domain::services::SessionController;
use crate::infrastructure::devices::none::NoDevice;
use crate::infrastructure::stores::MemoryStore;
use crate::infrastructure::workers::echo::Echo;

fn repl() -> Repl {
    let controller = SessionController::new(
        Box::<Echo>::default(),
        Box::<NoDevice>::default(),
        CommitPolicy::Streaming,
    );
    controller.attach_store(Arc::new(MemoryStore::default()));

    return Repl::new(controller, 32);
}

async fn run(repl: &Repl, text: &str) -> Result<bool> {
    return repl.run_command(SlashCommand::parse(text).unwrap()).await;
}

#[test]
fn it_prints_only_the_new_suffix() {
    assert_eq!(next_delta("", "hi"), "hi");
    assert_eq!(next_delta("hi", "hi there"), " there");
    assert_eq!(next_delta("hi there", "hi there"), "");
}

#[test]
fn it_starts_over_when_text_diverges() {
    assert_eq!(next_delta("hi there", "hello"), "\nhello");
}

#[test]
fn it_lists_every_command_in_help() {
    let text = help_text();
    for cmd in [
        "/new", "/list", "/open", "/title", "/clear", "/delete", "/deleteall", "/user",
        "/assistant", "/device", "/recheck", "/quit", "/help",
    ] {
        assert!(text.contains(cmd), "help is missing {cmd}");
    }
}

#[tokio::test]
async fn it_stops_on_quit() -> Result<()> {
    let repl = repl();
    assert!(!run(&repl, "/quit").await?);
    assert!(run(&repl, "/help").await?);
    return Ok(());
}

#[tokio::test]
async fn it_manages_conversations_with_commands() -> Result<()> {
    let repl = repl();

    run(&repl, "/new Trip planning").await?;
    let current = repl.controller.current_conversation().await?.unwrap();
    assert_eq!(current.title, "Trip planning");

    run(&repl, "/title Road trip").await?;
    run(&repl, "/list").await?;
    let current = repl.controller.current_conversation().await?.unwrap();
    assert_eq!(current.title, "Road trip");

    run(&repl, "/new").await?;
    run(&repl, &format!("/open {}", current.id)).await?;
    assert_eq!(
        repl.controller.current_conversation().await?.unwrap().id,
        current.id
    );

    run(&repl, "/delete").await?;
    assert!(repl.controller.current_conversation().await?.is_none());
    assert_eq!(repl.controller.all_conversations().await?.len(), 1);

    run(&repl, "/deleteall").await?;
    assert!(repl.controller.all_conversations().await?.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_reports_missing_conversations() -> Result<()> {
    let repl = repl();

    let err = run(&repl, "/clear").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::NoActiveConversation)
    ));

    let err = run(&repl, "/open missing").await.unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"No conversation found for id missing");

    return Ok(());
}

#[tokio::test]
async fn it_sets_role_names() -> Result<()> {
    let repl = repl();

    run(&repl, "/user me").await?;
    run(&repl, "/assistant bot").await?;

    assert_eq!(repl.controller.user_role_name(), "me");
    assert_eq!(repl.controller.assistant_role_name(), "bot");

    return Ok(());
}

#[test]
fn it_warns_only_when_the_device_is_unusable() {
    assert!(device_warning(&DeviceCapability::unchecked()).is_none());
    assert!(device_warning(&DeviceCapability::supported(DeviceInfo {
        adapter: "nvidia".to_string(),
        device: "Test GPU".to_string(),
        adapter_info: AdapterInfo::default(),
    }))
    .is_none());

    let warning = device_warning(&DeviceCapability::probe_failed("driver crashed")).unwrap();
    insta::assert_snapshot!(warning, @"Warning: driver crashed Replies may be very slow.");
}
