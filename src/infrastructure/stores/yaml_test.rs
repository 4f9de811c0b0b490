use anyhow::Result;

use super::YamlStore;
use crate::domain::models::Conversation;
use crate::domain::models::ConversationStore;
use crate::domain::models::Message;

#[tokio::test]
async fn it_opens_a_missing_directory_as_empty() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = YamlStore::open(tmp.path().join("missing")).await?;

    assert!(store.conversations().await?.is_empty());
    assert!(store.current_conversation_id().await?.is_none());

    return Ok(());
}

#[tokio::test]
async fn it_persists_conversations_across_opens() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().join("conversations");
    let conversation = Conversation::new("Test", "Be nice.");

    {
        let store = YamlStore::open(dir.clone()).await?;
        store.create_conversation(conversation.clone()).await?;
        store
            .add_message(&conversation.id, Message::new("user", "hello"))
            .await?;
        store
            .add_message(&conversation.id, Message::with_id("a", "assistant", "hi"))
            .await?;
        store
            .add_message(&conversation.id, Message::with_id("a", "assistant", "hi there"))
            .await?;
        store
            .set_current_conversation_id(Some(conversation.id.to_string()))
            .await?;
    }

    let store = YamlStore::open(dir).await?;
    let res = store.conversation(&conversation.id).await?.unwrap();
    assert_eq!(res.title, "Test");
    assert_eq!(res.system_prompt, "Be nice.");
    assert_eq!(res.messages.len(), 2);
    assert_eq!(res.messages[1].text, "hi there");
    assert_eq!(
        store.current_conversation_id().await?,
        Some(conversation.id.to_string())
    );

    return Ok(());
}

#[tokio::test]
async fn it_removes_files_on_delete() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().to_path_buf();
    let store = YamlStore::open(dir.clone()).await?;
    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;
    store
        .set_current_conversation_id(Some(conversation.id.to_string()))
        .await?;

    let file_path = dir.join(format!("{}.yaml", conversation.id));
    assert!(file_path.exists());

    store.delete_conversation(&conversation.id).await?;
    assert!(!file_path.exists());

    let reopened = YamlStore::open(dir).await?;
    assert!(reopened.conversations().await?.is_empty());
    assert!(reopened.current_conversation_id().await?.is_none());

    return Ok(());
}

#[tokio::test]
async fn it_deletes_all_conversations() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().to_path_buf();
    let store = YamlStore::open(dir.clone()).await?;
    store
        .create_conversation(Conversation::new("First", ""))
        .await?;
    store
        .create_conversation(Conversation::new("Second", ""))
        .await?;

    store.delete_all_conversations().await?;

    let reopened = YamlStore::open(dir).await?;
    assert!(reopened.conversations().await?.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_persists_cleared_messages_and_titles() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let dir = tmp.path().to_path_buf();
    let conversation = Conversation::new("Test", "");

    {
        let store = YamlStore::open(dir.clone()).await?;
        store.create_conversation(conversation.clone()).await?;
        store
            .add_message(&conversation.id, Message::new("user", "hello"))
            .await?;
        store.delete_messages(&conversation.id).await?;
        store
            .set_conversation_title(&conversation.id, "Renamed")
            .await?;
    }

    let store = YamlStore::open(dir).await?;
    let res = store.conversation(&conversation.id).await?.unwrap();
    assert!(res.messages.is_empty());
    assert_eq!(res.title, "Renamed");

    return Ok(());
}
