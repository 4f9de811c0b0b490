use anyhow::Result;

use super::MemoryStore;
use crate::domain::models::Conversation;
use crate::domain::models::ConversationStore;
use crate::domain::models::Message;

#[tokio::test]
async fn it_creates_and_reads_conversations() -> Result<()> {
    let store = MemoryStore::default();
    let conversation = Conversation::new("Test", "Be nice.");
    store.create_conversation(conversation.clone()).await?;

    let res = store.conversation(&conversation.id).await?;
    assert_eq!(res, Some(conversation));
    assert_eq!(store.conversations().await?.len(), 1);

    return Ok(());
}

#[tokio::test]
async fn it_rejects_duplicate_conversations() -> Result<()> {
    let store = MemoryStore::default();
    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;

    assert!(store.create_conversation(conversation).await.is_err());

    return Ok(());
}

#[tokio::test]
async fn it_upserts_messages_by_id() -> Result<()> {
    let store = MemoryStore::default();
    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;

    store
        .add_message(&conversation.id, Message::with_id("a", "assistant", "hi"))
        .await?;
    store
        .add_message(&conversation.id, Message::with_id("a", "assistant", "hi there"))
        .await?;

    let res = store.conversation(&conversation.id).await?.unwrap();
    assert_eq!(res.messages.len(), 1);
    assert_eq!(res.messages[0].text, "hi there");

    return Ok(());
}

#[tokio::test]
async fn it_fails_adding_messages_to_missing_conversations() {
    let store = MemoryStore::default();
    let err = store
        .add_message("missing", Message::new("user", "hello"))
        .await
        .unwrap_err();

    insta::assert_snapshot!(err.to_string(), @"No conversation found for id missing");
}

#[tokio::test]
async fn it_sets_titles() -> Result<()> {
    let store = MemoryStore::default();
    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;
    store
        .set_conversation_title(&conversation.id, "Renamed")
        .await?;

    let res = store.conversation(&conversation.id).await?.unwrap();
    assert_eq!(res.title, "Renamed");

    return Ok(());
}

#[tokio::test]
async fn it_deletes_messages() -> Result<()> {
    let store = MemoryStore::default();
    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;
    store
        .add_message(&conversation.id, Message::new("user", "hello"))
        .await?;
    store.delete_messages(&conversation.id).await?;

    let res = store.conversation(&conversation.id).await?.unwrap();
    assert!(res.messages.is_empty());

    return Ok(());
}

#[tokio::test]
async fn it_tracks_the_current_conversation() -> Result<()> {
    let store = MemoryStore::default();
    assert!(store.current_conversation_id().await?.is_none());

    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;
    store
        .set_current_conversation_id(Some(conversation.id.to_string()))
        .await?;
    assert_eq!(
        store.current_conversation_id().await?,
        Some(conversation.id.to_string())
    );

    assert!(store
        .set_current_conversation_id(Some("missing".to_string()))
        .await
        .is_err());

    return Ok(());
}

#[tokio::test]
async fn it_clears_the_current_pointer_on_delete() -> Result<()> {
    let store = MemoryStore::default();
    let first = Conversation::new("First", "");
    let second = Conversation::new("Second", "");
    store.create_conversation(first.clone()).await?;
    store.create_conversation(second.clone()).await?;
    store
        .set_current_conversation_id(Some(first.id.to_string()))
        .await?;

    store.delete_conversation(&second.id).await?;
    assert_eq!(
        store.current_conversation_id().await?,
        Some(first.id.to_string())
    );

    store.delete_conversation(&first.id).await?;
    assert!(store.current_conversation_id().await?.is_none());

    return Ok(());
}

#[tokio::test]
async fn it_deletes_all_conversations() -> Result<()> {
    let store = MemoryStore::default();
    let conversation = Conversation::new("Test", "");
    store.create_conversation(conversation.clone()).await?;
    store
        .set_current_conversation_id(Some(conversation.id.to_string()))
        .await?;

    store.delete_all_conversations().await?;
    assert!(store.conversations().await?.is_empty());
    assert!(store.current_conversation_id().await?.is_none());

    return Ok(());
}

#[test]
fn it_drops_unknown_current_ids_when_seeded() {
    let conversation = Conversation::new("Test", "");
    let store = MemoryStore::from_conversations(vec![conversation], Some("gone".to_string()));

    assert!(store.current_id.blocking_read().is_none());
}
