use chrono::Duration;
use chrono::Utc;

use super::create_id;
use super::sort_by_recent;
use super::Conversation;
use super::Message;

fn conversation_updated(title: &str, minutes_ago: i64) -> Conversation {
    let mut conversation = Conversation::new(title, "");
    conversation.updated_at = Utc::now() - Duration::minutes(minutes_ago);
    return conversation;
}

#[test]
fn it_creates_short_ids() {
    let id = create_id();
    assert_eq!(id.split('-').count(), 2);
    assert_eq!(id.len(), 13);
}

#[test]
fn it_creates_unique_message_ids() {
    let first = Message::new("user", "hello");
    let second = Message::new("user", "hello");
    assert_ne!(first.id, second.id);
    assert_eq!(first.created_at, first.updated_at);
}

#[test]
fn it_appends_new_messages() {
    let mut conversation = Conversation::new("Test", "Be nice.");
    conversation.upsert_message(Message::new("user", "hello"));
    conversation.upsert_message(Message::new("assistant", "hi"));

    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].text, "hello");
    assert_eq!(conversation.messages[1].text, "hi");
}

#[test]
fn it_replaces_messages_with_the_same_id() {
    let mut conversation = Conversation::new("Test", "");
    let partial = Message::with_id("abc", "assistant", "hi");
    let created_at = partial.created_at;
    conversation.upsert_message(partial);
    conversation.upsert_message(Message::with_id("abc", "assistant", "hi there"));

    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(conversation.messages[0].text, "hi there");
    assert_eq!(conversation.messages[0].created_at, created_at);
    assert!(conversation.messages[0].updated_at >= created_at);
}

#[test]
fn it_bumps_updated_at_on_upsert() {
    let mut conversation = conversation_updated("Test", 10);
    let before = conversation.updated_at;
    conversation.upsert_message(Message::new("user", "hello"));

    assert!(conversation.updated_at > before);
}

#[test]
fn it_clears_messages() {
    let mut conversation = Conversation::new("Test", "");
    conversation.upsert_message(Message::new("user", "hello"));
    conversation.clear_messages();

    assert!(conversation.messages.is_empty());
}

#[test]
fn it_sorts_by_most_recently_updated() {
    let mut conversations = vec![
        conversation_updated("middle", 5),
        conversation_updated("oldest", 10),
        conversation_updated("newest", 1),
    ];
    sort_by_recent(&mut conversations);

    let titles = conversations
        .iter()
        .map(|e| return e.title.to_string())
        .collect::<Vec<String>>();
    assert_eq!(titles, vec!["newest", "middle", "oldest"]);
}

#[test]
fn it_keeps_input_order_for_ties() {
    let now = Utc::now();
    let mut first = Conversation::new("first", "");
    let mut second = Conversation::new("second", "");
    first.updated_at = now;
    second.updated_at = now;

    let mut conversations = vec![first, second];
    sort_by_recent(&mut conversations);

    assert_eq!(conversations[0].title, "first");
    assert_eq!(conversations[1].title, "second");
}
