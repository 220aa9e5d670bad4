//! Send/fetch flow against in-memory storage: persistence, live fan-out,
//! thread ordering and the mark-seen-on-fetch contract.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use chat_service::error::AppError;
use chat_service::models::{Message, MessageKind};
use chat_service::repository::MessageRepository;
use chat_service::services::{MessageService, NewMessage};
use chat_service::sse::{ConnectionRegistry, StreamEvent, STREAM_BUFFER};

use common::{InMemoryMessageRepository, InMemoryUserRepository};

struct Harness {
    messages: Arc<InMemoryMessageRepository>,
    users: Arc<InMemoryUserRepository>,
    registry: ConnectionRegistry,
    service: MessageService,
}

fn harness() -> Harness {
    let messages = Arc::new(InMemoryMessageRepository::new());
    let users = Arc::new(InMemoryUserRepository::new());
    let registry = ConnectionRegistry::new();
    let service = MessageService::new(messages.clone(), users.clone(), registry.clone());
    Harness {
        messages,
        users,
        registry,
        service,
    }
}

fn text(content: &str) -> NewMessage {
    NewMessage {
        text: Some(content.to_string()),
        media_url: None,
    }
}

#[tokio::test]
async fn send_persists_exactly_one_message() {
    let h = harness();
    let sender = common::user("ana");
    h.users.insert(sender.clone());
    let recipient_id = Uuid::new_v4();

    let message = h
        .service
        .send(sender.id, recipient_id, text("hello"))
        .await
        .unwrap();

    let stored = h.messages.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0], message);
    assert_eq!(stored[0].message_type, MessageKind::Text);
    assert!(!stored[0].seen);
}

#[tokio::test]
async fn send_with_no_content_fails_and_persists_nothing() {
    let h = harness();
    let result = h
        .service
        .send(Uuid::new_v4(), Uuid::new_v4(), NewMessage::default())
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(h.messages.all().is_empty());
}

#[tokio::test]
async fn live_recipient_observes_one_denormalized_frame() {
    let h = harness();
    let sender = common::user("ana");
    h.users.insert(sender.clone());
    let recipient_id = Uuid::new_v4();

    let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
    h.registry.register(recipient_id, tx).await;
    assert!(matches!(
        rx.recv().await,
        Some(StreamEvent::Connected { .. })
    ));

    let message = h
        .service
        .send(sender.id, recipient_id, text("you there?"))
        .await
        .unwrap();

    match rx.recv().await {
        Some(StreamEvent::Message {
            message: delivered,
            from_user,
        }) => {
            assert_eq!(delivered, message);
            assert_eq!(from_user, sender);
        }
        other => panic!("expected message frame, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn offline_recipient_still_gets_message_persisted() {
    let h = harness();
    let sender = common::user("ana");
    h.users.insert(sender.clone());
    let recipient_id = Uuid::new_v4();

    // someone else is connected; their stream must stay untouched
    let bystander_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
    h.registry.register(bystander_id, tx).await;
    rx.recv().await;

    h.service
        .send(sender.id, recipient_id, text("see you offline"))
        .await
        .unwrap();

    assert_eq!(h.messages.all().len(), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn storage_failure_aborts_send_with_no_delivery() {
    let h = harness();
    let sender = common::user("ana");
    h.users.insert(sender.clone());
    let recipient_id = Uuid::new_v4();

    let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
    h.registry.register(recipient_id, tx).await;
    rx.recv().await;

    h.messages.set_fail_creates(true);
    let result = h.service.send(sender.id, recipient_id, text("lost")).await;

    assert!(matches!(result, Err(AppError::Storage(_))));
    assert!(h.messages.all().is_empty());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn thread_returns_both_directions_newest_first() {
    let h = harness();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let now = Utc::now();

    let mk = |from: Uuid, to: Uuid, text: &str, minutes_ago: i64| Message {
        id: Uuid::new_v4(),
        from_user_id: from,
        to_user_id: to,
        text: Some(text.to_string()),
        media_url: None,
        message_type: MessageKind::Text,
        seen: false,
        created_at: now - Duration::minutes(minutes_ago),
    };

    let oldest = mk(a, b, "first", 30);
    let middle = mk(b, a, "second", 20);
    let newest = mk(a, b, "third", 10);
    let unrelated = mk(a, Uuid::new_v4(), "elsewhere", 5);
    for m in [&oldest, &middle, &newest, &unrelated] {
        h.messages.create(m).await.unwrap();
    }

    let thread = h.service.thread(a, b).await.unwrap();

    let ids: Vec<Uuid> = thread.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
}

#[tokio::test]
async fn fetching_thread_marks_counterparty_messages_seen() {
    let h = harness();
    let sender = common::user("ana");
    let reader = common::user("bo");
    h.users.insert(sender.clone());
    h.users.insert(reader.clone());

    for i in 0..3 {
        h.service
            .send(sender.id, reader.id, text(&format!("msg {i}")))
            .await
            .unwrap();
    }
    // one message in the other direction stays untouched by the fetch
    h.service
        .send(reader.id, sender.id, text("reply"))
        .await
        .unwrap();

    h.service.thread(reader.id, sender.id).await.unwrap();

    let stored = h.messages.all();
    for m in &stored {
        if m.from_user_id == sender.id {
            assert!(m.seen, "message from counterparty should be seen");
        } else {
            assert!(!m.seen, "reader's own messages must stay unseen");
        }
    }
}

#[tokio::test]
async fn recent_lists_only_messages_addressed_to_the_user() {
    let h = harness();
    let sender = common::user("ana");
    h.users.insert(sender.clone());
    let me = Uuid::new_v4();

    h.service.send(sender.id, me, text("for you")).await.unwrap();
    h.service
        .send(sender.id, Uuid::new_v4(), text("for someone else"))
        .await
        .unwrap();

    let recent = h.service.recent(me).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].to_user_id, me);
}
