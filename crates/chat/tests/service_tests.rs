use std::sync::{Arc, Mutex};

use campus_chat::{ChatError, ChatNotifier, ChatService, MessageBroadcast, OutboundMessage};
use campus_config::DatabaseConfig;
use campus_database::{
    initialize_database, CreateUserRequest, MessageKind, MessagePatch, User, UserRepository,
    UserRole,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Captures notifications for assertions instead of broadcasting them
#[derive(Default)]
struct RecordingNotifier {
    broadcasts: Mutex<Vec<MessageBroadcast>>,
    seen: Mutex<Vec<String>>,
}

impl ChatNotifier for RecordingNotifier {
    fn message_created(&self, broadcast: &MessageBroadcast) {
        self.broadcasts.lock().unwrap().push(broadcast.clone());
    }

    fn messages_seen(&self, conversation_public_id: &str) {
        self.seen
            .lock()
            .unwrap()
            .push(conversation_public_id.to_string());
    }
}

struct Harness {
    service: ChatService,
    notifier: Arc<RecordingNotifier>,
    alice: User,
    bob: User,
    carol: User,
    _pool: SqlitePool,
    _temp_dir: TempDir,
}

async fn harness() -> Harness {
    let temp_dir = TempDir::new().expect("temp dir");
    let db_path = temp_dir.path().join("service_test.db");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", db_path.display()),
        max_connections: 5,
    };

    let pool = initialize_database(&config).await.expect("init database");
    let users = UserRepository::new(pool.clone());

    let alice = users
        .create(&CreateUserRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            role: UserRole::Student,
        })
        .await
        .expect("seed alice");
    let bob = users
        .create(&CreateUserRequest {
            name: "Bob".to_string(),
            email: "bob@example.com".to_string(),
            role: UserRole::Teacher,
        })
        .await
        .expect("seed bob");
    let carol = users
        .create(&CreateUserRequest {
            name: "Carol".to_string(),
            email: "carol@example.com".to_string(),
            role: UserRole::Admin,
        })
        .await
        .expect("seed carol");

    let notifier = Arc::new(RecordingNotifier::default());
    let service = ChatService::new(pool.clone(), notifier.clone());

    Harness {
        service,
        notifier,
        alice,
        bob,
        carol,
        _pool: pool,
        _temp_dir: temp_dir,
    }
}

fn text_message(conversation_id: &str, body: &str) -> OutboundMessage {
    OutboundMessage {
        conversation_id: Some(conversation_id.to_string()),
        kind: Some(MessageKind::Text),
        content: Some(body.to_string()),
        media_url: None,
    }
}

#[tokio::test]
async fn access_conversation_creates_then_reuses() {
    let h = harness().await;

    let first = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("first access");
    assert!(first.created);
    assert_eq!(first.conversation.participants.len(), 2);

    // Accessing from the other side resolves to the same conversation.
    let second = h
        .service
        .access_conversation(&h.bob, Some(&h.alice.public_id))
        .await
        .expect("second access");
    assert!(!second.created);
    assert_eq!(
        second.conversation.public_id,
        first.conversation.public_id
    );
}

#[tokio::test]
async fn access_conversation_validates_input() {
    let h = harness().await;

    let err = h
        .service
        .access_conversation(&h.alice, None)
        .await
        .expect_err("missing id");
    assert!(matches!(err, ChatError::BadRequest(_)));

    let err = h
        .service
        .access_conversation(&h.alice, Some("not a valid id!"))
        .await
        .expect_err("malformed id");
    assert!(matches!(err, ChatError::BadRequest(_)));

    let err = h
        .service
        .access_conversation(&h.alice, Some(&h.alice.public_id))
        .await
        .expect_err("self chat");
    assert!(matches!(err, ChatError::BadRequest(_)));

    let err = h
        .service
        .access_conversation(&h.alice, Some("tz4a98xxat96iws9zmbrgj3a"))
        .await
        .expect_err("unknown user");
    assert!(matches!(err, ChatError::NotFound(_)));
}

#[tokio::test]
async fn send_then_list_round_trips() {
    let h = harness().await;

    let access = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("access");
    let conversation_id = access.conversation.public_id.clone();

    let sent = h
        .service
        .send(&h.alice, text_message(&conversation_id, "hi"))
        .await
        .expect("send");
    assert!(!sent.is_read);
    assert_eq!(sent.kind, MessageKind::Text);
    assert_eq!(sent.sender.public_id, h.alice.public_id);

    let messages = h
        .service
        .list_messages(&h.bob, &conversation_id)
        .await
        .expect("list");
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content.as_deref(), Some("hi"));

    // The conversation now carries the latest-message pointer.
    let listed = h
        .service
        .list_conversations(&h.bob)
        .await
        .expect("list conversations");
    let latest = listed[0].latest_message.as_ref().expect("latest message");
    assert_eq!(latest.public_id, sent.public_id);
}

#[tokio::test]
async fn send_notifies_with_participants() {
    let h = harness().await;

    let access = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("access");

    h.service
        .send(
            &h.alice,
            text_message(&access.conversation.public_id, "hello bob"),
        )
        .await
        .expect("send");

    let broadcasts = h.notifier.broadcasts.lock().unwrap();
    assert_eq!(broadcasts.len(), 1);
    let broadcast = &broadcasts[0];
    assert_eq!(broadcast.message.content.as_deref(), Some("hello bob"));
    assert_eq!(broadcast.participants.len(), 2);
    let ids: Vec<_> = broadcast
        .participants
        .iter()
        .map(|p| p.public_id.as_str())
        .collect();
    assert!(ids.contains(&h.alice.public_id.as_str()));
    assert!(ids.contains(&h.bob.public_id.as_str()));
}

#[tokio::test]
async fn send_rejects_missing_fields_and_outsiders() {
    let h = harness().await;

    let access = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("access");
    let conversation_id = access.conversation.public_id.clone();

    let err = h
        .service
        .send(&h.alice, OutboundMessage::default())
        .await
        .expect_err("nothing supplied");
    assert!(matches!(err, ChatError::BadRequest(_)));

    let err = h
        .service
        .send(
            &h.alice,
            OutboundMessage {
                conversation_id: Some(conversation_id.clone()),
                ..Default::default()
            },
        )
        .await
        .expect_err("no content or media");
    assert!(matches!(err, ChatError::BadRequest(_)));

    // Carol is not a participant of the alice/bob conversation.
    let err = h
        .service
        .send(&h.carol, text_message(&conversation_id, "intruding"))
        .await
        .expect_err("outsider send");
    assert!(matches!(err, ChatError::Forbidden(_)));

    assert!(h.notifier.broadcasts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mark_read_counts_once_and_notifies_on_change() {
    let h = harness().await;

    let access = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("access");
    let conversation_id = access.conversation.public_id.clone();

    h.service
        .send(&h.alice, text_message(&conversation_id, "one"))
        .await
        .expect("send one");
    h.service
        .send(&h.alice, text_message(&conversation_id, "two"))
        .await
        .expect("send two");

    let first = h
        .service
        .mark_read(&h.bob, &conversation_id)
        .await
        .expect("first mark");
    assert_eq!(first, 2);

    let second = h
        .service
        .mark_read(&h.bob, &conversation_id)
        .await
        .expect("second mark");
    assert_eq!(second, 0);

    // Only the first call broadcast a read receipt.
    let seen = h.notifier.seen.lock().unwrap();
    assert_eq!(seen.as_slice(), [conversation_id]);
}

#[tokio::test]
async fn delete_is_restricted_to_sender_or_admin() {
    let h = harness().await;

    let access = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("access");
    let conversation_id = access.conversation.public_id.clone();

    let message = h
        .service
        .send(&h.alice, text_message(&conversation_id, "to delete"))
        .await
        .expect("send");

    // Bob is a participant but neither sender nor admin.
    let err = h
        .service
        .delete_message(&h.bob, &message.public_id)
        .await
        .expect_err("forbidden delete");
    assert!(matches!(err, ChatError::Forbidden(_)));

    // The message is still retrievable afterward.
    let messages = h
        .service
        .list_messages(&h.alice, &conversation_id)
        .await
        .expect("list");
    assert_eq!(messages.len(), 1);

    // Admin role may delete someone else's message.
    h.service
        .delete_message(&h.carol, &message.public_id)
        .await
        .expect("admin delete");

    let err = h
        .service
        .delete_message(&h.alice, &message.public_id)
        .await
        .expect_err("already gone");
    assert!(matches!(err, ChatError::NotFound(_)));
}

#[tokio::test]
async fn update_patches_content_and_keeps_the_rest() {
    let h = harness().await;

    let access = h
        .service
        .access_conversation(&h.alice, Some(&h.bob.public_id))
        .await
        .expect("access");
    let conversation_id = access.conversation.public_id.clone();

    let message = h
        .service
        .send(&h.alice, text_message(&conversation_id, "original"))
        .await
        .expect("send");

    let updated = h
        .service
        .update_message(
            &h.alice,
            &message.public_id,
            MessagePatch {
                content: Some("x".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.content.as_deref(), Some("x"));
    assert_eq!(updated.kind, MessageKind::Text);
    assert_eq!(updated.media_url, None);

    let messages = h
        .service
        .list_messages(&h.alice, &conversation_id)
        .await
        .expect("list");
    assert_eq!(messages[0].content.as_deref(), Some("x"));

    // A non-sender, non-admin caller cannot update.
    let err = h
        .service
        .update_message(
            &h.bob,
            &message.public_id,
            MessagePatch {
                content: Some("hijacked".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("forbidden update");
    assert!(matches!(err, ChatError::Forbidden(_)));
}
