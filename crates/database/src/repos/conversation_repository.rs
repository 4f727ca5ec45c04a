//! Repository for the conversation directory.
//!
//! Direct conversations are unique per unordered participant pair. Uniqueness
//! is enforced by the `direct_key` column constraint, so concurrent
//! find-or-create calls for the same pair converge on a single row instead of
//! racing between the lookup and the insert.

use crate::entities::{
    direct_key, Conversation, ConversationWithDetails, MessageWithSender, UserSummary,
};
use crate::repos::message_repository::{map_message_row, MESSAGE_SELECT};
use crate::types::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for conversation database operations
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find a conversation by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, is_group, admin_id, latest_message_id, created_at, updated_at
             FROM conversations WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        row.map(map_conversation_row).transpose()
    }

    /// Find the direct conversation between two users, if one exists
    pub async fn find_direct(&self, user_a: i64, user_b: i64) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, public_id, name, is_group, admin_id, latest_message_id, created_at, updated_at
             FROM conversations WHERE direct_key = ? AND is_group = 0",
        )
        .bind(direct_key(user_a, user_b))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        row.map(map_conversation_row).transpose()
    }

    /// Return the direct conversation for a pair, creating it when absent.
    ///
    /// The returned flag is `true` when this call created the conversation.
    /// Safe under concurrent calls for the same pair: the insert uses
    /// `ON CONFLICT(direct_key) DO NOTHING` and the loser of the race re-reads
    /// the winner's row.
    pub async fn find_or_create_direct(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> StoreResult<(ConversationWithDetails, bool)> {
        if let Some(existing) = self.find_direct(user_a, user_b).await? {
            return Ok((self.with_details(existing).await?, false));
        }

        let key = direct_key(user_a, user_b);
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO conversations (public_id, name, is_group, direct_key, created_at, updated_at)
             VALUES (?, NULL, 0, ?, ?, ?)
             ON CONFLICT(direct_key) DO NOTHING",
        )
        .bind(&public_id)
        .bind(&key)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

            let existing = self
                .find_direct(user_a, user_b)
                .await?
                .ok_or_else(|| StoreError::Duplicate(format!("direct pair {key} vanished mid-race")))?;
            return Ok((self.with_details(existing).await?, false));
        }

        let conversation_id = result.last_insert_rowid();

        let mut members = vec![user_a, user_b];
        members.dedup();
        for user_id in members {
            sqlx::query(
                "INSERT INTO conversation_members (conversation_id, user_id, joined_at)
                 VALUES (?, ?, ?)",
            )
            .bind(conversation_id)
            .bind(user_id)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        info!(
            conversation_id = conversation_id,
            public_id = %public_id,
            direct_key = %key,
            "created direct conversation"
        );

        let conversation = Conversation {
            id: conversation_id,
            public_id,
            name: None,
            is_group: false,
            admin_id: None,
            latest_message_id: None,
            created_at: now.clone(),
            updated_at: now,
        };

        Ok((self.with_details(conversation).await?, true))
    }

    /// List all conversations containing a user, most recently updated first
    pub async fn list_for_participant(
        &self,
        user_id: i64,
    ) -> StoreResult<Vec<ConversationWithDetails>> {
        let rows = sqlx::query(
            "SELECT c.id, c.public_id, c.name, c.is_group, c.admin_id, c.latest_message_id,
                    c.created_at, c.updated_at
             FROM conversations c
             JOIN conversation_members cm ON cm.conversation_id = c.id
             WHERE cm.user_id = ?
             ORDER BY c.updated_at DESC, c.id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in rows {
            let conversation = map_conversation_row(row)?;
            conversations.push(self.with_details(conversation).await?);
        }

        Ok(conversations)
    }

    /// Update the cached latest-message pointer after a successful send
    pub async fn set_latest_message(
        &self,
        conversation_id: i64,
        message_id: i64,
    ) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE conversations SET latest_message_id = ?, updated_at = ? WHERE id = ?",
        )
        .bind(message_id)
        .bind(&now)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ConversationNotFound);
        }

        Ok(())
    }

    /// Whether a user belongs to a conversation
    pub async fn is_participant(&self, conversation_id: i64, user_id: i64) -> StoreResult<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM conversation_members WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(row > 0)
    }

    /// Database IDs of all participants of a conversation
    pub async fn participant_ids(&self, conversation_id: i64) -> StoreResult<Vec<i64>> {
        sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM conversation_members WHERE conversation_id = ? ORDER BY user_id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }

    /// Display attributes of all participants of a conversation
    pub async fn participants(&self, conversation_id: i64) -> StoreResult<Vec<UserSummary>> {
        let rows = sqlx::query(
            "SELECT u.public_id, u.name, u.email, u.role
             FROM users u
             JOIN conversation_members cm ON cm.user_id = u.id
             WHERE cm.conversation_id = ?
             ORDER BY cm.joined_at, u.id",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let role: String = row
                    .try_get("role")
                    .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
                Ok(UserSummary {
                    public_id: row
                        .try_get("public_id")
                        .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
                    name: row
                        .try_get("name")
                        .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
                    email: row
                        .try_get("email")
                        .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
                    role: role.as_str().into(),
                })
            })
            .collect()
    }

    /// Resolve participants and the latest message for display
    pub async fn with_details(
        &self,
        conversation: Conversation,
    ) -> StoreResult<ConversationWithDetails> {
        let participants = self.participants(conversation.id).await?;

        let latest_message = match conversation.latest_message_id {
            Some(message_id) => self.find_message(message_id).await?,
            None => None,
        };

        Ok(ConversationWithDetails {
            public_id: conversation.public_id,
            name: conversation.name,
            is_group: conversation.is_group,
            participants,
            latest_message,
            created_at: conversation.created_at,
            updated_at: conversation.updated_at,
        })
    }

    async fn find_message(&self, message_id: i64) -> StoreResult<Option<MessageWithSender>> {
        let query = format!("{MESSAGE_SELECT} WHERE m.id = ?");
        let row = sqlx::query(&query)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        row.map(map_message_row).transpose()
    }
}

fn map_conversation_row(row: sqlx::sqlite::SqliteRow) -> StoreResult<Conversation> {
    Ok(Conversation {
        id: row
            .try_get("id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        name: row
            .try_get("name")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        is_group: row
            .try_get("is_group")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        admin_id: row
            .try_get("admin_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        latest_message_id: row
            .try_get("latest_message_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::prepare_database;
    use crate::entities::{CreateUserRequest, MessageKind, NewMessage, UserRole};
    use crate::migrations::run_migrations;
    use crate::repos::{MessageRepository, UserRepository};
    use campus_config::DatabaseConfig;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_conversations.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 5,
        };

        let pool = prepare_database(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (pool, temp_dir)
    }

    async fn seed_user(pool: &SqlitePool, name: &str, email: &str) -> i64 {
        let repo = UserRepository::new(pool.clone());
        repo.create(&CreateUserRequest {
            name: name.to_string(),
            email: email.to_string(),
            role: UserRole::Student,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn find_or_create_creates_once_per_pair() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());

        let alice = seed_user(&pool, "Alice", "alice@example.com").await;
        let bob = seed_user(&pool, "Bob", "bob@example.com").await;

        let (first, created) = repo.find_or_create_direct(alice, bob).await.unwrap();
        assert!(created);
        assert_eq!(first.participants.len(), 2);
        assert!(!first.is_group);
        assert!(first.latest_message.is_none());

        // Reversed argument order resolves to the same conversation.
        let (second, created) = repo.find_or_create_direct(bob, alice).await.unwrap();
        assert!(!created);
        assert_eq!(second.public_id, first.public_id);
    }

    #[tokio::test]
    async fn concurrent_find_or_create_yields_one_conversation() {
        let (pool, _temp_dir) = create_test_pool().await;

        let alice = seed_user(&pool, "Alice", "alice@example.com").await;
        let bob = seed_user(&pool, "Bob", "bob@example.com").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = ConversationRepository::new(pool.clone());
            handles.push(tokio::spawn(async move {
                repo.find_or_create_direct(alice, bob).await
            }));
        }

        let mut public_ids = std::collections::HashSet::new();
        for handle in handles {
            let (conversation, _) = handle.await.unwrap().unwrap();
            public_ids.insert(conversation.public_id);
        }
        assert_eq!(public_ids.len(), 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn list_for_participant_orders_by_recency() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());
        let messages = MessageRepository::new(pool.clone());

        let alice = seed_user(&pool, "Alice", "alice@example.com").await;
        let bob = seed_user(&pool, "Bob", "bob@example.com").await;
        let carol = seed_user(&pool, "Carol", "carol@example.com").await;

        let (with_bob, _) = repo.find_or_create_direct(alice, bob).await.unwrap();
        let (with_carol, _) = repo.find_or_create_direct(alice, carol).await.unwrap();

        // A new message in the older conversation bumps it to the front.
        let bob_conversation = repo
            .find_by_public_id(&with_bob.public_id)
            .await
            .unwrap()
            .unwrap();
        let message = messages
            .append(
                alice,
                &NewMessage {
                    conversation_id: bob_conversation.id,
                    kind: MessageKind::Text,
                    content: Some("hi".to_string()),
                    media_url: None,
                },
            )
            .await
            .unwrap();
        repo.set_latest_message(bob_conversation.id, message.id)
            .await
            .unwrap();

        let listed = repo.list_for_participant(alice).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].public_id, with_bob.public_id);
        assert_eq!(listed[1].public_id, with_carol.public_id);

        let latest = listed[0].latest_message.as_ref().unwrap();
        assert_eq!(latest.content.as_deref(), Some("hi"));
        assert_eq!(latest.sender.name, "Alice");
    }

    #[tokio::test]
    async fn membership_checks_resolve() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());

        let alice = seed_user(&pool, "Alice", "alice@example.com").await;
        let bob = seed_user(&pool, "Bob", "bob@example.com").await;
        let carol = seed_user(&pool, "Carol", "carol@example.com").await;

        let (details, _) = repo.find_or_create_direct(alice, bob).await.unwrap();
        let conversation = repo
            .find_by_public_id(&details.public_id)
            .await
            .unwrap()
            .unwrap();

        assert!(repo.is_participant(conversation.id, alice).await.unwrap());
        assert!(repo.is_participant(conversation.id, bob).await.unwrap());
        assert!(!repo.is_participant(conversation.id, carol).await.unwrap());

        let ids = repo.participant_ids(conversation.id).await.unwrap();
        assert_eq!(ids, vec![alice, bob]);
    }

    #[tokio::test]
    async fn set_latest_message_requires_existing_conversation() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool);

        let err = repo.set_latest_message(4242, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::ConversationNotFound));
    }
}
