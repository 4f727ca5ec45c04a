//! Repository for the message store.

use crate::entities::{MessageKind, MessagePatch, MessageWithSender, NewMessage, UserSummary};
use crate::types::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Base SELECT with sender display attributes and conversation public id resolved
pub(crate) const MESSAGE_SELECT: &str = "SELECT m.id, m.public_id, m.conversation_id, \
     c.public_id AS conversation_public_id, m.sender_id, m.kind, m.content, m.media_url, \
     m.is_read, m.created_at, m.updated_at, \
     u.public_id AS sender_public_id, u.name AS sender_name, u.email AS sender_email, \
     u.role AS sender_role \
     FROM messages m \
     JOIN users u ON u.id = m.sender_id \
     JOIN conversations c ON c.id = m.conversation_id";

/// Repository for message database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a message to a conversation, unread by default
    pub async fn append(
        &self,
        sender_id: i64,
        message: &NewMessage,
    ) -> StoreResult<MessageWithSender> {
        if message.content.is_none() && message.media_url.is_none() {
            return Err(StoreError::InvalidContent);
        }

        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO messages (public_id, conversation_id, sender_id, kind, content, media_url, is_read, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&public_id)
        .bind(message.conversation_id)
        .bind(sender_id)
        .bind(message.kind.to_string())
        .bind(&message.content)
        .bind(&message.media_url)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        info!(
            message_id = result.last_insert_rowid(),
            public_id = %public_id,
            conversation_id = message.conversation_id,
            sender_id = sender_id,
            kind = %message.kind.to_string(),
            "appended message"
        );

        self.find_by_public_id(&public_id)
            .await?
            .ok_or(StoreError::MessageNotFound)
    }

    /// All messages of a conversation in creation order
    pub async fn list_by_conversation(
        &self,
        conversation_id: i64,
    ) -> StoreResult<Vec<MessageWithSender>> {
        let query = format!("{MESSAGE_SELECT} WHERE m.conversation_id = ? ORDER BY m.created_at ASC, m.id ASC");
        let rows = sqlx::query(&query)
            .bind(conversation_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(map_message_row).collect()
    }

    /// Find a message by public ID
    pub async fn find_by_public_id(
        &self,
        public_id: &str,
    ) -> StoreResult<Option<MessageWithSender>> {
        let query = format!("{MESSAGE_SELECT} WHERE m.public_id = ?");
        let row = sqlx::query(&query)
            .bind(public_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        row.map(map_message_row).transpose()
    }

    /// Transition every unread message of a conversation to read.
    ///
    /// Returns the number of rows changed; repeat calls return 0.
    pub async fn mark_all_read(&self, conversation_id: i64) -> StoreResult<u64> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE messages SET is_read = 1, updated_at = ? WHERE conversation_id = ? AND is_read = 0",
        )
        .bind(&now)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Apply the non-nil fields of a patch; omitted fields keep the stored value
    pub async fn update(
        &self,
        public_id: &str,
        patch: &MessagePatch,
    ) -> StoreResult<MessageWithSender> {
        let existing = self
            .find_by_public_id(public_id)
            .await?
            .ok_or(StoreError::MessageNotFound)?;

        let content = patch.content.clone().or(existing.content);
        let media_url = patch.media_url.clone().or(existing.media_url);
        let kind = patch.kind.unwrap_or(existing.kind);

        if content.is_none() && media_url.is_none() {
            return Err(StoreError::InvalidContent);
        }

        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE messages SET content = ?, media_url = ?, kind = ?, updated_at = ? WHERE public_id = ?",
        )
        .bind(&content)
        .bind(&media_url)
        .bind(kind.to_string())
        .bind(&now)
        .bind(public_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        self.find_by_public_id(public_id)
            .await?
            .ok_or(StoreError::MessageNotFound)
    }

    /// Delete a message record
    pub async fn remove(&self, public_id: &str) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM messages WHERE public_id = ?")
            .bind(public_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MessageNotFound);
        }

        info!(public_id = public_id, "deleted message");
        Ok(())
    }
}

pub(crate) fn map_message_row(row: sqlx::sqlite::SqliteRow) -> StoreResult<MessageWithSender> {
    let kind: String = row
        .try_get("kind")
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;
    let sender_role: String = row
        .try_get("sender_role")
        .map_err(|e| StoreError::DatabaseError(e.to_string()))?;

    Ok(MessageWithSender {
        id: row
            .try_get("id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        public_id: row
            .try_get("public_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        conversation_id: row
            .try_get("conversation_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        conversation_public_id: row
            .try_get("conversation_public_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        sender_id: row
            .try_get("sender_id")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        sender: UserSummary {
            public_id: row
                .try_get("sender_public_id")
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
            name: row
                .try_get("sender_name")
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
            email: row
                .try_get("sender_email")
                .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
            role: sender_role.as_str().into(),
        },
        kind: MessageKind::from(kind.as_str()),
        content: row
            .try_get("content")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        media_url: row
            .try_get("media_url")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        is_read: row
            .try_get("is_read")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
        updated_at: row
            .try_get("updated_at")
            .map_err(|e| StoreError::DatabaseError(e.to_string()))?,
    })
}
