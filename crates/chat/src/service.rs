//! Chat service orchestrating the conversation directory, the message store,
//! and the realtime notifier.
//!
//! Ordering rule: within a conversation the append and the latest-message
//! pointer update complete before the notifier fires, so a client that reacts
//! to the push by re-fetching sees consistent state.

use std::sync::Arc;

use campus_database::{
    ConversationRepository, ConversationWithDetails, MessagePatch, MessageRepository,
    MessageWithSender, NewMessage, User, UserRepository,
};
use campus_database::MessageKind;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::notify::{ChatNotifier, MessageBroadcast};
use crate::permissions::ensure_can_modify;
use crate::types::{ChatError, ChatResult};
use crate::validation;

/// Outcome of `access_conversation`: the conversation plus whether this call
/// created it.
#[derive(Debug)]
pub struct AccessedConversation {
    pub conversation: ConversationWithDetails,
    pub created: bool,
}

/// Send request assembled by the transport layer
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub conversation_id: Option<String>,
    pub kind: Option<MessageKind>,
    pub content: Option<String>,
    pub media_url: Option<String>,
}

/// The chat orchestrator
pub struct ChatService {
    conversations: ConversationRepository,
    messages: MessageRepository,
    users: UserRepository,
    notifier: Arc<dyn ChatNotifier>,
}

impl ChatService {
    /// Create a new chat service backed by a pool and a realtime notifier
    pub fn new(pool: SqlitePool, notifier: Arc<dyn ChatNotifier>) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            notifier,
        }
    }

    /// Return the direct conversation between the caller and another user,
    /// creating it on first access.
    pub async fn access_conversation(
        &self,
        caller: &User,
        other_user_id: Option<&str>,
    ) -> ChatResult<AccessedConversation> {
        let other_user_id = other_user_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChatError::bad_request("otherUserId is required"))?;

        validation::well_formed_id(other_user_id)?;

        if other_user_id == caller.public_id {
            return Err(ChatError::bad_request(
                "cannot open a conversation with yourself",
            ));
        }

        let other = self
            .users
            .find_by_public_id(other_user_id)
            .await?
            .ok_or_else(|| ChatError::not_found("user not found"))?;

        let (conversation, created) = self
            .conversations
            .find_or_create_direct(caller.id, other.id)
            .await?;

        debug!(
            caller = %caller.public_id,
            other = %other.public_id,
            conversation = %conversation.public_id,
            created = created,
            "accessed direct conversation"
        );

        Ok(AccessedConversation {
            conversation,
            created,
        })
    }

    /// All conversations containing the caller, most recently updated first
    pub async fn list_conversations(
        &self,
        caller: &User,
    ) -> ChatResult<Vec<ConversationWithDetails>> {
        Ok(self.conversations.list_for_participant(caller.id).await?)
    }

    /// Append a message, update the latest-message pointer, then notify.
    pub async fn send(
        &self,
        caller: &User,
        outbound: OutboundMessage,
    ) -> ChatResult<MessageWithSender> {
        let has_content = outbound
            .content
            .as_deref()
            .map(|c| !c.trim().is_empty())
            .unwrap_or(false);
        let has_media = outbound.media_url.is_some();

        let conversation_id = match outbound.conversation_id.as_deref() {
            Some(id) if !id.trim().is_empty() && (has_content || has_media) => id,
            _ => {
                return Err(ChatError::bad_request(
                    "conversation id and content or media are required",
                ))
            }
        };

        if has_content {
            validation::message_content(outbound.content.as_deref().unwrap_or_default())?;
        }

        let conversation = self
            .conversations
            .find_by_public_id(conversation_id)
            .await?
            .ok_or_else(|| ChatError::not_found("conversation not found"))?;

        if !self
            .conversations
            .is_participant(conversation.id, caller.id)
            .await?
        {
            return Err(ChatError::forbidden(
                "sender is not a participant of this conversation",
            ));
        }

        let kind = outbound.kind.unwrap_or(MessageKind::Text);
        let message = self
            .messages
            .append(
                caller.id,
                &NewMessage {
                    conversation_id: conversation.id,
                    kind,
                    content: outbound.content.filter(|c| !c.trim().is_empty()),
                    media_url: outbound.media_url,
                },
            )
            .await?;

        self.conversations
            .set_latest_message(conversation.id, message.id)
            .await?;

        let participants = self.conversations.participants(conversation.id).await?;
        self.notifier.message_created(&MessageBroadcast {
            message: message.clone(),
            participants,
        });

        info!(
            conversation = %conversation.public_id,
            message = %message.public_id,
            sender = %caller.public_id,
            "message sent"
        );

        Ok(message)
    }

    /// All messages of a conversation in creation order
    pub async fn list_messages(
        &self,
        caller: &User,
        conversation_id: &str,
    ) -> ChatResult<Vec<MessageWithSender>> {
        let conversation = self
            .conversations
            .find_by_public_id(conversation_id)
            .await?
            .ok_or_else(|| ChatError::not_found("conversation not found"))?;

        if !self
            .conversations
            .is_participant(conversation.id, caller.id)
            .await?
        {
            return Err(ChatError::forbidden(
                "caller is not a participant of this conversation",
            ));
        }

        Ok(self.messages.list_by_conversation(conversation.id).await?)
    }

    /// Mark every unread message of a conversation as read.
    ///
    /// A count of zero is still success; the read receipt is only broadcast
    /// when something actually changed.
    pub async fn mark_read(&self, caller: &User, conversation_id: &str) -> ChatResult<u64> {
        let conversation = self
            .conversations
            .find_by_public_id(conversation_id)
            .await?
            .ok_or_else(|| ChatError::not_found("conversation not found"))?;

        if !self
            .conversations
            .is_participant(conversation.id, caller.id)
            .await?
        {
            return Err(ChatError::forbidden(
                "caller is not a participant of this conversation",
            ));
        }

        let changed = self.messages.mark_all_read(conversation.id).await?;

        if changed > 0 {
            self.notifier.messages_seen(&conversation.public_id);
            info!(
                conversation = %conversation.public_id,
                changed = changed,
                "marked messages read"
            );
        }

        Ok(changed)
    }

    /// Delete a message; permitted for its sender or an admin
    pub async fn delete_message(&self, caller: &User, message_id: &str) -> ChatResult<()> {
        let message = self
            .messages
            .find_by_public_id(message_id)
            .await?
            .ok_or_else(|| ChatError::not_found("message not found"))?;

        ensure_can_modify(caller, &message)?;

        Ok(self.messages.remove(&message.public_id).await?)
    }

    /// Patch a message's content variant; permitted for its sender or an admin
    pub async fn update_message(
        &self,
        caller: &User,
        message_id: &str,
        patch: MessagePatch,
    ) -> ChatResult<MessageWithSender> {
        let message = self
            .messages
            .find_by_public_id(message_id)
            .await?
            .ok_or_else(|| ChatError::not_found("message not found"))?;

        ensure_can_modify(caller, &message)?;

        Ok(self.messages.update(&message.public_id, &patch).await?)
    }
}
