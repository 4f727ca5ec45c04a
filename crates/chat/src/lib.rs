//! # Campus Chat Crate
//!
//! Business logic for the chat subsystem: the orchestrating service, the
//! modification capability check, the notification seam toward the realtime
//! transport, and the media store collaborator.
//!
//! The crate never touches the transport directly; the gateway implements
//! [`ChatNotifier`] and injects it at construction time.

pub mod media;
pub mod notify;
pub mod permissions;
pub mod service;
pub mod types;
pub mod validation;

pub use media::{LocalMediaStore, MediaError, MediaStore};
pub use notify::{ChatNotifier, MessageBroadcast, NullNotifier};
pub use permissions::{can_modify, ensure_can_modify};
pub use service::{AccessedConversation, ChatService, OutboundMessage};
pub use types::{ChatError, ChatResult};
