//! Domain entities for the storage layer

pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{direct_key, Conversation, ConversationWithDetails};
pub use message::{MessageKind, MessagePatch, MessageWithSender, NewMessage};
pub use user::{CreateUserRequest, User, UserRole, UserSummary};
