//! Campus Database Crate
//!
//! Durable storage for the Campus chat backend: connection management,
//! migrations, the conversation directory, and the message store.

use sqlx::SqlitePool;

use campus_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{ConversationRepository, MessageRepository, UserRepository};

// Re-export entities
pub use entities::{
    conversation::{direct_key, Conversation, ConversationWithDetails},
    message::{MessageKind, MessagePatch, MessageWithSender, NewMessage},
    user::{CreateUserRequest, User, UserRole, UserSummary},
};

// Re-export types
pub use types::{StoreError, StoreResult};

/// Prepare the connection pool and apply migrations
pub async fn initialize_database(config: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let pool = prepare_database(config).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}
