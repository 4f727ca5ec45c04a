//! Shared types for the storage layer

pub mod errors;

pub use errors::StoreError;

/// Result type alias for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
