//! Persistence backends for users, applications, and issued passes.
//!
//! Both backends implement [`UserRepository`](crate::identity::UserRepository) and
//! [`ApplicationRepository`](crate::workflows::parking::ApplicationRepository) so a single store
//! handle can be shared by the identity and application services.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("referenced owner does not exist")]
    MissingOwner,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
