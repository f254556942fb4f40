use super::domain::{NewUser, User, UserId};
use crate::store::RepositoryError;

/// Storage abstraction for accounts. Email uniqueness is enforced by the store.
pub trait UserRepository: Send + Sync {
    /// Returns [`RepositoryError::Conflict`] when the email is already taken.
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}
