use std::sync::Arc;

use tracing::{info, warn};

use super::credentials::CredentialHasher;
use super::domain::{normalize_email, NewUser, Registration, Role, User, UserId};
use super::repository::UserRepository;
use crate::store::RepositoryError;

/// Verified against when the email is unknown so both failure paths pay for one hash.
const DECOY_PASSWORD: &str = "parking-pass-decoy";

/// Registration, credential checks, and session identity restoration.
pub struct IdentityService<U> {
    users: Arc<U>,
    hasher: CredentialHasher,
    decoy_hash: Option<String>,
}

impl<U> IdentityService<U>
where
    U: UserRepository + 'static,
{
    pub fn new(users: Arc<U>) -> Self {
        Self::with_hasher(users, CredentialHasher::default())
    }

    pub fn with_hasher(users: Arc<U>, hasher: CredentialHasher) -> Self {
        let decoy_hash = hasher.hash(DECOY_PASSWORD).ok();
        Self {
            users,
            hasher,
            decoy_hash,
        }
    }

    /// Create a `staff` account. The email must not be registered yet.
    pub fn register(&self, registration: Registration) -> Result<User, IdentityError> {
        self.register_with_role(registration, Role::Staff)
    }

    /// Create an `admin` account; only reachable from bootstrap and the CLI.
    pub fn register_admin(&self, registration: Registration) -> Result<User, IdentityError> {
        self.register_with_role(registration, Role::Admin)
    }

    fn register_with_role(
        &self,
        registration: Registration,
        role: Role,
    ) -> Result<User, IdentityError> {
        let email = normalize_email(&registration.email);
        if self.users.find_by_email(&email)?.is_some() {
            return Err(IdentityError::DuplicateIdentity);
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        let user = self
            .users
            .insert(NewUser {
                name: registration.name.trim().to_string(),
                email,
                password_hash,
                role,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => IdentityError::DuplicateIdentity,
                other => IdentityError::Repository(other),
            })?;

        info!(user_id = %user.id, role = user.role.label(), "registered user");
        Ok(user)
    }

    /// Check an email/password pair. Unknown email and wrong password fail identically.
    pub fn authenticate(&self, email: &str, raw_password: &str) -> Result<User, IdentityError> {
        let user = self.users.find_by_email(&normalize_email(email))?;
        let verified = match &user {
            Some(user) => self.hasher.verify(raw_password, &user.password_hash),
            None => {
                if let Some(decoy) = &self.decoy_hash {
                    self.hasher.verify(raw_password, decoy);
                }
                false
            }
        };

        match user {
            Some(user) if verified => Ok(user),
            _ => {
                warn!("rejected login attempt");
                Err(IdentityError::InvalidCredentials)
            }
        }
    }

    /// Look up an account by email without checking credentials.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, IdentityError> {
        Ok(self.users.find_by_email(&normalize_email(email))?)
    }

    pub fn load_by_id(&self, id: UserId) -> Result<Option<User>, IdentityError> {
        Ok(self.users.find_by_id(id)?)
    }
}

/// Error raised by the identity service.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("email already registered")]
    DuplicateIdentity,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("credential hashing failed: {0}")]
    Credential(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
