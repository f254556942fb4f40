//! User accounts, credential hashing, and session tokens.

pub(crate) mod credentials;
pub mod domain;
pub mod repository;
pub mod service;
pub mod session;

pub use credentials::CredentialHasher;
pub use domain::{normalize_email, NewUser, Registration, Role, User, UserId, UserView};
pub use repository::UserRepository;
pub use service::{IdentityError, IdentityService};
pub use session::{SessionError, SessionManager, SessionToken};
