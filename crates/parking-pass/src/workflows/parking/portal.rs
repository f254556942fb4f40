use std::sync::Arc;

use super::repository::ApplicationRepository;
use super::service::PassApplicationService;
use crate::identity::{IdentityService, SessionManager, UserRepository};

/// Everything the HTTP layer needs, shared behind one `Arc`.
pub struct ParkingPortal<R, U> {
    pub identity: IdentityService<U>,
    pub applications: PassApplicationService<R, U>,
    pub sessions: SessionManager,
}

impl<R, U> ParkingPortal<R, U>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    /// Wire default services over the given stores.
    pub fn new(applications: Arc<R>, users: Arc<U>, sessions: SessionManager) -> Self {
        Self {
            identity: IdentityService::new(users.clone()),
            applications: PassApplicationService::new(applications, users),
            sessions,
        }
    }

    pub fn from_parts(
        identity: IdentityService<U>,
        applications: PassApplicationService<R, U>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            identity,
            applications,
            sessions,
        }
    }
}
