use std::sync::Arc;

use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use super::domain::{
    Application, ApplicationId, ApplicationStatus, ApplicationSubmission, NewApplication, NewPass,
    PassRecord,
};
use super::lifecycle::{authorize, LifecycleError, Transition};
use super::pass::document::{pass_filename, pass_number};
use super::pass::{PassDocument, PassDocumentError, PassDocumentGenerator};
use super::repository::ApplicationRepository;
use crate::identity::{User, UserId, UserRepository};
use crate::store::RepositoryError;

/// Service composing the application registry, lifecycle rules, and pass rendering.
pub struct PassApplicationService<R, U> {
    applications: Arc<R>,
    users: Arc<U>,
    clock: Arc<dyn Clock>,
    documents: PassDocumentGenerator,
}

impl<R, U> PassApplicationService<R, U>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    pub fn new(applications: Arc<R>, users: Arc<U>) -> Self {
        Self::with_clock(applications, users, Arc::new(SystemClock))
    }

    pub fn with_clock(applications: Arc<R>, users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self {
            applications,
            users,
            clock,
            documents: PassDocumentGenerator,
        }
    }

    /// Submit a new application owned by `actor`. It starts `Pending`.
    pub fn submit(
        &self,
        actor: &User,
        submission: ApplicationSubmission,
    ) -> Result<Application, ApplicationServiceError> {
        let pending = NewApplication::pending(actor.id, submission, self.clock.now());
        let stored = self.applications.insert(pending)?;
        info!(
            application_id = %stored.id,
            owner = %stored.owner,
            vehicle_type = stored.vehicle_type.label(),
            "pass application submitted"
        );
        Ok(stored)
    }

    pub fn list_for_user(&self, user_id: UserId) -> Result<Vec<Application>, ApplicationServiceError> {
        Ok(self.applications.list_for_owner(user_id)?)
    }

    pub fn list_all(&self) -> Result<Vec<Application>, ApplicationServiceError> {
        Ok(self.applications.list_all()?)
    }

    /// Admins see every application, everyone else only their own.
    pub fn list_visible(&self, actor: &User) -> Result<Vec<Application>, ApplicationServiceError> {
        if actor.is_admin() {
            self.list_all()
        } else {
            self.list_for_user(actor.id)
        }
    }

    pub fn get(&self, id: ApplicationId) -> Result<Application, ApplicationServiceError> {
        self.applications
            .fetch(id)?
            .ok_or(ApplicationServiceError::NotFound(id))
    }

    /// Fetch an application on behalf of its owner or an admin.
    ///
    /// Only admins can tell a missing id apart from someone else's application.
    pub fn get_for(
        &self,
        actor: &User,
        id: ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        match self.applications.fetch(id)? {
            Some(application) if application.is_visible_to(actor) => Ok(application),
            None if actor.is_admin() => Err(ApplicationServiceError::NotFound(id)),
            _ => {
                warn!(actor = %actor.id, application_id = %id, "application view denied");
                Err(ApplicationServiceError::Unauthorized)
            }
        }
    }

    pub fn approve(
        &self,
        actor: &User,
        id: ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(actor, id, Transition::Approve)
    }

    pub fn reject(
        &self,
        actor: &User,
        id: ApplicationId,
    ) -> Result<Application, ApplicationServiceError> {
        self.transition(actor, id, Transition::Reject)
    }

    fn transition(
        &self,
        actor: &User,
        id: ApplicationId,
        transition: Transition,
    ) -> Result<Application, ApplicationServiceError> {
        if let Err(err) = authorize(actor, transition) {
            warn!(actor = %actor.id, application_id = %id, transition = transition.label(), "transition denied");
            return Err(err.into());
        }

        let current = self.get(id)?;
        let next = transition.apply(current.status)?;

        match self
            .applications
            .transition_status(id, current.status, next)
        {
            Ok(Some(updated)) => {
                info!(
                    actor = %actor.id,
                    application_id = %id,
                    status = updated.status.label(),
                    "application status changed"
                );
                Ok(updated)
            }
            // Another writer moved the row first; report against what is stored now.
            Ok(None) => {
                let stored = self.get(id)?;
                Err(LifecycleError::InvalidTransition {
                    from: stored.status,
                    transition,
                }
                .into())
            }
            Err(RepositoryError::NotFound) => Err(ApplicationServiceError::NotFound(id)),
            Err(other) => Err(other.into()),
        }
    }

    /// Render the pass for an approved application.
    ///
    /// Checks run in a fixed order: existence, approval (whoever asks), then ownership.
    pub fn download_pass(
        &self,
        actor: &User,
        id: ApplicationId,
    ) -> Result<PassDocument, ApplicationServiceError> {
        let application = self.get(id)?;
        if application.status != ApplicationStatus::Approved {
            return Err(ApplicationServiceError::NotApproved(application.status));
        }
        if !application.is_visible_to(actor) {
            warn!(actor = %actor.id, application_id = %id, "pass download denied");
            return Err(ApplicationServiceError::Unauthorized);
        }

        let holder = self
            .users
            .find_by_id(application.owner)?
            .ok_or(ApplicationServiceError::HolderMissing(application.owner))?;
        let document = self.documents.generate(&application, &holder)?;
        self.record_issuance(&application)?;

        info!(
            actor = %actor.id,
            application_id = %id,
            pass_number = %document.pass_number,
            bytes = document.bytes.len(),
            "pass document generated"
        );
        Ok(document)
    }

    /// Issuance record for an application, if its pass has been downloaded.
    pub fn issued_pass(&self, id: ApplicationId) -> Result<Option<PassRecord>, ApplicationServiceError> {
        Ok(self.applications.pass_for(id)?)
    }

    fn record_issuance(&self, application: &Application) -> Result<PassRecord, ApplicationServiceError> {
        if let Some(existing) = self.applications.pass_for(application.id)? {
            return Ok(existing);
        }

        let pass = NewPass {
            application_id: application.id,
            pass_number: pass_number(application.id),
            document_path: pass_filename(application.id),
            generated_at: self.clock.now(),
        };
        match self.applications.record_pass(pass) {
            Ok(record) => Ok(record),
            Err(RepositoryError::Conflict) => self
                .applications
                .pass_for(application.id)?
                .ok_or(ApplicationServiceError::Repository(RepositoryError::NotFound)),
            Err(other) => Err(other.into()),
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("access denied")]
    Unauthorized,
    #[error("cannot {} an application that is already {}", transition.label(), from.label())]
    InvalidTransition {
        from: ApplicationStatus,
        transition: Transition,
    },
    #[error("pass is available only after approval (status: {})", .0.label())]
    NotApproved(ApplicationStatus),
    #[error("pass holder {0} no longer exists")]
    HolderMissing(UserId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Document(PassDocumentError),
}

impl From<LifecycleError> for ApplicationServiceError {
    fn from(value: LifecycleError) -> Self {
        match value {
            LifecycleError::Unauthorized { .. } => Self::Unauthorized,
            LifecycleError::InvalidTransition { from, transition } => {
                Self::InvalidTransition { from, transition }
            }
        }
    }
}

impl From<PassDocumentError> for ApplicationServiceError {
    fn from(value: PassDocumentError) -> Self {
        match value {
            PassDocumentError::NotApproved(status) => Self::NotApproved(status),
            other => Self::Document(other),
        }
    }
}
