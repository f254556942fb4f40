use super::domain::{
    Application, ApplicationId, ApplicationStatus, NewApplication, NewPass, PassRecord,
};
use crate::identity::UserId;
use crate::store::RepositoryError;

/// Storage abstraction so the service module can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    /// Returns [`RepositoryError::MissingOwner`] when the owning user does not exist.
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError>;
    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError>;
    /// Applications owned by `owner`, in insertion order.
    fn list_for_owner(&self, owner: UserId) -> Result<Vec<Application>, RepositoryError>;
    /// Every application, in insertion order.
    fn list_all(&self) -> Result<Vec<Application>, RepositoryError>;
    /// Single-row compare-and-set of the status.
    ///
    /// Yields `Ok(None)` when the row exists but its status is not `from`, and
    /// [`RepositoryError::NotFound`] when there is no such row.
    fn transition_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, RepositoryError>;
    fn pass_for(&self, id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError>;
    /// Returns [`RepositoryError::Conflict`] when the application already has a pass.
    fn record_pass(&self, pass: NewPass) -> Result<PassRecord, RepositoryError>;
}
