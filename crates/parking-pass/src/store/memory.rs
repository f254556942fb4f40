use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::RepositoryError;
use crate::identity::{NewUser, User, UserId, UserRepository};
use crate::workflows::parking::{
    Application, ApplicationId, ApplicationRepository, ApplicationStatus, NewApplication, NewPass,
    PassRecord,
};

/// Process-local store used by tests, the demo, and `APP_DATABASE_URL=:memory:`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    applications: BTreeMap<ApplicationId, Application>,
    passes: BTreeMap<ApplicationId, PassRecord>,
    next_user: i64,
    next_application: i64,
    next_pass: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("memory store lock poisoned".to_string()))
    }
}

fn next_id(sequence: &mut i64) -> i64 {
    *sequence += 1;
    *sequence
}

impl UserRepository for MemoryStore {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state()?;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Conflict);
        }

        let id = UserId(next_id(&mut state.next_user));
        let stored = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
        };
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let state = self.state()?;
        Ok(state.users.values().find(|user| user.email == email).cloned())
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.state()?.users.get(&id).cloned())
    }
}

impl ApplicationRepository for MemoryStore {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        let mut state = self.state()?;
        if !state.users.contains_key(&application.owner) {
            return Err(RepositoryError::MissingOwner);
        }

        let id = ApplicationId(next_id(&mut state.next_application));
        let stored = Application {
            id,
            owner: application.owner,
            vehicle_number: application.vehicle_number,
            vehicle_type: application.vehicle_type,
            mobile_number: application.mobile_number,
            status: application.status,
            issued_at: application.issued_at,
            expires_at: application.expires_at,
        };
        state.applications.insert(id, stored.clone());
        Ok(stored)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.state()?.applications.get(&id).cloned())
    }

    fn list_for_owner(&self, owner: UserId) -> Result<Vec<Application>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .applications
            .values()
            .filter(|application| application.owner == owner)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        Ok(self.state()?.applications.values().cloned().collect())
    }

    fn transition_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, RepositoryError> {
        let mut state = self.state()?;
        let application = state
            .applications
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if application.status != from {
            return Ok(None);
        }
        application.status = to;
        Ok(Some(application.clone()))
    }

    fn pass_for(&self, id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError> {
        Ok(self.state()?.passes.get(&id).cloned())
    }

    fn record_pass(&self, pass: NewPass) -> Result<PassRecord, RepositoryError> {
        let mut state = self.state()?;
        if !state.applications.contains_key(&pass.application_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.passes.contains_key(&pass.application_id) {
            return Err(RepositoryError::Conflict);
        }

        let record = PassRecord {
            id: next_id(&mut state.next_pass),
            application_id: pass.application_id,
            pass_number: pass.pass_number,
            document_path: pass.document_path,
            generated_at: pass.generated_at,
        };
        state.passes.insert(record.application_id, record.clone());
        Ok(record)
    }
}
