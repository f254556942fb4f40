use metrics_exporter_prometheus::PrometheusHandle;
use parking_pass::config::{AdminSeed, AppConfig, StorageConfig};
use parking_pass::error::AppError;
use parking_pass::identity::{
    IdentityError, NewUser, Registration, SessionManager, User, UserId, UserRepository,
};
use parking_pass::store::{MemoryStore, RepositoryError, SqliteStore};
use parking_pass::workflows::parking::{
    validate_registration, Application, ApplicationId, ApplicationRepository, ApplicationStatus,
    NewApplication, NewPass, ParkingPortal, PassRecord,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Backend chosen from `APP_DATABASE_URL`.
pub(crate) enum ConfiguredStore {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl ConfiguredStore {
    pub(crate) fn open(config: &StorageConfig) -> Result<Self, AppError> {
        match config.sqlite_path() {
            Some(path) => Ok(Self::Sqlite(SqliteStore::open(path)?)),
            None => Ok(Self::Memory(MemoryStore::new())),
        }
    }

    pub(crate) fn backend(&self) -> &'static str {
        match self {
            ConfiguredStore::Memory(_) => "memory",
            ConfiguredStore::Sqlite(_) => "sqlite",
        }
    }

    fn users(&self) -> &dyn UserRepository {
        match self {
            ConfiguredStore::Memory(store) => store,
            ConfiguredStore::Sqlite(store) => store,
        }
    }

    fn applications(&self) -> &dyn ApplicationRepository {
        match self {
            ConfiguredStore::Memory(store) => store,
            ConfiguredStore::Sqlite(store) => store,
        }
    }
}

impl UserRepository for ConfiguredStore {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        self.users().insert(user)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.users().find_by_email(email)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.users().find_by_id(id)
    }
}

impl ApplicationRepository for ConfiguredStore {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        self.applications().insert(application)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.applications().fetch(id)
    }

    fn list_for_owner(&self, owner: UserId) -> Result<Vec<Application>, RepositoryError> {
        self.applications().list_for_owner(owner)
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        self.applications().list_all()
    }

    fn transition_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, RepositoryError> {
        self.applications().transition_status(id, from, to)
    }

    fn pass_for(&self, id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError> {
        self.applications().pass_for(id)
    }

    fn record_pass(&self, pass: NewPass) -> Result<PassRecord, RepositoryError> {
        self.applications().record_pass(pass)
    }
}

pub(crate) type Portal = ParkingPortal<ConfiguredStore, ConfiguredStore>;

pub(crate) fn build_portal(config: &AppConfig) -> Result<Arc<Portal>, AppError> {
    let store = Arc::new(ConfiguredStore::open(&config.storage)?);
    info!(backend = store.backend(), "store opened");
    Ok(Arc::new(ParkingPortal::new(
        store.clone(),
        store,
        SessionManager::from_config(&config.session),
    )))
}

/// Result of seeding the configured administrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AdminBootstrap {
    Created(User),
    AlreadyAdmin(User),
    /// The seed email is held by a non-admin account; nobody was promoted.
    EmailHeldByStaff(User),
}

impl AdminBootstrap {
    pub(crate) fn account(&self) -> &User {
        match self {
            AdminBootstrap::Created(user)
            | AdminBootstrap::AlreadyAdmin(user)
            | AdminBootstrap::EmailHeldByStaff(user) => user,
        }
    }
}

/// Register the configured administrator unless the email is already taken.
pub(crate) fn bootstrap_admin<R, U>(
    portal: &ParkingPortal<R, U>,
    seed: &AdminSeed,
) -> Result<AdminBootstrap, AppError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let registration = validate_registration(Registration::new(
        seed.name.as_str(),
        seed.email.as_str(),
        seed.password.as_str(),
    ))?;

    let email = registration.email.clone();
    match portal.identity.register_admin(registration) {
        Ok(admin) => {
            info!(user_id = %admin.id, "bootstrapped administrator");
            Ok(AdminBootstrap::Created(admin))
        }
        Err(IdentityError::DuplicateIdentity) => {
            let existing = portal
                .identity
                .find_by_email(&email)?
                .ok_or(IdentityError::DuplicateIdentity)?;
            if existing.is_admin() {
                info!(user_id = %existing.id, "administrator already present");
                Ok(AdminBootstrap::AlreadyAdmin(existing))
            } else {
                warn!(
                    user_id = %existing.id,
                    role = existing.role.label(),
                    "admin seed email belongs to a non-admin account; no administrator bootstrapped"
                );
                Ok(AdminBootstrap::EmailHeldByStaff(existing))
            }
        }
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn seed() -> AdminSeed {
        AdminSeed {
            name: "Administrator".to_string(),
            email: "Admin@X.com".to_string(),
            password: "admin123".to_string(),
        }
    }

    #[test]
    fn memory_backend_is_used_without_database_url() {
        let store = ConfiguredStore::open(&StorageConfig::default()).expect("open");
        assert_eq!(store.backend(), "memory");

        let store = ConfiguredStore::open(&StorageConfig {
            database_url: Some(":memory:".to_string()),
        })
        .expect("open");
        assert_eq!(store.backend(), "memory");
    }

    #[test]
    fn bootstrap_admin_is_idempotent() {
        let store = Arc::new(ConfiguredStore::Memory(MemoryStore::new()));
        let portal = ParkingPortal::new(
            store.clone(),
            store.clone(),
            SessionManager::new("bootstrap-secret", Duration::minutes(5)),
        );

        let created = match bootstrap_admin(&portal, &seed()).expect("bootstrap") {
            AdminBootstrap::Created(admin) => admin,
            other => panic!("expected a new administrator, got {other:?}"),
        };
        assert!(created.is_admin());
        assert_eq!(created.email, "admin@x.com");

        assert_eq!(
            bootstrap_admin(&portal, &seed()).expect("bootstrap"),
            AdminBootstrap::AlreadyAdmin(created.clone())
        );
        assert_eq!(
            store.find_by_email("admin@x.com").expect("lookup"),
            Some(created)
        );
    }

    #[test]
    fn bootstrap_admin_reports_a_staff_account_holding_the_seed_email() {
        let store = Arc::new(ConfiguredStore::Memory(MemoryStore::new()));
        let portal = ParkingPortal::new(
            store.clone(),
            store.clone(),
            SessionManager::new("bootstrap-secret", Duration::minutes(5)),
        );
        let staff = portal
            .identity
            .register(Registration::new("Early Bird", "admin@x.com", "secret1"))
            .expect("staff registration");

        assert_eq!(
            bootstrap_admin(&portal, &seed()).expect("bootstrap"),
            AdminBootstrap::EmailHeldByStaff(staff.clone())
        );
        let stored = store
            .find_by_email("admin@x.com")
            .expect("lookup")
            .expect("account kept");
        assert!(!stored.is_admin());
        assert_eq!(stored, staff);
    }

    #[test]
    fn bootstrap_admin_rejects_weak_password() {
        let store = Arc::new(ConfiguredStore::Memory(MemoryStore::new()));
        let portal = ParkingPortal::new(
            store.clone(),
            store,
            SessionManager::new("bootstrap-secret", Duration::minutes(5)),
        );
        let weak = AdminSeed {
            password: "123".to_string(),
            ..seed()
        };
        assert!(matches!(
            bootstrap_admin(&portal, &weak),
            Err(AppError::Validation(_))
        ));
    }
}
