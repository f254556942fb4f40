use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::identity::{
    CredentialHasher, IdentityService, NewUser, Registration, SessionManager, User, UserId,
    UserRepository,
};
use crate::store::{MemoryStore, RepositoryError};
use crate::workflows::parking::{
    portal_router, Application, ApplicationId, ApplicationRepository, ApplicationStatus,
    ApplicationSubmission, FixedClock, NewApplication, NewPass, ParkingPortal,
    PassApplicationService, PassRecord, VehicleType,
};

pub(super) type MemoryPortal = ParkingPortal<MemoryStore, MemoryStore>;

pub(super) fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub(super) fn fast_hasher() -> CredentialHasher {
    CredentialHasher::with_cost(1024, 1).expect("valid argon2 cost")
}

pub(super) fn sessions() -> SessionManager {
    SessionManager::new("parking-pass-test-secret", Duration::minutes(30))
}

pub(super) fn build_portal<R, U>(applications: Arc<R>, users: Arc<U>) -> ParkingPortal<R, U>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    ParkingPortal::from_parts(
        IdentityService::with_hasher(users.clone(), fast_hasher()),
        PassApplicationService::with_clock(applications, users, Arc::new(FixedClock(issued_at()))),
        sessions(),
    )
}

/// Alice and Bob are staff; Admin reviews.
pub(super) struct Fixture {
    pub(super) store: Arc<MemoryStore>,
    pub(super) portal: Arc<MemoryPortal>,
    pub(super) alice: User,
    pub(super) bob: User,
    pub(super) admin: User,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::new());
    let portal = Arc::new(build_portal(store.clone(), store.clone()));

    let alice = portal
        .identity
        .register(Registration::new("Alice", "a@x.com", "secret1"))
        .expect("register alice");
    let bob = portal
        .identity
        .register(Registration::new("Bob", "b@x.com", "secret2"))
        .expect("register bob");
    let admin = portal
        .identity
        .register_admin(Registration::new("Admin", "admin@x.com", "admin123"))
        .expect("register admin");

    Fixture {
        store,
        portal,
        alice,
        bob,
        admin,
    }
}

impl Fixture {
    pub(super) fn router(&self) -> axum::Router {
        portal_router(self.portal.clone())
    }

    pub(super) fn token_for(&self, user: &User) -> String {
        self.portal.sessions.issue(user).expect("issue token").token
    }

    pub(super) fn submit_for(&self, user: &User) -> Application {
        self.portal
            .applications
            .submit(user, submission())
            .expect("submit application")
    }

    pub(super) fn approved_for(&self, user: &User) -> Application {
        let application = self.submit_for(user);
        self.portal
            .applications
            .approve(&self.admin, application.id)
            .expect("approve application")
    }
}

pub(super) fn submission() -> ApplicationSubmission {
    ApplicationSubmission {
        vehicle_number: "KA01AB1234".to_string(),
        vehicle_type: VehicleType::FourWheeler,
        mobile_number: "9999999999".to_string(),
    }
}

pub(super) fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

/// Store whose every call fails as if the database were offline.
pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl UserRepository for UnavailableStore {
    fn insert(&self, _user: NewUser) -> Result<User, RepositoryError> {
        offline()
    }

    fn find_by_email(&self, _email: &str) -> Result<Option<User>, RepositoryError> {
        offline()
    }

    fn find_by_id(&self, _id: UserId) -> Result<Option<User>, RepositoryError> {
        offline()
    }
}

impl ApplicationRepository for UnavailableStore {
    fn insert(&self, _application: NewApplication) -> Result<Application, RepositoryError> {
        offline()
    }

    fn fetch(&self, _id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        offline()
    }

    fn list_for_owner(&self, _owner: UserId) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        offline()
    }

    fn transition_status(
        &self,
        _id: ApplicationId,
        _from: ApplicationStatus,
        _to: ApplicationStatus,
    ) -> Result<Option<Application>, RepositoryError> {
        offline()
    }

    fn pass_for(&self, _id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError> {
        offline()
    }

    fn record_pass(&self, _pass: NewPass) -> Result<PassRecord, RepositoryError> {
        offline()
    }
}

/// Memory store where a competing admin rejects the row just before each status write lands.
pub(super) struct RacingStore {
    pub(super) inner: Arc<MemoryStore>,
}

impl UserRepository for RacingStore {
    fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        UserRepository::insert(self.inner.as_ref(), user)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        self.inner.find_by_email(email)
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.inner.find_by_id(id)
    }
}

impl ApplicationRepository for RacingStore {
    fn insert(&self, application: NewApplication) -> Result<Application, RepositoryError> {
        ApplicationRepository::insert(self.inner.as_ref(), application)
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<Application>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn list_for_owner(&self, owner: UserId) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_for_owner(owner)
    }

    fn list_all(&self) -> Result<Vec<Application>, RepositoryError> {
        self.inner.list_all()
    }

    fn transition_status(
        &self,
        id: ApplicationId,
        from: ApplicationStatus,
        to: ApplicationStatus,
    ) -> Result<Option<Application>, RepositoryError> {
        self.inner
            .transition_status(id, ApplicationStatus::Pending, ApplicationStatus::Rejected)?;
        self.inner.transition_status(id, from, to)
    }

    fn pass_for(&self, id: ApplicationId) -> Result<Option<PassRecord>, RepositoryError> {
        self.inner.pass_for(id)
    }

    fn record_pass(&self, pass: NewPass) -> Result<PassRecord, RepositoryError> {
        self.inner.record_pass(pass)
    }
}
