use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::error;

use super::domain::{ApplicationId, ApplicationSubmission};
use super::portal::ParkingPortal;
use super::repository::ApplicationRepository;
use super::service::ApplicationServiceError;
use super::validation::{
    validate_login, validate_registration, validate_submission, LoginForm, ValidationError,
};
use crate::identity::{IdentityError, Registration, SessionError, User, UserRepository};

const LOGIN_PAGE: &str = "/login";
const DASHBOARD_PAGE: &str = "/dashboard";
const HOME_PAGE: &str = "/";

type SharedPortal<R, U> = State<Arc<ParkingPortal<R, U>>>;

/// Router builder exposing registration, login, application, review, and download endpoints.
pub fn portal_router<R, U>(portal: Arc<ParkingPortal<R, U>>) -> Router
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    Router::new()
        .route("/", get(home_handler))
        .route("/api/v1/auth/register", post(register_handler::<R, U>))
        .route("/api/v1/auth/login", post(login_handler::<R, U>))
        .route("/api/v1/auth/logout", post(logout_handler))
        .route(
            "/api/v1/applications",
            get(list_handler::<R, U>).post(submit_handler::<R, U>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(get_handler::<R, U>),
        )
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler::<R, U>),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler::<R, U>),
        )
        .route(
            "/api/v1/applications/:application_id/pass",
            get(pass_handler::<R, U>),
        )
        .with_state(portal)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
}

/// Run synchronous portal work (hashing, storage, rendering) off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}

/// Resolve the bearer token to a live account.
fn current_user<R, U>(portal: &ParkingPortal<R, U>, headers: &HeaderMap) -> Result<User, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let token = bearer_token(headers).ok_or(ApiError::Unauthenticated)?;
    let user_id = portal.sessions.resolve(token)?;
    portal
        .identity
        .load_by_id(user_id)?
        .ok_or(ApiError::Unauthenticated)
}

pub(crate) async fn home_handler() -> Json<Value> {
    Json(json!({
        "service": "parking-pass",
        "links": {
            "register": "/api/v1/auth/register",
            "login": "/api/v1/auth/login",
            "applications": "/api/v1/applications",
        },
    }))
}

pub(crate) async fn register_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    Json(registration): Json<Registration>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let registration = validate_registration(registration)?;
    let user = run_blocking(move || Ok(portal.identity.register(registration)?)).await?;
    let payload = json!({
        "user": user.view(),
        "message": "Registration successful. Please log in.",
        "redirect": LOGIN_PAGE,
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn login_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    Json(form): Json<LoginForm>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let form = validate_login(form)?;
    let (user, session) = run_blocking(move || {
        let user = portal.identity.authenticate(&form.email, &form.password)?;
        let session = portal.sessions.issue(&user)?;
        Ok((user, session))
    })
    .await?;
    let payload = json!({
        "token": session.token,
        "expires_at": session.expires_at,
        "user": user.view(),
        "redirect": DASHBOARD_PAGE,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

/// Sessions are bearer tokens, so logging out is the client discarding its token.
pub(crate) async fn logout_handler() -> Json<Value> {
    Json(json!({ "redirect": HOME_PAGE }))
}

pub(crate) async fn list_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let (actor, applications) = run_blocking(move || {
        let actor = current_user(&portal, &headers)?;
        let applications = portal.applications.list_visible(&actor)?;
        Ok((actor, applications))
    })
    .await?;
    let payload = json!({
        "role": actor.role.label(),
        "applications": applications,
    });
    Ok((StatusCode::OK, Json(payload)).into_response())
}

pub(crate) async fn submit_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    headers: HeaderMap,
    Json(submission): Json<ApplicationSubmission>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let application = run_blocking(move || {
        let actor = current_user(&portal, &headers)?;
        let submission = validate_submission(submission)?;
        Ok(portal.applications.submit(&actor, submission)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(application)).into_response())
}

pub(crate) async fn get_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    headers: HeaderMap,
    Path(application_id): Path<i64>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let application = run_blocking(move || {
        let actor = current_user(&portal, &headers)?;
        Ok(portal
            .applications
            .get_for(&actor, ApplicationId(application_id))?)
    })
    .await?;
    Ok((StatusCode::OK, Json(application)).into_response())
}

pub(crate) async fn approve_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    headers: HeaderMap,
    Path(application_id): Path<i64>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let application = run_blocking(move || {
        let actor = current_user(&portal, &headers)?;
        Ok(portal
            .applications
            .approve(&actor, ApplicationId(application_id))?)
    })
    .await?;
    Ok((StatusCode::OK, Json(application)).into_response())
}

pub(crate) async fn reject_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    headers: HeaderMap,
    Path(application_id): Path<i64>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let application = run_blocking(move || {
        let actor = current_user(&portal, &headers)?;
        Ok(portal
            .applications
            .reject(&actor, ApplicationId(application_id))?)
    })
    .await?;
    Ok((StatusCode::OK, Json(application)).into_response())
}

pub(crate) async fn pass_handler<R, U>(
    State(portal): SharedPortal<R, U>,
    headers: HeaderMap,
    Path(application_id): Path<i64>,
) -> Result<Response, ApiError>
where
    R: ApplicationRepository + 'static,
    U: UserRepository + 'static,
{
    let document = run_blocking(move || {
        let actor = current_user(&portal, &headers)?;
        Ok(portal
            .applications
            .download_pass(&actor, ApplicationId(application_id))?)
    })
    .await?;
    let disposition = format!("attachment; filename=\"{}\"", document.filename);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response())
}

/// Request failure mapped onto an HTTP status and JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthenticated,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Application(#[from] ApplicationServiceError),
    #[error("background task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Session(SessionError::Encoding(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Session(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Identity(IdentityError::DuplicateIdentity) => StatusCode::CONFLICT,
            ApiError::Identity(IdentityError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Identity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Application(err) => match err {
                ApplicationServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                ApplicationServiceError::Unauthorized => StatusCode::FORBIDDEN,
                ApplicationServiceError::InvalidTransition { .. }
                | ApplicationServiceError::NotApproved(_) => StatusCode::CONFLICT,
                ApplicationServiceError::HolderMissing(_)
                | ApplicationServiceError::Repository(_)
                | ApplicationServiceError::Document(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Background(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let payload = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            json!({ "error": "internal server error" })
        } else if matches!(self, ApiError::Identity(IdentityError::DuplicateIdentity)) {
            json!({
                "error": "Email already registered. Please log in.",
                "redirect": LOGIN_PAGE,
            })
        } else {
            json!({ "error": self.to_string() })
        };

        (status, Json(payload)).into_response()
    }
}
