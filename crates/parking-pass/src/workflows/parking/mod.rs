//! Vehicle parking-pass applications: submission, admin review, and pass issuance.

pub mod clock;
pub mod domain;
pub mod lifecycle;
pub mod pass;
pub mod portal;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    expiry_for, Application, ApplicationId, ApplicationStatus, ApplicationSubmission,
    NewApplication, NewPass, PassRecord, VehicleType, PASS_VALIDITY_DAYS,
};
pub use lifecycle::{authorize, LifecycleError, Transition};
pub use pass::{PassDocument, PassDocumentError, PassDocumentGenerator};
pub use portal::ParkingPortal;
pub use repository::ApplicationRepository;
pub use router::{portal_router, ApiError};
pub use service::{ApplicationServiceError, PassApplicationService};
pub use validation::{
    validate_login, validate_registration, validate_submission, LoginForm, ValidationError,
};
