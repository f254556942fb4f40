use super::common::*;
use std::sync::Arc;

use chrono::Duration;

use crate::identity::{Registration, Role, User, UserId};
use crate::store::{MemoryStore, RepositoryError};
use crate::workflows::parking::{
    ApplicationId, ApplicationRepository, ApplicationServiceError, ApplicationStatus, Transition,
};

#[test]
fn alice_admin_and_bob_scenario() {
    let fx = fixture();
    let service = &fx.portal.applications;

    let submitted = service.submit(&fx.alice, submission()).expect("submit");
    assert_eq!(submitted.status, ApplicationStatus::Pending);
    assert_eq!(submitted.owner, fx.alice.id);
    assert_eq!(submitted.issued_at, issued_at());
    assert_eq!(submitted.expires_at - submitted.issued_at, Duration::days(30));
    assert_eq!(
        service.list_for_user(fx.alice.id).expect("list"),
        vec![submitted.clone()]
    );

    let approved = service
        .approve(&fx.admin, submitted.id)
        .expect("admin approves");
    assert_eq!(approved.status, ApplicationStatus::Approved);

    let document = service
        .download_pass(&fx.alice, submitted.id)
        .expect("owner downloads");
    assert_eq!(document.filename, format!("pass_{}.pdf", submitted.id));
    assert!(document.bytes.starts_with(b"%PDF-"));

    assert!(matches!(
        service.download_pass(&fx.bob, submitted.id),
        Err(ApplicationServiceError::Unauthorized)
    ));
    assert!(matches!(
        service.get_for(&fx.bob, submitted.id),
        Err(ApplicationServiceError::Unauthorized)
    ));
    assert!(service.download_pass(&fx.admin, submitted.id).is_ok());
}

#[test]
fn pass_issuance_is_recorded_once() {
    let fx = fixture();
    let service = &fx.portal.applications;
    let application = fx.approved_for(&fx.alice);
    assert_eq!(service.issued_pass(application.id).expect("lookup"), None);

    service
        .download_pass(&fx.alice, application.id)
        .expect("first download");
    let first = service
        .issued_pass(application.id)
        .expect("lookup")
        .expect("record written");
    service
        .download_pass(&fx.admin, application.id)
        .expect("second download");
    let second = service
        .issued_pass(application.id)
        .expect("lookup")
        .expect("record kept");

    assert_eq!(first, second);
    assert_eq!(first.pass_number, format!("PP-{:06}", application.id.0));
    assert_eq!(first.document_path, format!("pass_{}.pdf", application.id));
}

#[test]
fn unapproved_pass_is_refused_for_any_caller() {
    let fx = fixture();
    let pending = fx.submit_for(&fx.alice);
    let rejected = fx.submit_for(&fx.alice);
    fx.portal
        .applications
        .reject(&fx.admin, rejected.id)
        .expect("reject");

    for (application, status) in [
        (&pending, ApplicationStatus::Pending),
        (&rejected, ApplicationStatus::Rejected),
    ] {
        for actor in [&fx.alice, &fx.bob, &fx.admin] {
            match fx.portal.applications.download_pass(actor, application.id) {
                Err(ApplicationServiceError::NotApproved(found)) => assert_eq!(found, status),
                other => panic!("expected not approved, got {other:?}"),
            }
        }
        assert_eq!(
            fx.portal
                .applications
                .issued_pass(application.id)
                .expect("lookup"),
            None
        );
    }
}

#[test]
fn staff_cannot_review_and_learn_nothing_about_existence() {
    let fx = fixture();
    let application = fx.submit_for(&fx.alice);

    assert!(matches!(
        fx.portal.applications.approve(&fx.alice, application.id),
        Err(ApplicationServiceError::Unauthorized)
    ));
    assert!(matches!(
        fx.portal.applications.reject(&fx.bob, ApplicationId(999)),
        Err(ApplicationServiceError::Unauthorized)
    ));
    let stored = fx.store.fetch(application.id).expect("fetch").expect("row");
    assert_eq!(stored.status, ApplicationStatus::Pending);
}

#[test]
fn admin_review_of_missing_application_is_not_found() {
    let fx = fixture();
    assert!(matches!(
        fx.portal.applications.approve(&fx.admin, ApplicationId(999)),
        Err(ApplicationServiceError::NotFound(ApplicationId(999)))
    ));
    assert!(matches!(
        fx.portal.applications.download_pass(&fx.admin, ApplicationId(999)),
        Err(ApplicationServiceError::NotFound(_))
    ));
}

#[test]
fn terminal_applications_do_not_transition_again() {
    let fx = fixture();
    let approved = fx.approved_for(&fx.alice);

    match fx.portal.applications.approve(&fx.admin, approved.id) {
        Err(ApplicationServiceError::InvalidTransition { from, transition }) => {
            assert_eq!(from, ApplicationStatus::Approved);
            assert_eq!(transition, Transition::Approve);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }

    let rejected = fx.submit_for(&fx.bob);
    fx.portal
        .applications
        .reject(&fx.admin, rejected.id)
        .expect("reject");
    let err = fx
        .portal
        .applications
        .approve(&fx.admin, rejected.id)
        .unwrap_err();
    assert_eq!(err.to_string(), "cannot approve an application that is already Rejected");
    assert_eq!(
        fx.portal.applications.get(rejected.id).expect("get").status,
        ApplicationStatus::Rejected
    );
}

#[test]
fn concurrent_review_reports_the_status_that_landed() {
    let inner = Arc::new(MemoryStore::new());
    let store = Arc::new(RacingStore {
        inner: inner.clone(),
    });
    let portal = build_portal(store.clone(), store);
    let alice = portal
        .identity
        .register(Registration::new("Alice", "a@x.com", "secret1"))
        .expect("register alice");
    let admin = portal
        .identity
        .register_admin(Registration::new("Admin", "admin@x.com", "admin123"))
        .expect("register admin");
    let application = portal
        .applications
        .submit(&alice, submission())
        .expect("submit");

    match portal.applications.approve(&admin, application.id) {
        Err(ApplicationServiceError::InvalidTransition { from, transition }) => {
            assert_eq!(from, ApplicationStatus::Rejected);
            assert_eq!(transition, Transition::Approve);
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
    let stored = inner.fetch(application.id).expect("fetch").expect("row");
    assert_eq!(stored.status, ApplicationStatus::Rejected);
}

#[test]
fn staff_cannot_tell_missing_from_foreign_applications() {
    let fx = fixture();
    let foreign = fx.submit_for(&fx.alice);

    for id in [foreign.id, ApplicationId(999)] {
        assert!(matches!(
            fx.portal.applications.get_for(&fx.bob, id),
            Err(ApplicationServiceError::Unauthorized)
        ));
    }
    assert!(matches!(
        fx.portal.applications.get_for(&fx.admin, ApplicationId(999)),
        Err(ApplicationServiceError::NotFound(ApplicationId(999)))
    ));
}

#[test]
fn visibility_follows_role() {
    let fx = fixture();
    let alice_first = fx.submit_for(&fx.alice);
    let bob_only = fx.submit_for(&fx.bob);
    let alice_second = fx.submit_for(&fx.alice);

    let own: Vec<_> = fx
        .portal
        .applications
        .list_visible(&fx.alice)
        .expect("list")
        .into_iter()
        .map(|application| application.id)
        .collect();
    assert_eq!(own, vec![alice_first.id, alice_second.id]);

    let all: Vec<_> = fx
        .portal
        .applications
        .list_visible(&fx.admin)
        .expect("list")
        .into_iter()
        .map(|application| application.id)
        .collect();
    assert_eq!(all, vec![alice_first.id, bob_only.id, alice_second.id]);
    assert!(fx
        .portal
        .applications
        .get_for(&fx.admin, bob_only.id)
        .is_ok());
}

#[test]
fn submission_requires_a_stored_owner() {
    let fx = fixture();
    let ghost = User {
        id: UserId(404),
        name: "Ghost".to_string(),
        email: "ghost@x.com".to_string(),
        password_hash: String::new(),
        role: Role::Staff,
    };

    assert!(matches!(
        fx.portal.applications.submit(&ghost, submission()),
        Err(ApplicationServiceError::Repository(RepositoryError::MissingOwner))
    ));
    assert!(fx.portal.applications.list_all().expect("list").is_empty());
}

#[test]
fn repository_outage_surfaces_as_repository_error() {
    let store = Arc::new(UnavailableStore);
    let portal = build_portal(store.clone(), store);
    let fx = fixture();

    assert!(matches!(
        portal.applications.submit(&fx.alice, submission()),
        Err(ApplicationServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert!(matches!(
        portal.applications.approve(&fx.admin, ApplicationId(1)),
        Err(ApplicationServiceError::Repository(_))
    ));
}
