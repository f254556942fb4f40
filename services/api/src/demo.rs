use chrono::Duration;
use clap::Args;
use parking_pass::error::AppError;
use parking_pass::identity::{Registration, SessionManager};
use parking_pass::store::MemoryStore;
use parking_pass::workflows::parking::{
    validate_submission, ApplicationSubmission, ParkingPortal, VehicleType,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Where to write the generated pass PDF.
    #[arg(long, default_value = "pass_demo.pdf")]
    pub(crate) output: PathBuf,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = Arc::new(MemoryStore::new());
    let portal = ParkingPortal::new(
        store.clone(),
        store,
        SessionManager::new("parking-pass-demo", Duration::minutes(5)),
    );

    println!("Parking pass demo (in-memory store)");
    let alice = portal
        .identity
        .register(Registration::new("Alice", "alice@example.com", "secret1"))?;
    let bob = portal
        .identity
        .register(Registration::new("Bob", "bob@example.com", "secret2"))?;
    let admin = portal.identity.register_admin(Registration::new(
        "Administrator",
        "admin@example.com",
        "admin123",
    ))?;
    println!(
        "- Registered {} ({}), {} ({}), {} ({})",
        alice.name,
        alice.role.label(),
        bob.name,
        bob.role.label(),
        admin.name,
        admin.role.label()
    );

    let submission = validate_submission(ApplicationSubmission {
        vehicle_number: "ka01ab1234".to_string(),
        vehicle_type: VehicleType::FourWheeler,
        mobile_number: "9999999999".to_string(),
    })?;
    let application = portal.applications.submit(&alice, submission)?;
    println!(
        "- {} submitted application {} for {} ({}) -> {}",
        alice.name,
        application.id,
        application.vehicle_number,
        application.vehicle_type.label(),
        application.status.label()
    );
    println!(
        "  Valid {} to {}",
        application.issued_at.format("%m/%d/%Y"),
        application.expires_at.format("%m/%d/%Y")
    );

    if let Err(err) = portal.applications.download_pass(&alice, application.id) {
        println!("- Download before review refused: {err}");
    }
    if let Err(err) = portal.applications.approve(&bob, application.id) {
        println!("- {} tried to approve: {err}", bob.name);
    }

    let approved = portal.applications.approve(&admin, application.id)?;
    println!(
        "- {} approved application {} -> {}",
        admin.name,
        approved.id,
        approved.status.label()
    );
    if let Err(err) = portal.applications.reject(&admin, application.id) {
        println!("- Second review refused: {err}");
    }

    let document = portal.applications.download_pass(&alice, application.id)?;
    std::fs::write(&args.output, &document.bytes)?;
    println!(
        "- {} downloaded {} ({} bytes) to {}",
        alice.name,
        document.pass_number,
        document.bytes.len(),
        args.output.display()
    );

    if let Err(err) = portal.applications.download_pass(&bob, application.id) {
        println!("- {} tried to download Alice's pass: {err}", bob.name);
    }
    if let Some(record) = portal.applications.issued_pass(application.id)? {
        println!(
            "- Issuance recorded as {} at {}",
            record.document_path,
            record.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_writes_the_pass_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = dir.path().join("pass_demo.pdf");

        run_demo(DemoArgs {
            output: output.clone(),
        })
        .expect("demo runs");

        let bytes = std::fs::read(&output).expect("pdf written");
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
