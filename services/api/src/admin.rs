use crate::infra::build_portal;
use clap::Args;
use parking_pass::config::AppConfig;
use parking_pass::error::AppError;
use parking_pass::identity::Registration;
use parking_pass::workflows::parking::validate_registration;
use std::fmt;

#[derive(Args)]
pub(crate) struct AdminCreateArgs {
    /// Display name of the administrator
    #[arg(long)]
    pub(crate) name: String,
    /// Login email of the administrator
    #[arg(long)]
    pub(crate) email: String,
    /// Initial password (at least six characters)
    #[arg(long)]
    pub(crate) password: String,
}

impl fmt::Debug for AdminCreateArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCreateArgs")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub(crate) fn run_admin_create(args: AdminCreateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    if config.storage.sqlite_path().is_none() {
        println!("APP_DATABASE_URL is not set; the account will only live for this process.");
    }

    let portal = build_portal(&config)?;
    let registration =
        validate_registration(Registration::new(args.name, args.email, args.password))?;
    let admin = portal.identity.register_admin(registration)?;

    println!(
        "Created administrator {} <{}> (id {})",
        admin.name, admin.email, admin.id
    );
    Ok(())
}
