//! Form-level checks applied before requests reach the services.

use serde::Deserialize;

use super::domain::ApplicationSubmission;
use crate::identity::{normalize_email, Registration};

pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 150;
/// Counted after trimming.
pub const MAX_VEHICLE_NUMBER_LENGTH: usize = 20;
const MOBILE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("mobile number must contain 7 to 15 digits")]
    InvalidMobile,
}

/// Login form payload.
#[derive(Clone, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(())
    }
}

fn at_most(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(())
    }
}

fn validate_email(email: &str) -> Result<String, ValidationError> {
    required("email", email)?;
    let email = normalize_email(email);
    at_most("email", &email, MAX_EMAIL_LENGTH)?;
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    let domain_ok = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));
    if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

pub fn validate_registration(registration: Registration) -> Result<Registration, ValidationError> {
    required("name", &registration.name)?;
    let name = registration.name.trim();
    at_most("name", name, MAX_NAME_LENGTH)?;
    let email = validate_email(&registration.email)?;
    required("password", &registration.password)?;
    if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    Ok(Registration {
        name: name.to_string(),
        email,
        password: registration.password,
    })
}

pub fn validate_login(form: LoginForm) -> Result<LoginForm, ValidationError> {
    let email = validate_email(&form.email)?;
    required("password", &form.password)?;
    Ok(LoginForm {
        email,
        password: form.password,
    })
}

/// Trims fields and uppercases the vehicle number.
pub fn validate_submission(
    submission: ApplicationSubmission,
) -> Result<ApplicationSubmission, ValidationError> {
    required("vehicle_number", &submission.vehicle_number)?;
    required("mobile_number", &submission.mobile_number)?;
    let vehicle_number = submission.vehicle_number.trim();
    at_most("vehicle_number", vehicle_number, MAX_VEHICLE_NUMBER_LENGTH)?;

    let mobile = submission.mobile_number.trim();
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    if !digits.chars().all(|ch| ch.is_ascii_digit()) || !MOBILE_DIGITS.contains(&digits.len()) {
        return Err(ValidationError::InvalidMobile);
    }

    Ok(ApplicationSubmission {
        vehicle_number: vehicle_number.to_uppercase(),
        vehicle_type: submission.vehicle_type,
        mobile_number: mobile.to_string(),
    })
}
