use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{User, UserId};

/// Days a pass stays valid after the application is issued.
pub const PASS_VALIDITY_DAYS: i64 = 30;

/// Store-generated identifier for a pass application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub i64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    #[serde(rename = "Four-Wheeler", alias = "Car")]
    FourWheeler,
    #[serde(rename = "Two-Wheeler", alias = "Bike")]
    TwoWheeler,
}

impl VehicleType {
    pub const fn label(self) -> &'static str {
        match self {
            VehicleType::FourWheeler => "Four-Wheeler",
            VehicleType::TwoWheeler => "Two-Wheeler",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "four-wheeler" | "car" => Some(VehicleType::FourWheeler),
            "two-wheeler" | "bike" => Some(VehicleType::TwoWheeler),
            _ => None,
        }
    }
}

/// Lifecycle status. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(ApplicationStatus::Pending),
            "Approved" => Some(ApplicationStatus::Approved),
            "Rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

/// Applicant supplied fields for a new pass application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationSubmission {
    pub vehicle_number: String,
    pub vehicle_type: VehicleType,
    pub mobile_number: String,
}

/// Row to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApplication {
    pub owner: UserId,
    pub vehicle_number: String,
    pub vehicle_type: VehicleType,
    pub mobile_number: String,
    pub status: ApplicationStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewApplication {
    /// A pending application issued at `issued_at`, expiring [`PASS_VALIDITY_DAYS`] later.
    pub fn pending(
        owner: UserId,
        submission: ApplicationSubmission,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            owner,
            vehicle_number: submission.vehicle_number,
            vehicle_type: submission.vehicle_type,
            mobile_number: submission.mobile_number,
            status: ApplicationStatus::Pending,
            issued_at,
            expires_at: expiry_for(issued_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub owner: UserId,
    pub vehicle_number: String,
    pub vehicle_type: VehicleType,
    pub mobile_number: String,
    pub status: ApplicationStatus,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Application {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.owner == user.id
    }

    /// Owners and admins may read an application and download its pass.
    pub fn is_visible_to(&self, user: &User) -> bool {
        user.is_admin() || self.is_owned_by(user)
    }
}

pub fn expiry_for(issued_at: DateTime<Utc>) -> DateTime<Utc> {
    issued_at + Duration::days(PASS_VALIDITY_DAYS)
}

/// Issuance record written the first time an approved pass is downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    pub id: i64,
    pub application_id: ApplicationId,
    pub pass_number: String,
    pub document_path: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPass {
    pub application_id: ApplicationId,
    pub pass_number: String,
    pub document_path: String,
    pub generated_at: DateTime<Utc>,
}
