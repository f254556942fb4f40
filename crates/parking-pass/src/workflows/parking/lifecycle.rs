//! Allowed status transitions and who may trigger them.
//!
//! ```text
//! Pending --approve--> Approved   [admin]
//! Pending --reject-->  Rejected   [admin]
//! ```

use serde::{Deserialize, Serialize};

use super::domain::ApplicationStatus;
use crate::identity::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Approve,
    Reject,
}

impl Transition {
    pub const fn label(self) -> &'static str {
        match self {
            Transition::Approve => "approve",
            Transition::Reject => "reject",
        }
    }

    pub const fn target(self) -> ApplicationStatus {
        match self {
            Transition::Approve => ApplicationStatus::Approved,
            Transition::Reject => ApplicationStatus::Rejected,
        }
    }

    /// Next status when this transition fires from `from`. Terminal states never move.
    pub fn apply(self, from: ApplicationStatus) -> Result<ApplicationStatus, LifecycleError> {
        if from.is_terminal() {
            return Err(LifecycleError::InvalidTransition {
                from,
                transition: self,
            });
        }
        Ok(self.target())
    }
}

/// Only admins may approve or reject.
pub fn authorize(actor: &User, transition: Transition) -> Result<(), LifecycleError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(LifecycleError::Unauthorized { transition })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("{} requires an administrator", transition.label())]
    Unauthorized { transition: Transition },
    #[error("cannot {} an application that is already {}", transition.label(), from.label())]
    InvalidTransition {
        from: ApplicationStatus,
        transition: Transition,
    },
}
