//! Notification event vocabulary
//!
//! Workflow transitions and the scheduled jobs hand these to the dispatcher.
//! Queueing the event is part of the transition; actual delivery is not, and
//! a delivery failure never rolls a transition back.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_error::AppError;

/// Every event the core can emit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum NotificationEvent {
    ExpenseSubmitted {
        expense_id: i64,
        owner_username: String,
        amount: Decimal,
        /// Incremented on resubmission; 0 for a first submission
        resubmitted_count: i32,
    },
    ExpenseApproved {
        expense_id: i64,
        owner_username: String,
        approved_by: String,
    },
    ExpenseRejected {
        expense_id: i64,
        owner_username: String,
        reason: String,
    },
    ExpenseReimbursed {
        expense_id: i64,
        owner_username: String,
    },
    PasswordExpiring {
        username: String,
        days_left: i64,
    },
    PasswordExpired {
        username: String,
    },
    JenkinsBuild {
        job: String,
        status: String,
        url: Option<String>,
    },
    JenkinsDeploy {
        job: String,
        status: String,
        url: Option<String>,
    },
}

impl NotificationEvent {
    /// Stable event-type tag used in logs and message subjects
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::ExpenseSubmitted { .. } => "EXPENSE_SUBMITTED",
            NotificationEvent::ExpenseApproved { .. } => "EXPENSE_APPROVED",
            NotificationEvent::ExpenseRejected { .. } => "EXPENSE_REJECTED",
            NotificationEvent::ExpenseReimbursed { .. } => "EXPENSE_REIMBURSED",
            NotificationEvent::PasswordExpiring { .. } => "PASSWORD_EXPIRING",
            NotificationEvent::PasswordExpired { .. } => "PASSWORD_EXPIRED",
            NotificationEvent::JenkinsBuild { .. } => "JENKINS_BUILD",
            NotificationEvent::JenkinsDeploy { .. } => "JENKINS_DEPLOY",
        }
    }
}

/// Dispatcher boundary.
///
/// Implementations render the event and queue it to the mail sender. Errors
/// surface to the caller only for logging; callers never fail a request on
/// a dispatch error.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent) -> Result<(), AppError>;
}
