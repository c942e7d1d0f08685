//! Notification dispatcher
//!
//! Renders events into plain-text mail and queues them to the sender.
//! Dispatch is synchronous with the transition, delivery is not: a send
//! failure is logged as an operational alert and never propagates.

use async_trait::async_trait;
use shared_error::AppError;
use std::sync::Arc;
use worklog_service_core::domains::auth::domain::repository::UserRepository;
use worklog_service_core::events::{NotificationEvent, Notifier};

use super::smtp_sender::EmailSender;

/// Opaque recipient lists from configuration plus per-user profile lookups
pub struct EmailNotifier {
    sender: Arc<dyn EmailSender>,
    user_repo: Arc<dyn UserRepository>,
    /// Administrator addresses (build/deploy events)
    admin_recipients: Vec<String>,
    /// Expense-approver addresses (submission events)
    approver_recipients: Vec<String>,
}

impl EmailNotifier {
    pub fn new(
        sender: Arc<dyn EmailSender>,
        user_repo: Arc<dyn UserRepository>,
        admin_recipients: Vec<String>,
        approver_recipients: Vec<String>,
    ) -> Self {
        Self {
            sender,
            user_repo,
            admin_recipients,
            approver_recipients,
        }
    }

    /// Resolve a user's address; a missing one silently drops the message.
    async fn user_email(&self, username: &str) -> Result<Option<String>, AppError> {
        let email = self
            .user_repo
            .find_by_username(username)
            .await?
            .and_then(|u| u.email);

        if email.is_none() {
            tracing::info!(username = %username, "Notification dropped: user has no email address");
        }

        Ok(email)
    }

    async fn deliver(&self, recipients: &[String], subject: &str, body: &str) {
        if recipients.is_empty() {
            tracing::info!(subject = %subject, "Notification dropped: no recipients configured");
            return;
        }

        for to in recipients {
            if let Err(e) = self.sender.send(to, subject, body).await {
                // Operational alert; the originating request already succeeded
                tracing::error!(to = %to, subject = %subject, error = %e, "Notification delivery failed");
            }
        }
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn notify(&self, event: NotificationEvent) -> Result<(), AppError> {
        let kind = event.kind();
        tracing::debug!(event = kind, "Dispatching notification");

        match &event {
            NotificationEvent::ExpenseSubmitted {
                expense_id,
                owner_username,
                amount,
                resubmitted_count,
            } => {
                let subject = format!("[Worklog] Expense #{} awaiting approval", expense_id);
                let body = templates::expense_submitted(
                    *expense_id,
                    owner_username,
                    &amount.to_string(),
                    *resubmitted_count,
                );
                self.deliver(&self.approver_recipients, &subject, &body).await;
            },
            NotificationEvent::ExpenseApproved {
                expense_id,
                owner_username,
                approved_by,
            } => {
                if let Some(to) = self.user_email(owner_username).await? {
                    let subject = format!("[Worklog] Expense #{} approved", expense_id);
                    let body = templates::expense_approved(*expense_id, owner_username, approved_by);
                    self.deliver(&[to], &subject, &body).await;
                }
            },
            NotificationEvent::ExpenseRejected {
                expense_id,
                owner_username,
                reason,
            } => {
                if let Some(to) = self.user_email(owner_username).await? {
                    let subject = format!("[Worklog] Expense #{} rejected", expense_id);
                    let body = templates::expense_rejected(*expense_id, owner_username, reason);
                    self.deliver(&[to], &subject, &body).await;
                }
            },
            NotificationEvent::ExpenseReimbursed {
                expense_id,
                owner_username,
            } => {
                if let Some(to) = self.user_email(owner_username).await? {
                    let subject = format!("[Worklog] Expense #{} reimbursed", expense_id);
                    let body = templates::expense_reimbursed(*expense_id, owner_username);
                    self.deliver(&[to], &subject, &body).await;
                }
            },
            NotificationEvent::PasswordExpiring {
                username,
                days_left,
            } => {
                if let Some(to) = self.user_email(username).await? {
                    let subject = "[Worklog] Your password expires soon".to_string();
                    let body = templates::password_expiring(username, *days_left);
                    self.deliver(&[to], &subject, &body).await;
                }
            },
            NotificationEvent::PasswordExpired { username } => {
                if let Some(to) = self.user_email(username).await? {
                    let subject = "[Worklog] Your password has expired".to_string();
                    let body = templates::password_expired(username);
                    self.deliver(&[to], &subject, &body).await;
                }
            },
            NotificationEvent::JenkinsBuild { job, status, url }
            | NotificationEvent::JenkinsDeploy { job, status, url } => {
                let subject = format!("[Worklog CI] {} {}: {}", job, kind, status);
                let body = templates::jenkins_event(kind, job, status, url.as_deref());
                self.deliver(&self.admin_recipients, &subject, &body).await;
            },
        }

        Ok(())
    }
}

/// Plain-text message bodies
pub mod templates {
    pub fn expense_submitted(
        expense_id: i64,
        owner: &str,
        amount: &str,
        resubmitted_count: i32,
    ) -> String {
        let verb = if resubmitted_count > 0 {
            "resubmitted"
        } else {
            "submitted"
        };
        format!(
            r#"Expense #{expense_id} has been {verb} by {owner} and is awaiting approval.

Amount: {amount}

Please review it in Worklog.

---
Worklog
This is an automated message, please do not reply."#
        )
    }

    pub fn expense_approved(expense_id: i64, owner: &str, approved_by: &str) -> String {
        format!(
            r#"Hello {owner},

Your expense #{expense_id} has been approved by {approved_by}.

Reimbursement will follow once processed.

---
Worklog
This is an automated message, please do not reply."#
        )
    }

    pub fn expense_rejected(expense_id: i64, owner: &str, reason: &str) -> String {
        format!(
            r#"Hello {owner},

Your expense #{expense_id} has been rejected.

Reason: {reason}

You can correct and resubmit it in Worklog.

---
Worklog
This is an automated message, please do not reply."#
        )
    }

    pub fn expense_reimbursed(expense_id: i64, owner: &str) -> String {
        format!(
            r#"Hello {owner},

Your expense #{expense_id} has been reimbursed.

---
Worklog
This is an automated message, please do not reply."#
        )
    }

    pub fn password_expiring(username: &str, days_left: i64) -> String {
        let when = match days_left {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {} days", n),
        };
        format!(
            r#"Hello {username},

Your Worklog password expires {when}. Please sign in and change it before it
expires to avoid interruption.

---
Worklog
This is an automated message, please do not reply."#
        )
    }

    pub fn password_expired(username: &str) -> String {
        format!(
            r#"Hello {username},

Your Worklog password has expired. You will be asked to set a new one at your
next sign-in.

---
Worklog
This is an automated message, please do not reply."#
        )
    }

    pub fn jenkins_event(kind: &str, job: &str, status: &str, url: Option<&str>) -> String {
        let link = url.map(|u| format!("\nDetails: {}", u)).unwrap_or_default();
        format!(
            r#"{kind} notification from CI.

Job: {job}
Status: {status}{link}

---
Worklog
This is an automated message, please do not reply."#
        )
    }
}
