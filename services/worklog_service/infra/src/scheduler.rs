//! Scheduled integrity jobs
//!
//! Two background loops per replica: the daily password-expiration scan and
//! the periodic revoked-token GC. Both are idempotent, safe against missed
//! fires (no catch-up), and cancel at iteration boundaries.

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};
use shared_error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use worklog_service_core::domains::auth::domain::model::roles;
use worklog_service_core::domains::auth::domain::repository::{
    RevokedTokenRepository, UserRepository,
};
use worklog_service_core::events::{NotificationEvent, Notifier};

/// Days ahead (inclusive) covered by the expiration warning window
const WARNING_WINDOW_DAYS: i64 = 7;

pub struct Scheduler {
    user_repo: Arc<dyn UserRepository>,
    revoked_repo: Arc<dyn RevokedTokenRepository>,
    notifier: Arc<dyn Notifier>,
    scan_hour: u32,
    gc_interval: Duration,
}

impl Scheduler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        revoked_repo: Arc<dyn RevokedTokenRepository>,
        notifier: Arc<dyn Notifier>,
        scan_hour: u32,
        gc_interval: Duration,
    ) -> Self {
        Self {
            user_repo,
            revoked_repo,
            notifier,
            scan_hour,
            gc_interval,
        }
    }

    /// Start both job loops on the runtime. The handles outlive the caller;
    /// aborting them cancels at the next iteration boundary.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        let Scheduler {
            user_repo,
            revoked_repo,
            notifier,
            scan_hour,
            gc_interval,
        } = self;

        let scan_handle = tokio::spawn(async move {
            loop {
                let wait = until_next_scan(Utc::now(), scan_hour);
                tracing::debug!(seconds = wait.as_secs(), "Password-expiration scan sleeping");
                tokio::time::sleep(wait).await;

                match run_expiration_scan(user_repo.as_ref(), notifier.as_ref()).await {
                    Ok(emitted) => {
                        tracing::info!(emitted, "Password-expiration scan completed");
                    },
                    Err(e) => {
                        // Job failures are logged and skipped, never fatal
                        tracing::error!(error = %e, "Password-expiration scan failed");
                    },
                }
            }
        });

        let gc_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(gc_interval);
            // The immediate first tick would race startup; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match run_revoked_token_gc(revoked_repo.as_ref()).await {
                    Ok(removed) => {
                        tracing::info!(removed, "Revoked-token GC completed");
                    },
                    Err(e) => {
                        tracing::error!(error = %e, "Revoked-token GC failed");
                    },
                }
            }
        });

        vec![scan_handle, gc_handle]
    }
}

/// Time to sleep until the next wall-clock occurrence of `scan_hour`
fn until_next_scan(now: DateTime<Utc>, scan_hour: u32) -> Duration {
    let today_scan = now
        .date_naive()
        .and_hms_opt(scan_hour, 0, 0)
        .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap())
        .and_utc();

    let next = if today_scan > now {
        today_scan
    } else {
        today_scan + ChronoDuration::days(1)
    };

    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}

/// One pass of the password-expiration scan.
///
/// Warns every enabled non-GUEST user whose password expires within the next
/// seven days (inclusive of today), and notifies users whose password went
/// stale yesterday. Emitting is fire-and-forget per user: a failed send never
/// stops the sweep, and re-running the scan the same day re-emits.
pub async fn run_expiration_scan(
    user_repo: &dyn UserRepository,
    notifier: &dyn Notifier,
) -> Result<u32, AppError> {
    let now = Utc::now();
    let from = now - ChronoDuration::days(2);
    let to = now + ChronoDuration::days(WARNING_WINDOW_DAYS + 1);

    let users = user_repo.find_expiring_between(from, to, roles::GUEST).await?;

    let mut emitted = 0u32;
    for user in users {
        let days = user.days_until_password_expires(now);

        let event = if (0..=WARNING_WINDOW_DAYS).contains(&days) {
            NotificationEvent::PasswordExpiring {
                username: user.username.clone(),
                days_left: days,
            }
        } else if days == -1 {
            // Expired-yesterday branch: tell the user their password just
            // went stale.
            NotificationEvent::PasswordExpired {
                username: user.username.clone(),
            }
        } else {
            continue;
        };

        match notifier.notify(event).await {
            Ok(()) => emitted += 1,
            Err(e) => {
                tracing::error!(username = %user.username, error = %e, "Expiration notification failed");
            },
        }
    }

    Ok(emitted)
}

/// One pass of the revoked-token GC
pub async fn run_revoked_token_gc(repo: &dyn RevokedTokenRepository) -> Result<u64, AppError> {
    repo.delete_expired().await
}
