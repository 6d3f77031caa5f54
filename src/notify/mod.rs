//! Best-effort email notifications.
//!
//! Delivery runs on a detached task bounded by a timeout. Failures are logged
//! and never reach the request that triggered them.

mod smtp;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::store::Store;

pub use smtp::{SmtpConfig, SmtpMailer};

pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(String),
}

/// A mail transport. Implementations deliver one message to every recipient.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), MailError>;
}

pub struct Notifier {
    mailer: Option<Arc<dyn Mailer>>,
    timeout: Duration,
}

impl Notifier {
    #[must_use]
    pub fn new(mailer: Option<Arc<dyn Mailer>>, timeout: Duration) -> Self {
        Self { mailer, timeout }
    }

    /// A notifier with no transport; every dispatch is a silent no-op.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None, DEFAULT_SEND_TIMEOUT)
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.mailer.is_some()
    }

    /// Sends `subject`/`body` to `recipients` on a detached task.
    ///
    /// Returns the task handle, or `None` when there was nothing to do.
    /// Callers on the request path drop the handle.
    pub fn dispatch(
        &self,
        recipients: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Option<JoinHandle<()>> {
        let Some(mailer) = self.mailer.clone() else {
            tracing::debug!("Mail transport not configured, skipping notification");
            return None;
        };
        if recipients.is_empty() {
            return None;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Cannot dispatch notification outside a runtime: {e}");
                return None;
            }
        };

        let subject = subject.into();
        let body = body.into();
        let timeout = self.timeout;

        Some(runtime.spawn(async move {
            match tokio::time::timeout(timeout, mailer.send(&recipients, &subject, &body)).await {
                Ok(Ok(())) => {
                    tracing::info!(recipients = recipients.len(), %subject, "Notification sent");
                }
                Ok(Err(e)) => {
                    tracing::warn!(%subject, "Notification delivery failed: {e}");
                }
                Err(_) => {
                    tracing::warn!(%subject, "Notification delivery timed out after {timeout:?}");
                }
            }
        }))
    }

    /// Notifies every member of a project. Member lookup failures are logged
    /// like delivery failures.
    pub fn notify_project_members(
        &self,
        store: &dyn Store,
        project_id: &str,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }

        let recipients = match store.list_member_emails(project_id) {
            Ok(emails) => emails,
            Err(e) => {
                tracing::warn!("Failed to resolve members of project {project_id}: {e}");
                return None;
            }
        };

        self.dispatch(recipients, subject, body)
    }
}
