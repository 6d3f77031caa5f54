//! SMTP delivery through lettre's async transport.
//!
//! [`SmtpConfig::from_env`] returns `None` when `SMTP_HOST` is unset, which
//! leaves mail disabled for the whole process.

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{MailError, Mailer};

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@vialog.local";

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub from_address: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl SmtpConfig {
    /// Loads configuration from environment variables.
    ///
    /// | Variable        | Required | Default                 |
    /// |-----------------|----------|-------------------------|
    /// | `SMTP_HOST`     | yes      |                         |
    /// | `SMTP_PORT`     | no       | `587`                   |
    /// | `SMTP_FROM`     | no       | `noreply@vialog.local`  |
    /// | `SMTP_USER`     | no       |                         |
    /// | `SMTP_PASSWORD` | no       |                         |
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SMTP_HOST").ok().filter(|h| !h.is_empty())?;
        Some(Self {
            host,
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            user: std::env::var("SMTP_USER").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

pub struct SmtpMailer {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let from: Mailbox = config.from_address.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port);

        if let (Some(user), Some(pass)) = (&config.user, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            from,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), MailError> {
        // Members are blind-copied so addresses are not disclosed to each other.
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);

        let mailboxes = deliverable(recipients);
        if mailboxes.is_empty() {
            return Err(MailError::Build("no deliverable recipients".to_string()));
        }
        for mailbox in mailboxes {
            builder = builder.bcc(mailbox);
        }

        let message = builder
            .body(body.to_string())
            .map_err(|e| MailError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Parses recipients, dropping the ones that are not valid addresses so a
/// single bad row cannot block delivery to everyone else.
fn deliverable(recipients: &[String]) -> Vec<Mailbox> {
    recipients
        .iter()
        .filter_map(|recipient| match recipient.parse::<Address>() {
            Ok(address) => Some(Mailbox::new(None, address)),
            Err(e) => {
                tracing::warn!(%recipient, "Skipping undeliverable recipient: {e}");
                None
            }
        })
        .collect()
}
