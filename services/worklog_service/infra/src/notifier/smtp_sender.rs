//! SMTP mail sender implementation using the lettre crate
//!
//! The core neither knows nor cares what sits behind `send`; an unconfigured
//! host disables real delivery and logs the message instead, which is the
//! development default.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use shared_error::AppError;

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub use_tls: bool,
}

impl SmtpConfig {
    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }

    pub fn from_config(config: &shared_config::Config) -> Self {
        Self {
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            username: config.smtp_username.clone(),
            password: config.smtp_password.clone(),
            from_email: config.smtp_from_email.clone(),
            from_name: config.smtp_from_name.clone(),
            use_tls: config.smtp_use_tls,
        }
    }
}

/// Mail sender boundary: one abstract operation.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;

    fn is_available(&self) -> bool;
}

/// SMTP mail sender
pub struct SmtpEmailSender {
    config: SmtpConfig,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpEmailSender {
    pub fn new(config: SmtpConfig) -> Result<Self, AppError> {
        if !config.is_configured() {
            tracing::warn!("SMTP not configured - mail delivery disabled");
            return Ok(Self {
                config,
                transport: None,
            });
        }

        let transport = Self::build_transport(&config)?;

        tracing::info!(
            host = %config.host,
            port = %config.port,
            tls = %config.use_tls,
            "SMTP mail sender initialized"
        );

        Ok(Self {
            config,
            transport: Some(transport),
        })
    }

    fn build_transport(
        config: &SmtpConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, AppError> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host).map_err(|e| {
                AppError::Internal(format!("Failed to create SMTP transport: {}", e))
            })?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };

        builder = builder.port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn build_message(&self, to: &str, subject: &str, body: &str) -> Result<Message, AppError> {
        let from_mailbox: Mailbox =
            format!("{} <{}>", self.config.from_name, self.config.from_email)
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|e| AppError::InvalidInput(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let transport = match &self.transport {
            Some(t) => t,
            None => {
                tracing::info!(
                    to = %to,
                    subject = %subject,
                    "[DEV] Email would be sent (SMTP not configured)"
                );
                return Ok(());
            },
        };

        let message = self.build_message(to, subject, body)?;

        match transport.send(message).await {
            Ok(response) => {
                tracing::info!(
                    to = %to,
                    subject = %subject,
                    code = ?response.code(),
                    "Email sent"
                );
                Ok(())
            },
            Err(e) => {
                tracing::error!(
                    to = %to,
                    subject = %subject,
                    error = %e,
                    "Failed to send email"
                );
                Err(AppError::Internal(format!("Failed to send email: {}", e)))
            },
        }
    }

    fn is_available(&self) -> bool {
        self.transport.is_some()
    }
}
