//! Transactional email over SMTP.

use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use log::info;
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from_address: String,
}

impl Mailer {
    pub fn new(config: Option<&SmtpConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };

        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport: Some(transport),
            from_address: config.from_address.clone(),
        })
    }

    /// A mailer that writes outgoing mail to the log, for local development.
    pub fn log_only() -> Self {
        Self {
            transport: None,
            from_address: "noreply@marketplace.local".to_string(),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| MailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        match &self.transport {
            Some(transport) => {
                transport.send(email).await?;
                info!("Email sent to {} ({})", to, subject);
            }
            None => info!("SMTP not configured, email to {} ({}):\n{}", to, subject, body),
        }
        Ok(())
    }
}

pub fn activation_email(name: &str, activation_url: &str) -> String {
    format!("Hello {name}, please click on the link to activate your account: {activation_url}")
}

pub fn withdraw_requested_email(name: &str, amount: f64) -> String {
    format!(
        "Hello {name}, Your withdraw request of {amount}$ is processing. It will take 3days to 7days to processing! "
    )
}

pub fn withdraw_settled_email(name: &str, amount: f64) -> String {
    format!(
        "Hello {name}, Your withdraw request of {amount}$ is on the way. Delivery time depends on your bank's rules it usually takes 3days to 7days."
    )
}
