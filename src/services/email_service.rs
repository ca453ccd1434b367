use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::env;
use std::str::FromStr;
use std::sync::Arc;

const VERIFICATION_SUBJECT: &str = "Verify your email";
const PASSWORD_RESET_SUBJECT: &str = "Reset your password";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Failed to build email message: {0}")]
    MessageBuild(String),
    #[error("Failed to send email: {0}")]
    SendFailed(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub fn verification_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/accounts/verify-email/{}/",
        base_url.trim_end_matches('/'),
        token
    )
}

pub fn password_reset_link(base_url: &str, token: &str) -> String {
    format!(
        "{}/accounts/password-reset-confirm/{}/",
        base_url.trim_end_matches('/'),
        token
    )
}

fn verification_body(link: &str) -> String {
    format!(
        "Click the link below to verify your email address:\n{}\n\nThis link expires in 24 hours.",
        link
    )
}

fn password_reset_body(link: &str) -> String {
    format!(
        "Click the link below to reset your password:\n{}\n\nThis link expires in 1 hour. \
         If you did not request a password reset, you can ignore this email.",
        link
    )
}

/// Notification sender for account emails. Each call reports delivery
/// explicitly; callers decide whether a failure is fatal.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait EmailService: Send + Sync {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), EmailError>;
    async fn send_password_reset_email(&self, to_email: &str, token: &str)
        -> Result<(), EmailError>;
}

/// Logs outgoing account emails instead of delivering them. Stands in for
/// SMTP in development.
pub struct ConsoleEmailService {
    base_url: String,
}

impl ConsoleEmailService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn log(&self, to_email: &str, subject: &str, link: &str) {
        tracing::info!(to = to_email, subject, "📧 [CONSOLE EMAIL] {}", link);
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), EmailError> {
        self.log(
            to_email,
            VERIFICATION_SUBJECT,
            &verification_link(&self.base_url, token),
        );
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        self.log(
            to_email,
            PASSWORD_RESET_SUBJECT,
            &password_reset_link(&self.base_url, token),
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpEncryption {
    Tls,
    StartTls,
    None,
}

impl FromStr for SmtpEncryption {
    type Err = EmailError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "tls" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" => Ok(Self::None),
            other => Err(EmailError::ConfigError(format!(
                "SMTP_ENCRYPTION must be tls, starttls or none, got {}",
                other
            ))),
        }
    }
}

/// SMTP settings read from `SMTP_*` environment variables.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
    pub encryption: SmtpEncryption,
}

fn required(key: &str) -> Result<String, EmailError> {
    env::var(key).map_err(|_| EmailError::ConfigError(format!("{} not set", key)))
}

impl SmtpConfig {
    pub fn from_env() -> Result<Self, EmailError> {
        let port: u16 = match env::var("SMTP_PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| EmailError::ConfigError(format!("Invalid SMTP_PORT: {}", raw)))?,
            Err(_) => 587,
        };

        Ok(Self {
            host: required("SMTP_HOST")?,
            port,
            username: required("SMTP_USERNAME")?,
            password: required("SMTP_PASSWORD")?,
            from_email: required("SMTP_FROM_EMAIL")?,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Bazaar".to_string()),
            encryption: env::var("SMTP_ENCRYPTION")
                .map(|raw| raw.parse())
                .unwrap_or(Ok(SmtpEncryption::StartTls))?,
        })
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let builder = match self.encryption {
            SmtpEncryption::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host),
            SmtpEncryption::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
            }
            SmtpEncryption::None => Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(
                &self.host,
            )),
        }
        .map_err(|e| EmailError::ConfigError(format!("SMTP relay {}: {}", self.host, e)))?;

        Ok(builder
            .port(self.port)
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ))
            .build())
    }
}

pub struct SmtpEmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    base_url: String,
}

impl SmtpEmailService {
    pub fn new(config: &SmtpConfig, base_url: impl Into<String>) -> Result<Self, EmailError> {
        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| EmailError::ConfigError(format!("Invalid SMTP_FROM_EMAIL: {}", e)))?;

        Ok(Self {
            mailer: config.transport()?,
            from,
            base_url: base_url.into(),
        })
    }

    async fn deliver(&self, to_email: &str, subject: &str, body: String) -> Result<(), EmailError> {
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| EmailError::MessageBuild(format!("Invalid recipient {}: {}", to_email, e)))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| EmailError::MessageBuild(e.to_string()))?;

        self.mailer
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| EmailError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl EmailService for SmtpEmailService {
    async fn send_verification_email(&self, to_email: &str, token: &str) -> Result<(), EmailError> {
        let link = verification_link(&self.base_url, token);
        self.deliver(to_email, VERIFICATION_SUBJECT, verification_body(&link))
            .await
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        let link = password_reset_link(&self.base_url, token);
        self.deliver(to_email, PASSWORD_RESET_SUBJECT, password_reset_body(&link))
            .await
    }
}

/// SMTP when `SMTP_HOST` is set and the rest of the configuration is
/// usable, otherwise the console sender.
pub fn create_email_service(base_url: &str) -> Arc<dyn EmailService> {
    if env::var("SMTP_HOST").is_err() {
        tracing::info!("SMTP_HOST not set, account emails will be logged");
        return Arc::new(ConsoleEmailService::new(base_url));
    }

    match SmtpConfig::from_env().and_then(|config| SmtpEmailService::new(&config, base_url)) {
        Ok(service) => {
            tracing::info!("Sending account emails over SMTP");
            Arc::new(service)
        }
        Err(e) => {
            tracing::warn!("SMTP unavailable ({}), falling back to logged emails", e);
            Arc::new(ConsoleEmailService::new(base_url))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_embed_token_under_accounts() {
        assert_eq!(
            verification_link("http://shop.test/", "abc"),
            "http://shop.test/accounts/verify-email/abc/"
        );
        assert_eq!(
            password_reset_link("http://shop.test", "abc"),
            "http://shop.test/accounts/password-reset-confirm/abc/"
        );
    }

    #[test]
    fn test_bodies_contain_link() {
        assert!(verification_body("http://x/l").contains("http://x/l"));
        assert!(password_reset_body("http://x/r").contains("http://x/r"));
    }

    #[test]
    fn test_encryption_parsing() {
        assert_eq!("TLS".parse::<SmtpEncryption>().unwrap(), SmtpEncryption::Tls);
        assert_eq!(" starttls".parse::<SmtpEncryption>().unwrap(), SmtpEncryption::StartTls);
        assert_eq!("none".parse::<SmtpEncryption>().unwrap(), SmtpEncryption::None);
        assert!("ssl".parse::<SmtpEncryption>().is_err());
    }

    #[tokio::test]
    async fn test_console_service_always_delivers() {
        let service = ConsoleEmailService::new("http://localhost:8080");
        assert!(service
            .send_verification_email("a@x.com", "token")
            .await
            .is_ok());
        assert!(service
            .send_password_reset_email("a@x.com", "token")
            .await
            .is_ok());
    }
}
