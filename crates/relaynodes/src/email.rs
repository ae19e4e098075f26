use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use relaycore::action::EMAIL_ACTION;
use relaycore::{ActionContext, ActionError, ActionExecutor, ActionOutput, EmailAction};
use relayruntime::{ExecutorFactory, ExecutorMetadata};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct MailError(pub String);

/// One plain-text email, fields passed through from the node as-is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl From<EmailAction> for OutgoingMail {
    fn from(action: EmailAction) -> Self {
        Self {
            to: action.to,
            subject: action.subject,
            body: action.body,
        }
    }
}

/// Outbound mail channel used by email nodes
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// SMTP settings, read from `SMTP_*` environment variables
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            from: None,
        }
    }
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let port = match var("SMTP_PORT").map(|p| p.parse::<u16>()) {
            Some(Ok(port)) => port,
            Some(Err(e)) => {
                tracing::warn!("Ignoring invalid SMTP_PORT: {}", e);
                Self::default().port
            }
            None => Self::default().port,
        };

        Self {
            host: var("SMTP_HOST"),
            port,
            username: var("SMTP_USER"),
            password: var("SMTP_PASS"),
            from: var("SMTP_FROM"),
        }
    }
}

/// SMTP transport with opportunistic STARTTLS
pub struct SmtpTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Option<String>,
}

impl SmtpTransport {
    pub fn connect(config: &SmtpConfig) -> Result<Self, MailError> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| MailError("SMTP host not configured".to_string()))?;
        let tls = TlsParameters::new(host.to_string()).map_err(|e| MailError(e.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(config.port)
            .tls(Tls::Opportunistic(tls));
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        tracing::debug!("Opened SMTP transport to {}:{}", host, config.port);

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl MailTransport for SmtpTransport {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = build_message(self.from.as_deref(), &mail)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError(e.to_string()))?;
        Ok(())
    }
}

/// Build the message; a missing sender or recipient is rejected here.
fn build_message(from: Option<&str>, mail: &OutgoingMail) -> Result<Message, MailError> {
    let mut builder = Message::builder().header(ContentType::TEXT_PLAIN);

    if let Some(from) = from {
        builder = builder.from(parse_mailbox(from)?);
    }
    if let Some(to) = &mail.to {
        for address in to.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            builder = builder.to(parse_mailbox(address)?);
        }
    }
    if let Some(subject) = &mail.subject {
        builder = builder.subject(subject.as_str());
    }

    builder
        .body(mail.body.clone().unwrap_or_default())
        .map_err(|e| MailError(e.to_string()))
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse()
        .map_err(|e| MailError(format!("invalid address {}: {}", address, e)))
}

/// Executor for `email` nodes
pub struct EmailExecutor {
    transport: Arc<dyn MailTransport>,
}

impl EmailExecutor {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ActionExecutor for EmailExecutor {
    fn node_type(&self) -> &str {
        EMAIL_ACTION
    }

    async fn execute(&self, ctx: ActionContext) -> Result<ActionOutput, ActionError> {
        let action = EmailAction::from_fields(&ctx.fields);

        ctx.events.info(format!(
            "Sending email to {}",
            action.to.as_deref().unwrap_or("(no recipient)")
        ));

        self.transport
            .send(action.into())
            .await
            .map_err(|e| ActionError::Email(e.to_string()))?;

        Ok(ActionOutput::new())
    }
}

enum TransportSource {
    Smtp(SmtpConfig),
    Shared(Arc<dyn MailTransport>),
}

/// Opens a mail transport for every run that contains email nodes
pub struct EmailExecutorFactory {
    source: TransportSource,
}

impl EmailExecutorFactory {
    pub fn smtp(config: SmtpConfig) -> Self {
        Self {
            source: TransportSource::Smtp(config),
        }
    }

    /// Reuse one transport for every run
    pub fn with_transport(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            source: TransportSource::Shared(transport),
        }
    }
}

impl ExecutorFactory for EmailExecutorFactory {
    fn create(&self) -> Result<Box<dyn ActionExecutor>, ActionError> {
        let transport: Arc<dyn MailTransport> = match &self.source {
            TransportSource::Smtp(config) => Arc::new(
                SmtpTransport::connect(config).map_err(|e| ActionError::Email(e.to_string()))?,
            ),
            TransportSource::Shared(transport) => Arc::clone(transport),
        };
        Ok(Box::new(EmailExecutor::new(transport)))
    }

    fn node_type(&self) -> &str {
        EMAIL_ACTION
    }

    fn metadata(&self) -> ExecutorMetadata {
        ExecutorMetadata {
            description: "Send a plain-text email (To, Subject, Body)".to_string(),
            category: "email".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail(to: Option<&str>) -> OutgoingMail {
        OutgoingMail {
            to: to.map(str::to_string),
            subject: Some("Build finished".to_string()),
            body: Some("All green".to_string()),
        }
    }

    #[test]
    fn test_build_message_formats_plain_text() {
        let message = build_message(
            Some("Relay <relay@example.test>"),
            &mail(Some("ops@example.test, dev@example.test")),
        )
        .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: Build finished"));
        assert!(raw.contains("ops@example.test"));
        assert!(raw.contains("dev@example.test"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("All green"));
    }

    #[test]
    fn test_missing_recipient_is_rejected() {
        assert!(build_message(Some("relay@example.test"), &mail(None)).is_err());
    }

    #[test]
    fn test_missing_sender_is_rejected() {
        assert!(build_message(None, &mail(Some("ops@example.test"))).is_err());
    }

    #[test]
    fn test_invalid_address_names_it() {
        let err = build_message(Some("relay@example.test"), &mail(Some("not an address")))
            .unwrap_err();
        assert!(err.0.contains("not an address"));
    }

    #[test]
    fn test_connect_requires_host() {
        let err = SmtpTransport::connect(&SmtpConfig::default()).err().unwrap();
        assert_eq!(err.0, "SMTP host not configured");
    }

    #[test]
    fn test_factory_without_host_fails_as_email_error() {
        let factory = EmailExecutorFactory::smtp(SmtpConfig::default());
        let err = factory.create().err().unwrap();
        assert_eq!(err.to_string(), "EmailError: SMTP host not configured");
    }
}
