use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, PoolConfig},
    Message, SmtpTransport, Transport,
};
use tracing::{info, warn};

use crate::config::MailConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// Hands `mail` to the transport on a background task. Failures are logged only.
pub fn dispatch(mailer: Arc<dyn Mailer>, mail: OutgoingMail) {
    tokio::spawn(async move {
        let recipient = mail.recipient.clone();
        if let Err(e) = mailer.send(mail).await {
            warn!(error = %e, %recipient, "mail delivery failed");
        }
    });
}

/// SMTP relay with STARTTLS/TLS negotiated by lettre.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: String,
}

impl SmtpMailer {
    pub fn new(cfg: &MailConfig) -> anyhow::Result<Self> {
        let transport = SmtpTransport::relay(&cfg.host)
            .context("create SMTP transport")?
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .port(cfg.port)
            .pool_config(PoolConfig::new().max_size(4))
            .timeout(Some(std::time::Duration::from_secs(10)))
            .build();
        Ok(Self {
            transport,
            from: cfg.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse().context("invalid from address")?)
            .to(mail.recipient.parse().context("invalid recipient address")?)
            .subject(mail.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body)
            .context("build message")?;

        // SmtpTransport is blocking.
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("smtp task panicked")?
            .context("smtp send")?;
        info!(recipient = %mail.recipient, "mail sent");
        Ok(())
    }
}

/// Used when no SMTP relay is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        info!(
            recipient = %mail.recipient,
            subject = %mail.subject,
            body = %mail.body,
            "mail transport not configured; logging message instead"
        );
        Ok(())
    }
}

pub fn from_config(cfg: Option<&MailConfig>) -> anyhow::Result<Arc<dyn Mailer>> {
    match cfg {
        Some(cfg) => Ok(Arc::new(SmtpMailer::new(cfg)?)),
        None => {
            warn!("SMTP_HOST not set; outgoing mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Keeps every message in memory so tests can inspect what was sent.
#[derive(Default)]
pub struct RecordingMailer {
    sent: tokio::sync::Mutex<Vec<OutgoingMail>>,
}

impl RecordingMailer {
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().await.push(mail);
        Ok(())
    }
}
