use async_trait::async_trait;
use tracing::info;

/// Outgoing transactional email.
#[derive(Debug, Clone)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> anyhow::Result<()>;
}

/// Writes emails to the log instead of delivering them. Bodies carry tokens, so only the
/// envelope is logged unless `show_body` is set.
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    show_body: bool,
}

impl LogMailer {
    pub fn new(show_body: bool) -> Self {
        Self { show_body }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> anyhow::Result<()> {
        anyhow::ensure!(!email.to.is_empty(), "email recipient is required");
        if self.show_body {
            info!(from = %email.from, to = %email.to, subject = %email.subject, body = %email.text, "email");
        } else {
            info!(from = %email.from, to = %email.to, subject = %email.subject, "email");
        }
        Ok(())
    }
}
