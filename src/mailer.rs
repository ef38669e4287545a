use std::sync::Arc;

use lettre::{
    Message, SmtpTransport, Transport,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::MailConfig;

/// Outbound mail. Without an SMTP host configured messages are only logged,
/// which is what local development and tests use.
#[derive(Clone)]
pub enum Mailer {
    Log,
    Smtp {
        transport: Arc<SmtpTransport>,
        from: Mailbox,
    },
}

impl Mailer {
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let Some(host) = config.smtp_host.as_deref() else {
            return Ok(Mailer::Log);
        };

        let from: Mailbox = config
            .from
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid MAIL_FROM: {e}"))?;

        let mut builder = SmtpTransport::builder_dangerous(host).port(config.smtp_port);
        if let (Some(user), Some(pass)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Mailer::Smtp {
            transport: Arc::new(builder.build()),
            from,
        })
    }

    pub async fn send(&self, to: &str, subject: &str, body: String) -> anyhow::Result<()> {
        match self {
            Mailer::Log => {
                tracing::info!(to, subject, "mail delivery disabled, logging message");
                tracing::debug!(to, body = %body, "mail body");
                Ok(())
            }
            Mailer::Smtp { transport, from } => {
                let to: Mailbox = to
                    .parse()
                    .map_err(|e| anyhow::anyhow!("invalid recipient: {e}"))?;
                let email = Message::builder()
                    .from(from.clone())
                    .to(to)
                    .subject(subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body)?;

                let transport = Arc::clone(transport);
                tokio::task::spawn_blocking(move || transport.send(&email)).await??;
                tracing::info!(subject, "mail sent");
                Ok(())
            }
        }
    }
}
