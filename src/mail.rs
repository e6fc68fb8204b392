//! Outgoing e-mail.
//!
//! Two messages exist: the password reset code sent to a user and the
//! contact form forwarded to the support inbox. Both are multipart
//! plain text + HTML and go out through STARTTLS SMTP.

use async_trait::async_trait;
use html_escape::encode_text;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use crate::{
    config::SmtpConfig, db::RESET_CODE_TTL_MINUTES, error::ApiError, types::ContactRequest,
};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Email service is not configured")]
    NotConfigured,

    #[error("Invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        tracing::error!("Mail delivery failed: {}", e);
        match e {
            MailError::NotConfigured => ApiError::upstream("Email service is not configured"),
            _ => ApiError::upstream("Failed to send email. Please try again later"),
        }
    }
}

/// A message ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMail {
    pub to: String,
    pub reply_to: Option<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Whether credentials are present; sending fails otherwise.
    fn is_configured(&self) -> bool;

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

pub struct SmtpMailer {
    sender: Option<Mailbox>,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    /// Prepares the SMTP transport. Without credentials the mailer is
    /// created unconfigured and every send fails with
    /// [`MailError::NotConfigured`].
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let (Some(username), Some(password), Some(sender)) = (
            config.username.as_ref(),
            config.password.as_ref(),
            config.sender_address(),
        ) else {
            tracing::warn!("SMTP credentials missing; mail delivery disabled");
            return Ok(Self {
                sender: None,
                transport: None,
            });
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(username.clone(), password.clone()))
            .build();

        Ok(Self {
            sender: Some(format!("Ánima <{sender}>").parse()?),
            transport: Some(transport),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let (Some(transport), Some(sender)) = (self.transport.as_ref(), self.sender.clone()) else {
            return Err(MailError::NotConfigured);
        };

        let mut builder = Message::builder()
            .from(sender)
            .to(mail.to.parse()?)
            .subject(&mail.subject);
        if let Some(reply_to) = &mail.reply_to {
            builder = builder.reply_to(reply_to.parse()?);
        }
        let message = builder.multipart(MultiPart::alternative_plain_html(mail.text, mail.html))?;

        transport.send(message).await?;
        tracing::info!("Email sent to {}: {}", mail.to, mail.subject);
        Ok(())
    }
}

/// Password recovery e-mail carrying a 6-digit code.
pub fn reset_code_mail(to: &str, name: &str, code: &str) -> OutgoingMail {
    let text = format!(
        "Hi {name},\n\n\
         We received a request to reset your Ánima password.\n\n\
         Your recovery code is: {code}\n\n\
         The code is valid for {RESET_CODE_TTL_MINUTES} minutes.\n\n\
         If you did not request it, you can ignore this email.\n\n\
         The Ánima team"
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h1 style="color: #3a1de1;">Reset your password</h1>
    <p>Hi <strong>{name}</strong>,</p>
    <p>We received a request to reset your Ánima password.</p>
    <p style="font-size: 32px; font-weight: 800; letter-spacing: 8px; color: #3a1de1;">{code}</p>
    <p style="color: #ef4444;">Valid for {RESET_CODE_TTL_MINUTES} minutes.</p>
    <p>If you did not request this code, you can ignore this email. Your account is safe.</p>
    <hr>
    <p style="font-size: 12px; color: #9ca3af;">Ánima - music that matches how you feel</p>
  </body>
</html>"#,
        name = encode_text(name),
    );

    OutgoingMail {
        to: to.to_string(),
        reply_to: None,
        subject: "Your Ánima recovery code".to_string(),
        text,
        html,
    }
}

/// Contact form message addressed to the support inbox, replying to the
/// sender.
pub fn contact_mail(support: &str, req: &ContactRequest) -> OutgoingMail {
    let text = format!(
        "New contact form message\n\n\
         Name: {}\n\
         Email: {}\n\
         Subject: {}\n\n\
         {}",
        req.name, req.email, req.subject, req.message
    );

    let html = format!(
        r#"<!DOCTYPE html>
<html>
  <body style="font-family: sans-serif; color: #333; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #3a1de1;">New contact form message</h2>
    <p><strong>Name:</strong> {name}</p>
    <p><strong>Email:</strong> {email}</p>
    <p><strong>Subject:</strong> {subject}</p>
    <div style="white-space: pre-wrap; background: #f3f4f6; padding: 16px; border-radius: 8px;">{message}</div>
  </body>
</html>"#,
        name = encode_text(&req.name),
        email = encode_text(&req.email),
        subject = encode_text(&req.subject),
        message = encode_text(&req.message),
    );

    OutgoingMail {
        to: support.to_string(),
        reply_to: Some(req.email.clone()),
        subject: format!("[Ánima Contact] {}", req.subject),
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact() -> ContactRequest {
        ContactRequest {
            name: "Ana <b>".to_string(),
            email: "ana@example.com".to_string(),
            subject: "Hello there".to_string(),
            message: "I love the playlists!".to_string(),
        }
    }

    #[test]
    fn test_reset_code_mail() {
        let mail = reset_code_mail("bob@example.com", "Bob", "123456");
        assert_eq!(mail.to, "bob@example.com");
        assert!(mail.reply_to.is_none());
        assert!(mail.text.contains("123456"));
        assert!(mail.html.contains("123456"));
        assert!(mail.text.contains("30 minutes"));
    }

    #[test]
    fn test_contact_mail_replies_to_sender() {
        let mail = contact_mail("support@example.com", &contact());
        assert_eq!(mail.to, "support@example.com");
        assert_eq!(mail.reply_to.as_deref(), Some("ana@example.com"));
        assert_eq!(mail.subject, "[Ánima Contact] Hello there");
        assert!(mail.html.contains("Ana &lt;b&gt;"));
        assert!(mail.text.contains("I love the playlists!"));
    }

    #[test]
    fn test_user_text_is_escaped_in_html_only() {
        let mail = reset_code_mail("bob@example.com", "Bob & <i>Co</i>", "123456");
        assert!(mail.html.contains("Bob &amp; &lt;i&gt;Co&lt;/i&gt;"));
        assert!(mail.text.contains("Bob & <i>Co</i>"));

        let req = ContactRequest {
            message: "<script>alert(1)</script> & more".to_string(),
            ..contact()
        };
        let mail = contact_mail("support@example.com", &req);
        assert!(!mail.html.contains("<script>"));
        assert!(mail.html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_refuses_to_send() {
        let config = SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: None,
            password: None,
            sender: None,
            support_email: None,
        };
        let mailer = SmtpMailer::new(&config).unwrap();
        assert!(!mailer.is_configured());
        let err = mailer
            .send(reset_code_mail("a@example.com", "A", "000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NotConfigured));
    }
}
