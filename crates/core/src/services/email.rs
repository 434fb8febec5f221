//! Email service for transactional mail (password resets).

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use rhythme_common::{AppError, AppResult, config::EmailConfig};

/// Email service. When no SMTP host is configured, sends are logged and
/// skipped so development environments work without a mail provider.
#[derive(Clone)]
pub struct EmailService {
    config: Option<EmailConfig>,
    server_url: String,
}

impl EmailService {
    /// Create a new email service.
    #[must_use]
    pub const fn new(config: Option<EmailConfig>, server_url: String) -> Self {
        Self { config, server_url }
    }

    /// Send a password reset email containing the reset link.
    pub async fn send_password_reset(
        &self,
        to: &str,
        username: &str,
        token: &str,
    ) -> AppResult<()> {
        let reset_url = format!(
            "{}/reset-password?token={}",
            self.server_url,
            urlencoding::encode(token)
        );

        let subject = "Reset your password";
        let text_body = format!(
            "Hi {username},\n\nSomeone requested a password reset for your account.\n\
             If this was you, open the link below within the next hour:\n\n{reset_url}\n\n\
             If you did not request this, you can ignore this email."
        );
        let html_body = format!(
            "<p>Hi {username},</p>\
             <p>Someone requested a password reset for your account. \
             If this was you, open the link below within the next hour:</p>\
             <p><a href=\"{reset_url}\">Reset password</a></p>\
             <p>If you did not request this, you can ignore this email.</p>"
        );

        self.send(to, subject, &text_body, &html_body).await
    }

    async fn send(&self, to: &str, subject: &str, text: &str, html: &str) -> AppResult<()> {
        let Some(ref config) = self.config else {
            tracing::info!(to = %to, subject = %subject, "email disabled, skipping send");
            return Ok(());
        };
        let Some(ref smtp_host) = config.smtp_host else {
            tracing::info!(to = %to, subject = %subject, "no SMTP host configured, skipping send");
            return Ok(());
        };

        let from = format!("{} <{}>", config.from_name, config.from_address);
        let message = Message::builder()
            .from(
                from.parse()
                    .map_err(|e| AppError::Email(format!("invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::Email(format!("invalid recipient address: {e}")))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .map_err(|e| AppError::Email(format!("failed to build email: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(smtp_host)
            .map_err(|e| AppError::Email(format!("invalid SMTP relay: {e}")))?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.smtp_username, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let transport = builder.build();
        transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(format!("SMTP send failed: {e}")))?;

        tracing::debug!(to = %to, subject = %subject, "email sent");

        Ok(())
    }
}
