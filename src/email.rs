use axum::async_trait;

/// Outbound mail seam. Verification and reset codes go through here so
/// handlers never care how (or whether) mail actually leaves the box.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_verification_code(&self, to: &str, code: &str) -> anyhow::Result<()>;
    async fn send_password_reset_code(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

/// Development mailer: writes the code to the log instead of sending mail.
#[derive(Clone)]
pub struct LogMailer;

#[async_trait]
impl EmailSender for LogMailer {
    async fn send_verification_code(&self, to: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(%to, %code, "email verification code issued");
        Ok(())
    }

    async fn send_password_reset_code(&self, to: &str, code: &str) -> anyhow::Result<()> {
        tracing::info!(%to, %code, "password reset code issued");
        Ok(())
    }
}
