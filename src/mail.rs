use async_trait::async_trait;
use axum::extract::FromRef;
use serde_json::json;
use tracing::info;

use crate::auth::services::JwtKeys;
use crate::delegates::repo::Delegate;
use crate::state::AppState;

/// Outbound mail boundary. Delivery itself (SMTP, provider API) is wired in
/// by the binary; the application only composes messages and surfaces send
/// failures to the caller. A failed send does not undo prior state changes.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        vars: serde_json::Value,
    ) -> anyhow::Result<()>;
}

/// Default mailer: records the outbound message in the log stream. Used in
/// development and anywhere real delivery is not configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        vars: serde_json::Value,
    ) -> anyhow::Result<()> {
        info!(template, recipient, vars = %vars, "outbound mail");
        Ok(())
    }
}

/// Send the email-verification link for a delegate. The link embeds a
/// verification-kind token with the configured expiry window.
pub async fn send_verification_email(state: &AppState, delegate: &Delegate) -> anyhow::Result<()> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_verification(&delegate.email)?;
    let link = format!("{}/verify_email?token={}", state.config.base_url, token);
    let expiry_hours = state.config.jwt.verification_ttl_minutes / 60;

    state
        .mailer
        .send(
            "email_verification",
            &delegate.email,
            json!({
                "firstname": delegate.firstname,
                "verification_url": link,
                "expiry": expiry_hours,
                "support_email": state.config.mail.support_email,
                "tech_email": state.config.mail.tech_email,
                "from_name": state.config.mail.from_name,
            }),
        )
        .await
}

/// Send the password-reset link for a delegate. Reuses the verification
/// token kind; the reset form exchanges it through the authenticated
/// change-password endpoint.
pub async fn send_password_reset_email(
    state: &AppState,
    delegate: &Delegate,
) -> anyhow::Result<()> {
    let keys = JwtKeys::from_ref(state);
    let token = keys.sign_verification(&delegate.email)?;
    let link = format!("{}/reset_password?token={}", state.config.base_url, token);

    state
        .mailer
        .send(
            "password_reset",
            &delegate.email,
            json!({
                "firstname": delegate.firstname,
                "link": link,
                "support_email": state.config.mail.support_email,
                "tech_email": state.config.mail.tech_email,
                "from_name": state.config.mail.from_name,
            }),
        )
        .await
}
