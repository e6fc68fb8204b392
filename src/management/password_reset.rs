use anyhow::Context;
use chrono::Utc;
use validator::Validate;

use crate::{
    db::{ResetCodeRepo, UserRepo},
    error::{ApiError, ApiResult},
    mail,
    management::accounts::hash_password,
    state::AppState,
    types::{ForgotPasswordRequest, ResetPasswordRequest},
    utils,
};

/// Password recovery with 6-digit codes sent by e-mail.
///
/// A user has at most one usable code: issuing a new one retires every
/// earlier unused code in the same transaction.
pub struct PasswordResetManager<'a> {
    state: &'a AppState,
}

impl<'a> PasswordResetManager<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Issues a new code and mails it.
    ///
    /// # Errors
    ///
    /// * `NotFound` - no account uses this e-mail
    /// * `Forbidden` - the account is inactive
    /// * `BadRequest` - the account has no local password (Spotify only)
    /// * `Upstream` - the e-mail could not be sent; the new code is retired
    pub async fn request_code(&self, req: ForgotPasswordRequest) -> ApiResult<()> {
        req.validate()?;
        let email = req.email.trim().to_lowercase();
        let pool = &self.state.pool;

        let user = UserRepo::get_by_email(pool, &email)
            .await?
            .ok_or_else(|| ApiError::not_found("No account is registered with this email"))?;

        if !user.is_active {
            return Err(ApiError::forbidden("Inactive user"));
        }
        if !user.has_password() {
            return Err(ApiError::bad_request(
                "This account signs in with Spotify and has no password to reset",
            ));
        }

        let code = utils::generate_reset_code();
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        let retired = ResetCodeRepo::invalidate_for_user(&mut *tx, user.id).await?;
        let issued = ResetCodeRepo::create(&mut *tx, user.id, &user.email, &code).await?;
        tx.commit().await.context("Failed to commit reset code")?;

        if retired > 0 {
            tracing::debug!("Retired {} earlier reset code(s) for user {}", retired, user.id);
        }

        let message = mail::reset_code_mail(&user.email, &user.display_name(), &code);
        if let Err(e) = self.state.mailer.send(message).await {
            ResetCodeRepo::mark_used(pool, issued.id).await?;
            return Err(e.into());
        }

        tracing::info!("Reset code issued for user {}", user.id);
        Ok(())
    }

    /// Replaces the password if `code` is the newest unused, unexpired code
    /// for the e-mail.
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> ApiResult<()> {
        req.validate()?;
        if !req.code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ApiError::bad_request("code: must be 6 digits"));
        }
        let email = req.email.trim().to_lowercase();
        let pool = &self.state.pool;

        let code = ResetCodeRepo::find_unused(pool, &email, &req.code)
            .await?
            .ok_or_else(|| ApiError::bad_request("Invalid or already used code"))?;

        if code.is_expired_at(Utc::now()) {
            ResetCodeRepo::mark_used(pool, code.id).await?;
            return Err(ApiError::bad_request(
                "The code has expired. Request a new one",
            ));
        }

        let password_hash = hash_password(req.new_password).await?;

        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        UserRepo::set_password(&mut *tx, code.user_id, &password_hash).await?;
        ResetCodeRepo::mark_used(&mut *tx, code.id).await?;
        tx.commit().await.context("Failed to commit password reset")?;

        tracing::info!("Password reset for user {}", code.user_id);
        Ok(())
    }
}
