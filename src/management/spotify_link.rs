//! Spotify account linkage and user token upkeep.
//!
//! Users either sign in with Spotify (creating or updating a local account
//! keyed by `spotify_id`) or link Spotify to an existing local account.
//! Every user-scoped Spotify call goes through
//! [`SpotifyLinkManager::valid_access_token`], which refreshes the stored
//! token when it is about to expire.

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    db::{NewUser, SpotifyLink, UserRepo, UserRow},
    error::{ApiError, ApiResult},
    state::AppState,
    types::{SpotifyProfile, SpotifyToken},
    utils,
};

/// Tokens expiring within this many seconds are refreshed before use.
pub const REFRESH_THRESHOLD_SECS: i64 = 60;

const MAX_USERNAME_ATTEMPTS: u32 = 1000;

/// Whether a stored user token must be refreshed before use.
pub fn needs_refresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expires_at {
        Some(at) => at - now <= Duration::seconds(REFRESH_THRESHOLD_SECS),
        None => true,
    }
}

/// Expiry instant for a token issued now.
pub fn expiry_from(token: &SpotifyToken, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(token.expires_in.max(0))
}

/// Placeholder e-mail for Spotify accounts that do not share one.
pub fn fallback_email(spotify_id: &str) -> String {
    format!("{spotify_id}@spotify.temp")
}

pub struct SpotifyLinkManager<'a> {
    state: &'a AppState,
}

impl<'a> SpotifyLinkManager<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Completes the Spotify sign-in flow: exchanges the code, fetches the
    /// profile and creates or updates the matching local user.
    pub async fn sign_in(&self, code: &str) -> ApiResult<UserRow> {
        let token = self.state.spotify.exchange_code(code).await?;
        let profile = self.state.spotify.current_user(&token.access_token).await?;
        self.upsert_user(&token, &profile).await
    }

    /// Links the Spotify account behind `code` to an existing local user.
    ///
    /// # Errors
    ///
    /// `BadRequest` when that Spotify account already belongs to another user.
    pub async fn link(&self, user_id: Uuid, code: &str) -> ApiResult<UserRow> {
        let token = self.state.spotify.exchange_code(code).await?;
        let profile = self.state.spotify.current_user(&token.access_token).await?;

        if let Some(owner) = UserRepo::get_by_spotify_id(&self.state.pool, &profile.id).await? {
            if owner.id != user_id {
                return Err(ApiError::bad_request(
                    "This Spotify account is already linked to another user",
                ));
            }
        }

        let user = UserRepo::link_spotify(
            &self.state.pool,
            user_id,
            &link_from(&token, &profile, Utc::now()),
        )
        .await?;
        tracing::info!("Linked Spotify account {} to user {}", profile.id, user_id);
        Ok(user)
    }

    /// Removes the Spotify connection.
    ///
    /// Refused when the account has no local password, since the user could
    /// no longer sign in.
    pub async fn disconnect(&self, user: &UserRow) -> ApiResult<UserRow> {
        if !user.spotify_connected {
            return Err(ApiError::bad_request("Spotify account is not connected"));
        }
        if !user.has_password() {
            return Err(ApiError::bad_request(
                "Set a password before disconnecting Spotify, otherwise you could not sign in",
            ));
        }

        let user = UserRepo::clear_spotify(&self.state.pool, user.id).await?;
        tracing::info!("Disconnected Spotify from user {}", user.id);
        Ok(user)
    }

    /// Returns a usable access token for `user`, refreshing and persisting
    /// it first when it expires within [`REFRESH_THRESHOLD_SECS`].
    pub async fn valid_access_token(&self, user: &UserRow) -> ApiResult<String> {
        let access_token = match (&user.spotify_access_token, user.spotify_connected) {
            (Some(token), true) => token,
            _ => return Err(ApiError::bad_request("Spotify account is not connected")),
        };

        let now = Utc::now();
        if !needs_refresh(user.spotify_token_expires_at, now) {
            return Ok(access_token.clone());
        }

        let Some(refresh_token) = user.spotify_refresh_token.as_deref() else {
            return Err(ApiError::bad_request(
                "Spotify session expired. Connect your Spotify account again",
            ));
        };

        let fresh = self.state.spotify.refresh_access_token(refresh_token).await?;
        UserRepo::update_spotify_tokens(
            &self.state.pool,
            user.id,
            &fresh.access_token,
            fresh.refresh_token.as_deref(),
            expiry_from(&fresh, now),
        )
        .await?;

        tracing::debug!("Refreshed Spotify token for user {}", user.id);
        Ok(fresh.access_token)
    }

    async fn upsert_user(&self, token: &SpotifyToken, profile: &SpotifyProfile) -> ApiResult<UserRow> {
        let pool = &self.state.pool;
        let link = link_from(token, profile, Utc::now());

        if let Some(existing) = UserRepo::get_by_spotify_id(pool, &profile.id).await? {
            if !existing.is_active {
                return Err(ApiError::forbidden("Inactive user"));
            }
            return Ok(UserRepo::link_spotify(pool, existing.id, &link).await?);
        }

        let email = match profile.email.as_deref().map(str::to_lowercase) {
            Some(email) if !UserRepo::email_taken(pool, &email, None).await? => email,
            _ => fallback_email(&profile.id),
        };
        let base = utils::sanitize_username(profile.display_name.as_deref().unwrap_or(&profile.id));
        let username = self.unique_username(&base).await?;

        let mut tx = pool.begin().await.context("Failed to begin transaction")?;
        let created = UserRepo::create(
            &mut *tx,
            &NewUser {
                email: &email,
                username: &username,
                password_hash: None,
                first_name: None,
                last_name: None,
                profile_picture: link.profile_picture,
            },
        )
        .await?;
        let user = UserRepo::link_spotify(&mut *tx, created.id, &link).await?;
        tx.commit().await.context("Failed to commit Spotify user")?;

        tracing::info!("Created user {} from Spotify account {}", user.id, profile.id);
        Ok(user)
    }

    /// First free candidate among `base`, `base1`, `base2`...
    async fn unique_username(&self, base: &str) -> ApiResult<String> {
        for attempt in 0..MAX_USERNAME_ATTEMPTS {
            let candidate = utils::username_candidate(base, attempt);
            if !UserRepo::username_taken(&self.state.pool, &candidate, None).await? {
                return Ok(candidate);
            }
        }
        Ok(utils::username_candidate(base, rand::random_range(1000..1_000_000)))
    }
}

fn link_from<'p>(token: &'p SpotifyToken, profile: &'p SpotifyProfile, now: DateTime<Utc>) -> SpotifyLink<'p> {
    SpotifyLink {
        spotify_id: &profile.id,
        spotify_email: profile.email.as_deref(),
        display_name: profile.display_name.as_deref(),
        access_token: &token.access_token,
        refresh_token: token.refresh_token.as_deref(),
        expires_at: expiry_from(token, now),
        profile_picture: profile.images.first().map(|i| i.url.as_str()),
    }
}
