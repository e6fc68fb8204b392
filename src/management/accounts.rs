use anyhow::Context;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{self, NewUser, ProfileChanges, UserRepo, UserRow},
    error::{ApiError, ApiResult},
    security,
    state::AppState,
    types::{LoginRequest, RegisterRequest, TokenResponse, UpdateUserRequest},
};

pub const TOKEN_TYPE: &str = "bearer";

/// Local accounts: registration, login and profile maintenance.
pub struct AccountManager<'a> {
    state: &'a AppState,
}

impl<'a> AccountManager<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Creates a user with a bcrypt-hashed password.
    ///
    /// # Errors
    ///
    /// `BadRequest` for invalid input or when the e-mail or username is
    /// already registered.
    pub async fn register(&self, req: RegisterRequest) -> ApiResult<UserRow> {
        req.validate()?;
        let email = normalize_email(&req.email);
        let username = req.username.trim();
        let pool = &self.state.pool;

        if UserRepo::email_taken(pool, &email, None).await? {
            return Err(ApiError::bad_request("Email already registered"));
        }
        if UserRepo::username_taken(pool, username, None).await? {
            return Err(ApiError::bad_request("Username already taken"));
        }

        let password_hash = hash_password(req.password).await?;
        let user = UserRepo::create(
            pool,
            &NewUser {
                email: &email,
                username,
                password_hash: Some(&password_hash),
                first_name: non_empty(req.first_name.as_deref()),
                last_name: non_empty(req.last_name.as_deref()),
                profile_picture: None,
            },
        )
        .await
        .map_err(|err| match db::unique_violation(&err) {
            // Lost a race with a concurrent registration
            Some(constraint) if constraint.contains("username") => {
                ApiError::bad_request("Username already taken")
            }
            Some(_) => ApiError::bad_request("Email already registered"),
            None => ApiError::from(err),
        })?;

        tracing::info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Checks credentials given a username or an e-mail address.
    pub async fn authenticate(&self, req: LoginRequest) -> ApiResult<UserRow> {
        req.validate()?;
        let login = req.username_or_email.trim();
        let login = if login.contains('@') {
            normalize_email(login)
        } else {
            login.to_string()
        };

        let user = UserRepo::get_by_login(&self.state.pool, &login)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Incorrect username/email or password"))?;

        if !user.is_active {
            return Err(ApiError::forbidden("Inactive user"));
        }

        let Some(hash) = user.password_hash.clone() else {
            return Err(ApiError::unauthorized(
                "This is a Spotify-only account. Sign in with Spotify",
            ));
        };

        if !verify_password(req.password, hash).await? {
            return Err(ApiError::unauthorized("Incorrect username/email or password"));
        }

        UserRepo::touch_last_login(&self.state.pool, user.id).await?;
        Ok(user)
    }

    /// Issues an access token for `user`.
    pub fn issue_token(&self, user: &UserRow) -> ApiResult<TokenResponse> {
        let access_token =
            security::create_access_token(user.id, &user.username, &user.email, &self.state.config.jwt)?;
        Ok(TokenResponse {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
            user: user.to_response(),
        })
    }

    /// Loads the active user behind a token subject.
    pub async fn current_user(&self, user_id: Uuid) -> ApiResult<UserRow> {
        let user = UserRepo::get_by_id(&self.state.pool, user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;
        if !user.is_active {
            return Err(ApiError::forbidden("Inactive user"));
        }
        Ok(user)
    }

    pub async fn update_profile(&self, user_id: Uuid, req: UpdateUserRequest) -> ApiResult<UserRow> {
        req.validate()?;
        let pool = &self.state.pool;
        let email = req.email.as_deref().map(normalize_email);
        let username = req.username.as_deref().map(str::trim);

        if let Some(email) = email.as_deref() {
            if UserRepo::email_taken(pool, email, Some(user_id)).await? {
                return Err(ApiError::bad_request("Email already registered"));
            }
        }
        if let Some(username) = username {
            if UserRepo::username_taken(pool, username, Some(user_id)).await? {
                return Err(ApiError::bad_request("Username already taken"));
            }
        }

        let user = UserRepo::update_profile(
            pool,
            user_id,
            &ProfileChanges {
                email: email.as_deref(),
                username,
                first_name: req.first_name.as_deref(),
                last_name: req.last_name.as_deref(),
            },
        )
        .await?;
        Ok(user)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// bcrypt runs on the blocking pool.
pub(crate) async fn hash_password(password: String) -> ApiResult<String> {
    let hash = tokio::task::spawn_blocking(move || security::hash_password(&password))
        .await
        .context("Password hashing task failed")??;
    Ok(hash)
}

async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    let ok = tokio::task::spawn_blocking(move || security::verify_password(&password, &hash))
        .await
        .context("Password verification task failed")?;
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ")), None);
        assert_eq!(non_empty(Some(" Ana ")), Some("Ana"));
        assert_eq!(non_empty(None), None);
    }

    #[tokio::test]
    async fn test_hash_and_verify_on_blocking_pool() {
        let hash = hash_password("s3cret-pass".to_string()).await.unwrap();
        assert!(verify_password("s3cret-pass".to_string(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".to_string(), hash).await.unwrap());
    }
}
