use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::types::UserResponse;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_picture: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub spotify_id: Option<String>,
    pub spotify_email: Option<String>,
    pub spotify_display_name: Option<String>,
    pub spotify_access_token: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub spotify_token_expires_at: Option<DateTime<Utc>>,
    pub spotify_connected: bool,
    pub spotify_connected_at: Option<DateTime<Utc>>,
}

impl UserRow {
    /// "first last", then first name, then Spotify display name, then username.
    pub fn display_name(&self) -> String {
        let first = self.first_name.as_deref().filter(|s| !s.is_empty());
        let last = self.last_name.as_deref().filter(|s| !s.is_empty());
        match (first, last) {
            (Some(f), Some(l)) => format!("{f} {l}"),
            (Some(f), None) => f.to_string(),
            _ => self
                .spotify_display_name
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| self.username.clone()),
        }
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id,
            email: self.email.clone(),
            username: self.username.clone(),
            display_name: self.display_name(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            profile_picture: self.profile_picture.clone(),
            is_active: self.is_active,
            is_verified: self.is_verified,
            has_password: self.has_password(),
            spotify_connected: self.spotify_connected,
            spotify_id: self.spotify_id.clone(),
            spotify_display_name: self.spotify_display_name.clone(),
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub profile_picture: Option<&'a str>,
}

/// Columns a user may change on their own profile; `None` keeps the value.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges<'a> {
    pub email: Option<&'a str>,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
}

/// Spotify account data written on connect and on token refresh.
#[derive(Debug, Clone)]
pub struct SpotifyLink<'a> {
    pub spotify_id: &'a str,
    pub spotify_email: Option<&'a str>,
    pub display_name: Option<&'a str>,
    pub access_token: &'a str,
    pub refresh_token: Option<&'a str>,
    pub expires_at: DateTime<Utc>,
    pub profile_picture: Option<&'a str>,
}

const USER_COLUMNS: &str = "id, email, username, password_hash, first_name, last_name, \
     profile_picture, is_active, is_verified, created_at, updated_at, last_login, spotify_id, \
     spotify_email, spotify_display_name, spotify_access_token, spotify_refresh_token, \
     spotify_token_expires_at, spotify_connected, spotify_connected_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn create<'e, E: PgExecutor<'e>>(db: E, user: &NewUser<'_>) -> Result<UserRow> {
        let sql = format!(
            "INSERT INTO users (id, email, username, password_hash, first_name, last_name, profile_picture) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.username)
            .bind(user.password_hash)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.profile_picture)
            .fetch_one(db)
            .await
            .context("Failed to create user")?;
        Ok(row)
    }

    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("Failed to get user by id")?;
        Ok(row)
    }

    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await
            .context("Failed to get user by email")?;
        Ok(row)
    }

    /// Looks a login identifier up as username first, then as e-mail.
    pub async fn get_by_login(pool: &PgPool, login: &str) -> Result<Option<UserRow>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1 OR email = $1 \
             ORDER BY (username = $1) DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(login)
            .fetch_optional(pool)
            .await
            .context("Failed to get user by login")?;
        Ok(row)
    }

    pub async fn get_by_spotify_id(pool: &PgPool, spotify_id: &str) -> Result<Option<UserRow>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE spotify_id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(spotify_id)
            .fetch_optional(pool)
            .await
            .context("Failed to get user by spotify id")?;
        Ok(row)
    }

    pub async fn email_taken(pool: &PgPool, email: &str, except: Option<Uuid>) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(except)
        .fetch_one(pool)
        .await
        .context("Failed to check email")?;
        Ok(taken)
    }

    pub async fn username_taken(
        pool: &PgPool,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(except)
        .fetch_one(pool)
        .await
        .context("Failed to check username")?;
        Ok(taken)
    }

    pub async fn touch_last_login(pool: &PgPool, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("Failed to update last_login")?;
        Ok(())
    }

    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        changes: &ProfileChanges<'_>,
    ) -> Result<UserRow> {
        let sql = format!(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                username = COALESCE($3, username), \
                first_name = COALESCE($4, first_name), \
                last_name = COALESCE($5, last_name), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.username)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .fetch_one(pool)
            .await
            .context("Failed to update user profile")?;
        Ok(row)
    }

    pub async fn set_password<'e, E: PgExecutor<'e>>(
        db: E,
        id: Uuid,
        password_hash: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await
            .context("Failed to set password")?;
        Ok(())
    }

    /// Stores a Spotify connection and marks the account as connected.
    /// The profile picture is only replaced when Spotify provides one.
    pub async fn link_spotify<'e, E: PgExecutor<'e>>(
        db: E,
        id: Uuid,
        link: &SpotifyLink<'_>,
    ) -> Result<UserRow> {
        let sql = format!(
            "UPDATE users SET \
                spotify_id = $2, \
                spotify_email = $3, \
                spotify_display_name = $4, \
                spotify_access_token = $5, \
                spotify_refresh_token = COALESCE($6, spotify_refresh_token), \
                spotify_token_expires_at = $7, \
                profile_picture = COALESCE($8, profile_picture), \
                spotify_connected = TRUE, \
                spotify_connected_at = COALESCE(spotify_connected_at, NOW()), \
                last_login = NOW(), \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(link.spotify_id)
            .bind(link.spotify_email)
            .bind(link.display_name)
            .bind(link.access_token)
            .bind(link.refresh_token)
            .bind(link.expires_at)
            .bind(link.profile_picture)
            .fetch_one(db)
            .await
            .context("Failed to link spotify account")?;
        Ok(row)
    }

    /// Persists a refreshed access token. A rotated refresh token replaces the
    /// stored one; `None` keeps it.
    pub async fn update_spotify_tokens(
        pool: &PgPool,
        id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET \
                spotify_access_token = $2, \
                spotify_refresh_token = COALESCE($3, spotify_refresh_token), \
                spotify_token_expires_at = $4, \
                updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(expires_at)
        .execute(pool)
        .await
        .context("Failed to update spotify tokens")?;
        Ok(())
    }

    pub async fn clear_spotify(pool: &PgPool, id: Uuid) -> Result<UserRow> {
        let sql = format!(
            "UPDATE users SET \
                spotify_id = NULL, \
                spotify_email = NULL, \
                spotify_display_name = NULL, \
                spotify_access_token = NULL, \
                spotify_refresh_token = NULL, \
                spotify_token_expires_at = NULL, \
                spotify_connected = FALSE, \
                spotify_connected_at = NULL, \
                updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_one(pool)
            .await
            .context("Failed to disconnect spotify account")?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRow {
        UserRow {
            id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            username: "ana".to_string(),
            password_hash: None,
            first_name: None,
            last_name: None,
            profile_picture: None,
            is_active: true,
            is_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
            spotify_id: None,
            spotify_email: None,
            spotify_display_name: None,
            spotify_access_token: None,
            spotify_refresh_token: None,
            spotify_token_expires_at: None,
            spotify_connected: false,
            spotify_connected_at: None,
        }
    }

    #[test]
    fn test_display_name_precedence() {
        let mut u = user();
        assert_eq!(u.display_name(), "ana");

        u.spotify_display_name = Some("Ana on Spotify".to_string());
        assert_eq!(u.display_name(), "Ana on Spotify");

        u.first_name = Some("Ana".to_string());
        assert_eq!(u.display_name(), "Ana");

        u.last_name = Some("Pérez".to_string());
        assert_eq!(u.display_name(), "Ana Pérez");
    }

    #[test]
    fn test_last_name_alone_is_ignored() {
        let mut u = user();
        u.last_name = Some("Pérez".to_string());
        assert_eq!(u.display_name(), "ana");
    }

    #[test]
    fn test_response_reports_password_presence() {
        let mut u = user();
        assert!(!u.to_response().has_password);
        u.password_hash = Some("$2b$04$hash".to_string());
        assert!(u.to_response().has_password);
    }
}
