use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Lifetime of a password reset code.
pub const RESET_CODE_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResetCodeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code: String,
    pub email: String,
    pub is_used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ResetCodeRow {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A code is valid iff it is unused and `now < expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

pub struct ResetCodeRepo;

impl ResetCodeRepo {
    /// Marks every unused code of the user as used; returns how many were.
    pub async fn invalidate_for_user<'e, E: PgExecutor<'e>>(db: E, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE password_reset_codes SET is_used = TRUE WHERE user_id = $1 AND is_used = FALSE",
        )
        .bind(user_id)
        .execute(db)
        .await
        .context("Failed to invalidate reset codes")?;
        Ok(result.rows_affected())
    }

    pub async fn create<'e, E: PgExecutor<'e>>(
        db: E,
        user_id: Uuid,
        email: &str,
        code: &str,
    ) -> Result<ResetCodeRow> {
        let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);
        let row = sqlx::query_as::<_, ResetCodeRow>(
            "INSERT INTO password_reset_codes (id, user_id, code, email, expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, code, email, is_used, expires_at, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(code)
        .bind(email)
        .bind(expires_at)
        .fetch_one(db)
        .await
        .context("Failed to create reset code")?;
        Ok(row)
    }

    /// Newest unused code matching both e-mail and code.
    pub async fn find_unused(pool: &PgPool, email: &str, code: &str) -> Result<Option<ResetCodeRow>> {
        let row = sqlx::query_as::<_, ResetCodeRow>(
            "SELECT id, user_id, code, email, is_used, expires_at, created_at \
             FROM password_reset_codes \
             WHERE email = $1 AND code = $2 AND is_used = FALSE \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(email)
        .bind(code)
        .fetch_optional(pool)
        .await
        .context("Failed to look up reset code")?;
        Ok(row)
    }

    pub async fn mark_used<'e, E: PgExecutor<'e>>(db: E, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE password_reset_codes SET is_used = TRUE WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .context("Failed to mark reset code as used")?;
        Ok(())
    }

    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<ResetCodeRow>> {
        let rows = sqlx::query_as::<_, ResetCodeRow>(
            "SELECT id, user_id, code, email, is_used, expires_at, created_at \
             FROM password_reset_codes WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("Failed to list reset codes")?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(is_used: bool, expires_in: Duration) -> ResetCodeRow {
        let now = Utc::now();
        ResetCodeRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            code: "123456".to_string(),
            email: "ana@example.com".to_string(),
            is_used,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[test]
    fn test_fresh_code_is_valid() {
        assert!(code(false, Duration::minutes(RESET_CODE_TTL_MINUTES)).is_valid());
    }

    #[test]
    fn test_used_code_is_invalid() {
        assert!(!code(true, Duration::minutes(10)).is_valid());
    }

    #[test]
    fn test_expired_code_is_invalid() {
        let c = code(false, Duration::minutes(-1));
        assert!(c.is_expired_at(Utc::now()));
        assert!(!c.is_valid());
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let c = code(false, Duration::minutes(5));
        assert!(c.is_valid_at(c.expires_at - Duration::seconds(1)));
        assert!(!c.is_valid_at(c.expires_at));
    }
}
