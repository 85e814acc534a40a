//! Refresh credential storage.
//!
//! Only refresh tokens are persisted; access tokens are stateless and
//! short-lived. Rows are revoked by flag, never un-revoked, and physically
//! deleted only by the expiry sweep.

use sqlx::sqlite::SqlitePool;

/// A persisted refresh credential.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub id: i64,
    pub user_id: String,
    /// The refresh token string itself, unique per row
    pub token: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub revoked: bool,
    pub created_at: i64,
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: i64,
    user_id: String,
    token: String,
    issued_at: i64,
    expires_at: i64,
    revoked: i64,
    created_at: i64,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
            revoked: row.revoked != 0,
            created_at: row.created_at,
        }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, token, issued_at, expires_at, revoked, created_at";

/// Store for refresh credentials.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new refresh credential. Returns the row id.
    pub async fn insert(
        &self,
        user_id: &str,
        token: &str,
        issued_at: i64,
        expires_at: i64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token, issued_at, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(token)
        .bind(issued_at)
        .bind(expires_at)
        .bind(issued_at)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Find a usable credential by token value: not revoked, not expired.
    pub async fn find_valid(
        &self,
        token: &str,
        now: i64,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM refresh_tokens WHERE token = ? AND revoked = 0 AND expires_at > ?",
            SELECT_COLUMNS
        ))
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    /// Find a credential by token value regardless of state.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM refresh_tokens WHERE token = ?",
            SELECT_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RefreshTokenRecord::from))
    }

    /// Revoke a single credential by row id.
    pub async fn revoke(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every credential owned by a user, including rows that are
    /// already revoked. Idempotent; revocation is never undone.
    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete rows past their expiry, revoked or not. Advisory cleanup: an
    /// expired row is already unusable to `find_valid`.
    pub async fn sweep_expired(&self, now: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List a user's credentials, newest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RefreshTokenRecord>, sqlx::Error> {
        let rows: Vec<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {} FROM refresh_tokens WHERE user_id = ? ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(RefreshTokenRecord::from).collect())
    }

    /// Count usable credentials across all users.
    pub async fn count_valid(&self, now: i64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM refresh_tokens WHERE revoked = 0 AND expires_at > ?",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}
