//! Account storage: the identity store consulted by login and refresh.

use serde::{Deserialize, Serialize};
use serde::de::Error as _;
use sqlx::sqlite::SqlitePool;

/// Account role. A closed set: the token codec serializes the bare name
/// (`SUPERADMIN`), and the `ROLE_`-prefixed authority tag only exists at the
/// authorization edge, so a double-prefixed authority cannot be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Superadmin,
    ClientAdmin,
    Recruiter,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "SUPERADMIN",
            Role::ClientAdmin => "CLIENT_ADMIN",
            Role::Recruiter => "RECRUITER",
            Role::Employee => "EMPLOYEE",
        }
    }

    /// Authority tag used by the authorization layer.
    pub fn authority(&self) -> &'static str {
        match self {
            Role::Superadmin => "ROLE_SUPERADMIN",
            Role::ClientAdmin => "ROLE_CLIENT_ADMIN",
            Role::Recruiter => "ROLE_RECRUITER",
            Role::Employee => "ROLE_EMPLOYEE",
        }
    }

    /// Parse a role claim. Accepts both the bare name and a legacy
    /// `ROLE_`-prefixed form so upstream issuers that embedded the authority
    /// tag in the claim still decode to the same role.
    pub fn from_claim(s: &str) -> Option<Role> {
        let s = s.strip_prefix("ROLE_").unwrap_or(s);
        match s {
            "SUPERADMIN" => Some(Role::Superadmin),
            "CLIENT_ADMIN" => Some(Role::ClientAdmin),
            "RECRUITER" => Some(Role::Recruiter),
            "EMPLOYEE" => Some(Role::Employee),
            _ => None,
        }
    }

    /// Parse a stored role column, defaulting unknown values to the least
    /// privileged role.
    fn from_column(s: &str) -> Role {
        Role::from_claim(s).unwrap_or(Role::Employee)
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Role::from_claim(&s).ok_or_else(|| D::Error::custom(format!("unknown role: {}", s)))
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "ACTIVE",
            AccountStatus::Inactive => "INACTIVE",
        }
    }

    fn from_column(s: &str) -> AccountStatus {
        match s {
            "ACTIVE" => AccountStatus::Active,
            _ => AccountStatus::Inactive,
        }
    }
}

/// An account row.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Owning tenant; NULL for superadmins
    pub client_id: Option<String>,
    pub status: AccountStatus,
    /// Unix timestamp of the last successful login
    pub last_login: Option<i64>,
}

#[derive(sqlx::FromRow)]
struct AuthUserRow {
    id: String,
    email: String,
    password_hash: String,
    role: String,
    client_id: Option<String>,
    status: String,
    last_login: Option<i64>,
}

impl From<AuthUserRow> for AuthUser {
    fn from(row: AuthUserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::from_column(&row.role),
            client_id: row.client_id,
            status: AccountStatus::from_column(&row.status),
            last_login: row.last_login,
        }
    }
}

/// Public account summary for the admin surface. Omits the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub client_id: Option<String>,
    pub status: AccountStatus,
    pub last_login: Option<i64>,
}

impl From<AuthUser> for AccountSummary {
    fn from(user: AuthUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            client_id: user.client_id,
            status: user.status,
            last_login: user.last_login,
        }
    }
}

/// Fields for creating a new account.
#[derive(Debug, Clone)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub client_id: Option<&'a str>,
    pub status: AccountStatus,
}

const SELECT_COLUMNS: &str =
    "id, email, password_hash, role, client_id, status, last_login";

/// Store for account records. Soft-deleted rows are invisible to every
/// lookup.
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an account. Returns the generated account id.
    /// Superadmins are never tenant-scoped, so their `client_id` is forced
    /// to NULL regardless of what the caller passed.
    pub async fn create(&self, account: &NewAccount<'_>, now: i64) -> Result<String, sqlx::Error> {
        let id = uuid::Uuid::new_v4().to_string();
        let client_id = match account.role {
            Role::Superadmin => None,
            _ => account.client_id,
        };

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, role, client_id, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(account.email)
        .bind(account.password_hash)
        .bind(account.role.as_str())
        .bind(client_id)
        .bind(account.status.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Look up a non-deleted account by email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AuthUser>, sqlx::Error> {
        let row: Option<AuthUserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = ? AND deleted_at IS NULL",
            SELECT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AuthUser::from))
    }

    /// Look up a non-deleted account by id.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<AuthUser>, sqlx::Error> {
        let row: Option<AuthUserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE id = ? AND deleted_at IS NULL",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(AuthUser::from))
    }

    /// Stamp the last successful login.
    pub async fn update_last_login(&self, id: &str, now: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set the account status.
    pub async fn set_status(&self, id: &str, status: AccountStatus) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete an account.
    pub async fn soft_delete(&self, id: &str, now: i64) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL")
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List all non-deleted accounts, oldest first.
    pub async fn list(&self) -> Result<Vec<AccountSummary>, sqlx::Error> {
        let rows: Vec<AuthUserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| AccountSummary::from(AuthUser::from(r)))
            .collect())
    }

    /// Count non-deleted accounts with the given status.
    pub async fn count_by_status(&self, status: AccountStatus) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE status = ? AND deleted_at IS NULL",
        )
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_prefix_is_idempotent() {
        // Bare claim gets prefixed once.
        let role = Role::from_claim("SUPERADMIN").unwrap();
        assert_eq!(role.authority(), "ROLE_SUPERADMIN");

        // Already-prefixed claim decodes to the same role, never to a
        // double-prefixed authority.
        let role = Role::from_claim("ROLE_SUPERADMIN").unwrap();
        assert_eq!(role.authority(), "ROLE_SUPERADMIN");
    }

    #[test]
    fn test_unknown_role_claim_rejected() {
        assert_eq!(Role::from_claim("WIZARD"), None);
        assert_eq!(Role::from_claim(""), None);
        assert_eq!(Role::from_claim("ROLE_"), None);
    }

    #[test]
    fn test_role_serde_round_trip() {
        let json = serde_json::to_string(&Role::ClientAdmin).unwrap();
        assert_eq!(json, "\"CLIENT_ADMIN\"");

        let role: Role = serde_json::from_str("\"CLIENT_ADMIN\"").unwrap();
        assert_eq!(role, Role::ClientAdmin);

        // Legacy prefixed claims still deserialize.
        let role: Role = serde_json::from_str("\"ROLE_RECRUITER\"").unwrap();
        assert_eq!(role, Role::Recruiter);

        assert!(serde_json::from_str::<Role>("\"WIZARD\"").is_err());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(AccountStatus::from_column("ACTIVE"), AccountStatus::Active);
        assert_eq!(
            AccountStatus::from_column("INACTIVE"),
            AccountStatus::Inactive
        );
        // Anything unexpected is treated as not active.
        assert_eq!(
            AccountStatus::from_column("SUSPENDED"),
            AccountStatus::Inactive
        );
    }
}
