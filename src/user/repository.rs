//! Identity directory backed by SQLite.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use super::models::{AuditStamp, CreateUserRequest, Role, User, now_stamp};

/// Repository for principal lookup and administration.
///
/// Authentication lookups see only active rows: deactivation is a soft
/// delete that makes an account invisible to `find_by_email` while the row
/// is retained. `list` is the one administrative view that includes
/// inactive accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up an active principal by email.
    #[instrument(skip(self))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, email, password_hash, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM users
            WHERE email = ? AND is_active = 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user by email")?;

        match user {
            Some(user) => Ok(Some(self.with_roles(user).await?)),
            None => Ok(None),
        }
    }

    /// Get an active principal by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, email, password_hash, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM users
            WHERE id = ? AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")?;

        match user {
            Some(user) => Ok(Some(self.with_roles(user).await?)),
            None => Ok(None),
        }
    }

    /// Create a new user. Expects `request.password` to already hold the
    /// bcrypt hash; the audit stamp is written here.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(&self, request: CreateUserRequest, actor: &str) -> Result<User> {
        let audit = AuditStamp::created(actor);

        debug!("Creating user: {}", request.email);

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, surname, email, password_hash, is_active, created_at, created_by)
            VALUES (?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&request.name)
        .bind(&request.surname)
        .bind(&request.email)
        .bind(&request.password)
        .bind(&audit.created_at)
        .bind(&audit.created_by)
        .execute(&self.pool)
        .await
        .context("Failed to insert user")?;

        let id = result.last_insert_rowid();

        for role in &request.roles {
            sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
                .bind(id)
                .bind(role.to_string())
                .execute(&self.pool)
                .await
                .context("Failed to insert user role")?;
        }

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// List all users, including deactivated ones.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, surname, email, password_hash, is_active,
                   created_at, created_by, updated_at, updated_by
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list users")?;

        let mut out = Vec::with_capacity(users.len());
        for user in users {
            out.push(self.with_roles(user).await?);
        }
        Ok(out)
    }

    /// Flip the active flag, stamping the update. Returns false when no
    /// row matched the email.
    #[instrument(skip(self))]
    pub async fn set_active(&self, email: &str, active: bool, actor: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_active = ?, updated_at = ?, updated_by = ?
            WHERE email = ?
            "#,
        )
        .bind(active)
        .bind(now_stamp())
        .bind(actor)
        .bind(email)
        .execute(&self.pool)
        .await
        .context("Failed to update user active flag")?;

        Ok(result.rows_affected() > 0)
    }

    /// Attach the stored role set to a fetched row.
    async fn with_roles(&self, mut user: User) -> Result<User> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = ? ORDER BY role")
                .bind(user.id)
                .fetch_all(&self.pool)
                .await
                .context("Failed to fetch user roles")?;

        user.roles = rows
            .into_iter()
            .map(|(name,)| {
                name.parse::<Role>()
                    .map_err(|e| anyhow::anyhow!("invalid role in database: {e}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(user)
    }
}
