//! User business logic: directory lookup and credential verification.

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use super::models::{CreateUserRequest, User};
use super::repository::UserRepository;

/// Service wrapping the identity directory.
#[derive(Debug, Clone)]
pub struct UserService {
    repo: UserRepository,
}

impl UserService {
    /// Create a new user service.
    pub fn new(repo: UserRepository) -> Self {
        Self { repo }
    }

    /// Directory interface: resolve an active principal by email.
    #[instrument(skip(self))]
    pub async fn lookup(&self, email: &str) -> Result<Option<User>> {
        self.repo.find_by_email(email).await
    }

    /// Create a new user with validation. The password is hashed before it
    /// reaches the repository.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, mut request: CreateUserRequest, actor: &str) -> Result<User> {
        if !is_valid_email(&request.email) {
            bail!("Invalid email format.");
        }

        if request.roles.is_empty() {
            bail!("A user must hold at least one role.");
        }

        if request.password.len() < 6 {
            bail!("Password must be at least 6 characters.");
        }

        if self.repo.find_by_email(&request.email).await?.is_some() {
            bail!("Email '{}' is already registered.", request.email);
        }

        request.password = hash_password(&request.password)?;

        let user = self.repo.create(request, actor).await?;
        info!(user_id = user.id, email = %user.email, "Created new user");

        Ok(user)
    }

    /// Verify login credentials.
    ///
    /// Unknown email, inactive account and wrong password all collapse to
    /// `None`; the caller cannot tell them apart. Inactive accounts never
    /// reach the hash comparison because the directory filters them out.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = self.repo.find_by_email(email).await?;

        match user {
            Some(user) => {
                if let Some(hash) = &user.password_hash {
                    if verify_password(password, hash)? {
                        return Ok(Some(user));
                    }
                }
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// List all users, including deactivated ones.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.repo.list().await
    }

    /// Activate or deactivate a user.
    #[instrument(skip(self))]
    pub async fn set_active(&self, email: &str, active: bool, actor: &str) -> Result<()> {
        if !self.repo.set_active(email, active, actor).await? {
            bail!("User not found: {}", email);
        }

        info!(email, active, "Updated user active flag");
        Ok(())
    }
}

/// Hash a password using bcrypt.
fn hash_password(password: &str) -> Result<String> {
    // Use a lower cost factor for development speed
    let cost = if cfg!(debug_assertions) { 4 } else { 10 };
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Verify a presented secret against a stored bcrypt hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}

/// Basic email validation.
fn is_valid_email(email: &str) -> bool {
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    !parts[0].is_empty() && parts[1].contains('.')
}
