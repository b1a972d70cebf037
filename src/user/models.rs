//! User data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Prefix joining a role name into its authority string.
const AUTHORITY_PREFIX: &str = "ROLE_";

/// Closed set of roles a principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

impl Role {
    /// Derive the authority string for this role.
    ///
    /// Authorities are never stored; the stored role set is the single
    /// source of truth and this derivation is applied at read time.
    pub fn authority(self) -> String {
        format!("{AUTHORITY_PREFIX}{self}")
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "ADMIN"),
            Role::Manager => write!(f, "MANAGER"),
            Role::Cashier => write!(f, "CASHIER"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MANAGER" => Ok(Role::Manager),
            "CASHIER" => Ok(Role::Cashier),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// Audit fields shared by persisted records, embedded by value.
///
/// Stamping is an explicit step performed by the persistence layer when a
/// row is written; nothing fills these fields implicitly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, FromRow)]
pub struct AuditStamp {
    pub created_at: Option<String>,
    pub created_by: Option<String>,
    pub updated_at: Option<String>,
    pub updated_by: Option<String>,
}

impl AuditStamp {
    /// Stamp for a freshly created record.
    pub fn created(by: &str) -> Self {
        Self {
            created_at: Some(now_stamp()),
            created_by: Some(by.to_string()),
            updated_at: None,
            updated_by: None,
        }
    }

    /// Record a modification.
    pub fn touch(&mut self, by: &str) {
        self.updated_at = Some(now_stamp());
        self.updated_by = Some(by.to_string());
    }
}

pub(crate) fn now_stamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// A principal known to the identity directory.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub is_active: bool,
    /// Role set, loaded from the join table alongside the row.
    #[sqlx(skip)]
    pub roles: Vec<Role>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditStamp,
}

impl User {
    /// Authorities derived from the stored role set.
    pub fn authorities(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.authority()).collect()
    }
}

/// Public user info (safe to return to clients).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub roles: Vec<Role>,
    pub is_active: bool,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            surname: user.surname,
            email: user.email,
            roles: user.roles,
            is_active: user.is_active,
        }
    }
}

/// Request to create a user.
///
/// `password` holds the plaintext on entry; the service replaces it with
/// the bcrypt hash before the repository sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<Role>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display_and_parse() {
        assert_eq!(Role::Admin.to_string(), "ADMIN");
        assert_eq!(Role::Manager.to_string(), "MANAGER");
        assert_eq!(Role::Cashier.to_string(), "CASHIER");

        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("cashier".parse::<Role>().unwrap(), Role::Cashier);
        assert!("SUPERVISOR".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_authority_derivation() {
        assert_eq!(Role::Admin.authority(), "ROLE_ADMIN");
        assert_eq!(Role::Manager.authority(), "ROLE_MANAGER");
        assert_eq!(Role::Cashier.authority(), "ROLE_CASHIER");
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
        let parsed: Role = serde_json::from_str("\"CASHIER\"").unwrap();
        assert_eq!(parsed, Role::Cashier);
    }

    #[test]
    fn test_audit_stamp_lifecycle() {
        let mut stamp = AuditStamp::created("cli");
        assert!(stamp.created_at.is_some());
        assert_eq!(stamp.created_by.as_deref(), Some("cli"));
        assert!(stamp.updated_at.is_none());

        stamp.touch("admin@example.com");
        assert!(stamp.updated_at.is_some());
        assert_eq!(stamp.updated_by.as_deref(), Some("admin@example.com"));
        // Creation fields are untouched by updates.
        assert_eq!(stamp.created_by.as_deref(), Some("cli"));
    }

    #[test]
    fn test_user_authorities() {
        let user = User {
            id: 1,
            name: "Mia".to_string(),
            surname: "Manager".to_string(),
            email: "mia@example.com".to_string(),
            password_hash: None,
            is_active: true,
            roles: vec![Role::Admin, Role::Manager],
            audit: AuditStamp::default(),
        };

        assert_eq!(user.authorities(), vec!["ROLE_ADMIN", "ROLE_MANAGER"]);
    }

    #[test]
    fn test_user_info_hides_password_hash() {
        let user = User {
            id: 1,
            name: "Cal".to_string(),
            surname: "Cashier".to_string(),
            email: "cal@example.com".to_string(),
            password_hash: Some("$2b$04$secret".to_string()),
            is_active: true,
            roles: vec![Role::Cashier],
            audit: AuditStamp::default(),
        };

        let info = UserInfo::from(user);
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("cal@example.com"));
    }
}
