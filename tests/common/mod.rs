//! Test utilities and common setup.

use axum::Router;
use jsonwebtoken::{EncodingKey, Header, encode};
use tollgate::api::{self, AppState};
use tollgate::auth::{AuthConfig, Claims, TokenCodec};
use tollgate::db::Database;
use tollgate::user::{CreateUserRequest, Role, UserRepository, UserService};

/// Raw 32-byte signing key used by the tests, and its base64 form as it
/// appears in configuration.
pub const TEST_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
pub const TEST_SECRET_B64: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

/// A different, equally valid key for forging tokens.
pub const OTHER_SECRET: &[u8] = b"fedcba9876543210fedcba9876543210";

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "adminpass123";
pub const CASHIER_EMAIL: &str = "cashier@example.com";
pub const CASHIER_PASSWORD: &str = "cashierpass123";
pub const FORMER_EMAIL: &str = "former@example.com";
pub const FORMER_PASSWORD: &str = "formerpass123";

/// Auth config used by every test app.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        secret: Some(TEST_SECRET_B64.to_string()),
        expiration_ms: 3_600_000,
    }
}

pub struct TestApp {
    pub router: Router,
    pub codec: TokenCodec,
}

/// Create a test application backed by an in-memory directory with three
/// seeded accounts: an admin, a cashier and a deactivated ex-employee.
pub async fn test_app() -> TestApp {
    let database = Database::in_memory()
        .await
        .expect("create in-memory database");
    let users = UserService::new(UserRepository::new(database.pool().clone()));

    seed(&users, "Ada", "Admin", ADMIN_EMAIL, ADMIN_PASSWORD, vec![Role::Admin]).await;
    seed(
        &users,
        "Cal",
        "Cashier",
        CASHIER_EMAIL,
        CASHIER_PASSWORD,
        vec![Role::Cashier],
    )
    .await;
    seed(
        &users,
        "Fern",
        "Former",
        FORMER_EMAIL,
        FORMER_PASSWORD,
        vec![Role::Cashier],
    )
    .await;
    users
        .set_active(FORMER_EMAIL, false, "test")
        .await
        .expect("deactivate former employee");

    let config = test_auth_config();
    config.validate().expect("valid test auth config");
    let codec = TokenCodec::from_config(&config).expect("build token codec");

    let state = AppState::new(codec.clone(), users);
    let router = api::create_router(state, &[]);

    TestApp { router, codec }
}

async fn seed(
    users: &UserService,
    name: &str,
    surname: &str,
    email: &str,
    password: &str,
    roles: Vec<Role>,
) {
    users
        .create_user(
            CreateUserRequest {
                name: name.to_string(),
                surname: surname.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                roles,
            },
            "test",
        )
        .await
        .expect("seed user");
}

/// Sign claims directly with an arbitrary key, bypassing the codec. Used
/// to build expired and forged tokens.
pub fn forge_token(secret: &[u8], email: &str, exp_offset_secs: i64) -> String {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: email.to_string(),
        id: 1,
        roles: vec!["CASHIER".to_string()],
        iat: now - 60,
        exp: now + exp_offset_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("encode token")
}
