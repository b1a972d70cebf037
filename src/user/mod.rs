//! User model and identity directory.

mod models;
mod repository;
mod service;

pub use models::{AuditStamp, CreateUserRequest, Role, User, UserInfo};
pub use repository::UserRepository;
pub use service::{UserService, verify_password};
