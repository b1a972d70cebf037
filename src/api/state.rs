//! Application state shared across handlers.

use crate::auth::{AuthState, TokenCodec};
use crate::user::UserService;

/// Shared application state.
///
/// Cheap to clone: every field is a handle. Read-only after startup, so it
/// is safe to share across concurrent requests without locks.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub users: UserService,
}

impl AppState {
    /// Assemble state from the codec and the user service; the interceptor
    /// shares the same directory handle as the handlers.
    pub fn new(codec: TokenCodec, users: UserService) -> Self {
        Self {
            auth: AuthState::new(codec, users.clone()),
            users,
        }
    }
}
