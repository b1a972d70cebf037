//! HTTP API: routes, handlers, state and errors.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{HealthResponse, LoginRequest};
pub use routes::create_router;
pub use state::AppState;
