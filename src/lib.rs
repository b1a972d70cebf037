//! Tollgate authentication service library.
//!
//! Stateless JWT authentication for an HTTP service: credentials are
//! verified once at login, a signed time-bound token is issued, and every
//! subsequent request is re-authenticated from the token alone. No session
//! state is held on the server.

pub mod api;
pub mod auth;
pub mod db;
pub mod user;
