//! HTTP surface of the warden session service.
//!
//! Everything interesting lives in `warden-auth`; this crate maps requests
//! onto [`SessionLifecycle`](warden_auth::SessionLifecycle) and errors onto
//! responses.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod state;
