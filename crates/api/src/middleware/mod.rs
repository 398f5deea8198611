//! Request extractors and middleware.
//!
//! - [`auth`] -- bearer-token authentication via the access guard.
//! - [`rbac`] -- permission-gated wrappers around [`auth::AuthUser`].
//! - [`locale`] -- `Accept-Language` localisation of authentication errors.

pub mod auth;
pub mod locale;
pub mod rbac;
