//! Shared building blocks for the warden session service.
//!
//! This crate has no internal dependencies and performs no I/O of its own. It
//! defines the vocabulary every other crate speaks:
//!
//! - [`config`] -- immutable [`AuthConfig`](config::AuthConfig) built once at startup.
//! - [`error`] -- [`CoreError`](error::CoreError), [`StoreError`](error::StoreError)
//!   and the closed [`ErrorKind`](error::ErrorKind) taxonomy with its message table.
//! - [`session`], [`kv`], [`identity`] -- the storage and identity seams.
//! - [`lockout`] -- progressive lockout policy evaluation.
//! - [`revocation`] -- why a token was revoked.

pub mod config;
pub mod error;
pub mod hashing;
pub mod identity;
pub mod kv;
pub mod lockout;
pub mod revocation;
pub mod session;
pub mod timeout;
pub mod types;
