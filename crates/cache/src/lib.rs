//! Key-value backends implementing [`KvStore`](warden_core::kv::KvStore).
//!
//! - [`RedisKv`] -- shared Redis instance; required when more than one API
//!   node serves traffic, since revocations must be visible everywhere.
//! - [`MemoryKv`] -- in-process TTL map for tests and single-node development.

pub mod memory;
pub mod redis;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;
