/// User identifiers are PostgreSQL BIGSERIAL values owned by the identity source.
pub type DbId = i64;

/// Session identifiers are UUID v7 so they sort by creation time.
pub type SessionId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
