//! Storage keys and `SQLite` schema definitions.

/// Key holding the serialized project document.
pub const PROJECT_KEY: &str = "projectData";

/// Prefix of the keys holding pre-migration snapshots.
///
/// The full key appends an ISO-8601 UTC timestamp, e.g.
/// `projectData_backup_2024-01-01T08:30:00.000Z`.
pub const BACKUP_KEY_PREFIX: &str = "projectData_backup_";

/// SQL statement to create the key-value table.
pub const CREATE_KV_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to insert or overwrite a value.
pub const UPSERT_VALUE: &str = r"
INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[CREATE_KV_TABLE];
