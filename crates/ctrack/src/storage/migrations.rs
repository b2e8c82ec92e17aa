//! Schema versioning for the stored project document.
//!
//! Migrations work on untyped JSON so that any shape a previous release
//! wrote can be read. Each step is a pure function producing the shape of
//! exactly one version and is safe to run twice.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{Error, Result};
use crate::model::DEFAULT_PROJECT_TITLE;

/// The current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Start time given to legacy entries that never recorded one.
pub const LEGACY_START_TIME: &str = "09:00";

/// End time given to legacy entries that never recorded one.
pub const LEGACY_END_TIME: &str = "17:00";

/// A single upgrade step.
type MigrationStep = fn(Value) -> Value;

/// Upgrade steps keyed by the version they produce, in order.
const MIGRATIONS: &[(u32, MigrationStep)] = &[(1, migrate_v1)];

/// Read the schema version of a stored document.
///
/// Missing or non-integer versions count as 0, the unversioned shape.
#[must_use]
pub fn stored_version(document: &Value) -> u32 {
    document
        .get("version")
        .and_then(Value::as_u64)
        .and_then(|version| u32::try_from(version).ok())
        .unwrap_or(0)
}

/// Check whether a stored document is older than the current schema.
#[must_use]
pub fn needs_migration(document: &Value) -> bool {
    stored_version(document) < CURRENT_VERSION
}

/// Bring a document up to [`CURRENT_VERSION`].
///
/// Runs every step after the stored version in order. Documents that are
/// already current come back untouched.
///
/// # Errors
///
/// Returns an error if a required step is missing from the chain.
pub fn migrate(document: Value) -> Result<Value> {
    let from_version = stored_version(&document);
    let mut document = document;

    for version in (from_version + 1)..=CURRENT_VERSION {
        trace!("Applying migration to version {}", version);
        document = run_migration(document, version)?;
    }

    Ok(document)
}

/// Run the step that produces `version`.
fn run_migration(document: Value, version: u32) -> Result<Value> {
    MIGRATIONS
        .iter()
        .find(|(target, _)| *target == version)
        .map(|(_, step)| step(document))
        .ok_or_else(|| Error::migration(format!("unknown migration version: {version}")))
}

/// Migration to version 1: interval-era document shape.
///
/// Keeps the title and entries of the unversioned shape, defaulting either
/// when missing, and gives flat legacy entries a start and end time.
fn migrate_v1(document: Value) -> Value {
    let mut root = match document {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let title = match root.remove("projectTitle") {
        Some(Value::String(title)) => title,
        _ => DEFAULT_PROJECT_TITLE.to_string(),
    };

    let mut entries = match root.remove("entries") {
        Some(Value::Object(entries)) => entries,
        _ => Map::new(),
    };

    for entry in entries.values_mut() {
        let fields = object_mut(entry);
        if !has_intervals(fields) {
            fields
                .entry("startTime")
                .or_insert_with(|| Value::from(LEGACY_START_TIME));
            fields
                .entry("endTime")
                .or_insert_with(|| Value::from(LEGACY_END_TIME));
        }
    }

    root.insert("version".to_string(), Value::from(1));
    root.insert("projectTitle".to_string(), Value::String(title));
    root.insert("entries".to_string(), Value::Object(entries));
    Value::Object(root)
}

/// Fill in defaults that every version relies on.
///
/// Applied on every load, migrated or not: entry and interval `hours` and
/// `miles` become numbers (0 when absent or unreadable), a non-string title
/// is dropped so the default applies, and malformed `intervals` fields are
/// removed.
pub fn backfill(document: &mut Value) {
    let Value::Object(root) = document else {
        return;
    };

    if root
        .get("projectTitle")
        .is_some_and(|title| !title.is_string())
    {
        root.remove("projectTitle");
    }

    if !root.get("entries").is_some_and(Value::is_object) {
        root.remove("entries");
        return;
    }
    let Some(Value::Object(entries)) = root.get_mut("entries") else {
        return;
    };

    for entry in entries.values_mut() {
        let fields = object_mut(entry);
        coerce_number(fields, "hours");
        coerce_number(fields, "miles");

        match fields.get_mut("intervals") {
            Some(Value::Array(intervals)) => {
                for interval in intervals.iter_mut() {
                    let interval = object_mut(interval);
                    coerce_number(interval, "hours");
                    coerce_number(interval, "miles");
                }
            }
            Some(_) => {
                fields.remove("intervals");
            }
            None => {}
        }
    }
}

/// Borrow `value` as an object, replacing anything else with `{}`.
fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just made an object"),
    }
}

fn has_intervals(fields: &Map<String, Value>) -> bool {
    fields
        .get("intervals")
        .and_then(Value::as_array)
        .is_some_and(|intervals| !intervals.is_empty())
}

/// Make `fields[key]` a number, parsing numeric strings and using 0 otherwise.
fn coerce_number(fields: &mut Map<String, Value>, key: &str) {
    let number = match fields.get(key) {
        Some(Value::Number(_)) => return,
        Some(Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .unwrap_or(0.0),
        _ => 0.0,
    };
    fields.insert(key.to_string(), Value::from(number));
}
