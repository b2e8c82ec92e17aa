//! Loading and saving the project document.
//!
//! Neither direction ever fails from the caller's point of view. A load that
//! hits a corrupt or unreadable store falls back to a fresh document, keeping
//! a copy of any corrupt text under a backup key. A save that the primary
//! store rejects is retried once against the session-scoped fallback before
//! being dropped. Documents written by a newer schema are never overwritten.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::migrations::{self, CURRENT_VERSION};
use super::schema::{BACKUP_KEY_PREFIX, PROJECT_KEY};
use super::KeyValueStore;
use crate::error::{Error, Result};
use crate::model::{ProjectDocument, DEFAULT_PROJECT_TITLE};

/// Where a save ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written to durable storage.
    Primary,
    /// Durable storage failed; written to the session fallback.
    Fallback,
    /// Both stores failed; the write was lost.
    Dropped,
    /// The stored document has a newer schema; nothing was written.
    ReadOnly,
}

/// Load/save capability handed to the application controller.
pub trait ProjectStore {
    /// Load the project, never failing.
    fn load(&mut self) -> ProjectDocument;

    /// Save the project, stamping it with the current schema version.
    fn save(&mut self, document: &mut ProjectDocument) -> SaveOutcome;
}

impl<S: ProjectStore + ?Sized> ProjectStore for &mut S {
    fn load(&mut self) -> ProjectDocument {
        (**self).load()
    }

    fn save(&mut self, document: &mut ProjectDocument) -> SaveOutcome {
        (**self).save(document)
    }
}

/// Versioned persistence over a primary and a fallback key-value store.
#[derive(Debug)]
pub struct Persistence<P, F> {
    primary: P,
    fallback: F,
    default_title: String,
    read_only: bool,
}

impl<P: KeyValueStore, F: KeyValueStore> Persistence<P, F> {
    /// Create a persistence layer over the given stores.
    #[must_use]
    pub fn new(primary: P, fallback: F) -> Self {
        Self {
            primary,
            fallback,
            default_title: DEFAULT_PROJECT_TITLE.to_string(),
            read_only: false,
        }
    }

    /// Use a different title for freshly created documents.
    #[must_use]
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    /// The durable store.
    #[must_use]
    pub fn primary(&self) -> &P {
        &self.primary
    }

    /// Mutable access to the durable store.
    pub fn primary_mut(&mut self) -> &mut P {
        &mut self.primary
    }

    /// The session fallback store.
    #[must_use]
    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    /// Load the project document, migrating older shapes.
    ///
    /// Returns a fresh document when nothing is stored, or when the stored
    /// data cannot be read or parsed. Text that cannot be parsed is copied
    /// to a backup key first.
    pub fn load_project_data(&mut self) -> ProjectDocument {
        self.read_only = false;

        let raw = match self.primary.get(PROJECT_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored project data, creating a new project");
                return self.fresh_document();
            }
            Err(e) => {
                error!("Failed to read project data, starting fresh: {}", e);
                return self.fresh_document();
            }
        };

        match self.decode(&raw) {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to load project data, starting fresh: {}", e);
                match self.write_backup(&raw) {
                    Ok(key) => warn!("Kept the unreadable project data in {}", key),
                    Err(e) => error!("Failed to back up unreadable project data: {}", e),
                }
                self.fresh_document()
            }
        }
    }

    /// Whether the last load found a document from a newer schema.
    ///
    /// Saves are refused while this is set.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Save the project document.
    ///
    /// Stamps the document with [`CURRENT_VERSION`] first. Returns
    /// [`SaveOutcome::ReadOnly`] without writing if the stored document is
    /// newer than this schema.
    pub fn save_project_data(&mut self, document: &mut ProjectDocument) -> SaveOutcome {
        if self.read_only {
            warn!(
                "Stored project data is newer than version {}; not overwriting it",
                CURRENT_VERSION
            );
            return SaveOutcome::ReadOnly;
        }
        document.version = CURRENT_VERSION;

        let serialized = match serde_json::to_string(document) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!("Failed to serialize project data, dropping save: {}", e);
                return SaveOutcome::Dropped;
            }
        };

        match self.primary.set(PROJECT_KEY, &serialized) {
            Ok(()) => {
                debug!("Saved project data ({} entries)", document.entries.len());
                return SaveOutcome::Primary;
            }
            Err(e) => warn!("Primary store rejected save, trying session store: {}", e),
        }

        match self.fallback.set(PROJECT_KEY, &serialized) {
            Ok(()) => {
                warn!("Project data saved to session store only");
                SaveOutcome::Fallback
            }
            Err(e) => {
                error!("Failed to save project data: {}", e);
                SaveOutcome::Dropped
            }
        }
    }

    /// Keys of all backups, oldest first.
    ///
    /// A backup is written before each migration and whenever stored text
    /// cannot be parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the primary store cannot be read.
    pub fn list_backups(&self) -> Result<Vec<String>> {
        self.primary.keys_with_prefix(BACKUP_KEY_PREFIX)
    }

    fn fresh_document(&self) -> ProjectDocument {
        ProjectDocument::new(self.default_title.clone())
    }

    fn decode(&mut self, raw: &str) -> Result<ProjectDocument> {
        let mut value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(Error::migration("stored project data is not a JSON object"));
        }

        let version = migrations::stored_version(&value);
        if version > CURRENT_VERSION {
            warn!(
                "Stored project data is version {}, newer than {}; loading read-only",
                version, CURRENT_VERSION
            );
        }

        let migrated = migrations::needs_migration(&value);
        let mut backed_up = false;
        if migrated {
            backed_up = match self.write_backup(raw) {
                Ok(key) => {
                    info!("Backed up version {} project data to {}", version, key);
                    true
                }
                Err(e) => {
                    warn!("Failed to back up project data before migrating: {}", e);
                    false
                }
            };
            value = migrations::migrate(value)?;
        }

        migrations::backfill(&mut value);
        let mut document: ProjectDocument = serde_json::from_value(value)?;
        self.read_only = version > CURRENT_VERSION;

        if migrated {
            info!("Migrated project data from version {} to {}", version, CURRENT_VERSION);
            // Without a backup the stored original stays untouched until the next save
            if backed_up {
                self.save_project_data(&mut document);
            }
        }

        Ok(document)
    }

    fn write_backup(&mut self, raw: &str) -> Result<String> {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let key = format!("{BACKUP_KEY_PREFIX}{stamp}");
        self.primary.set(&key, raw)?;
        Ok(key)
    }
}

impl<P: KeyValueStore, F: KeyValueStore> ProjectStore for Persistence<P, F> {
    fn load(&mut self) -> ProjectDocument {
        self.load_project_data()
    }

    fn save(&mut self, document: &mut ProjectDocument) -> SaveOutcome {
        self.save_project_data(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::model::{DayEntry, Interval};
    use crate::storage::{MemoryStore, SqliteStore};
    use serde_json::json;

    fn create_test_persistence() -> Persistence<MemoryStore, MemoryStore> {
        init_test_logging();
        Persistence::new(MemoryStore::new(), MemoryStore::new())
    }

    fn with_stored(raw: &str) -> Persistence<MemoryStore, MemoryStore> {
        let mut persistence = create_test_persistence();
        persistence.primary_mut().set(PROJECT_KEY, raw).unwrap();
        persistence
    }

    fn sample_document() -> ProjectDocument {
        let mut doc = ProjectDocument::new("Greenhouse");
        doc.entries.insert(
            "2024-01-10".to_string(),
            DayEntry::from_intervals(vec![
                Interval::new("08:00", "12:00", Some(100.0), Some(110.0)),
                Interval::new("13:00", "16:00", Some(110.0), Some(115.5)),
            ]),
        );
        doc.entries.insert(
            "2024-01-11".to_string(),
            DayEntry::from_intervals(vec![Interval::new("22:00", "02:00", None, None)]),
        );
        doc
    }

    #[test]
    fn test_load_absent_creates_default() {
        let mut persistence = create_test_persistence();
        let doc = persistence.load_project_data();

        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"version": 1, "projectTitle": "Plants", "entries": {}})
        );
        // Nothing written for a fresh project
        assert!(persistence.primary().is_empty());
    }

    #[test]
    fn test_load_absent_uses_configured_title() {
        let mut persistence = create_test_persistence().with_default_title("Deliveries");
        assert_eq!(persistence.load_project_data().project_title, "Deliveries");
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut persistence = create_test_persistence();
        let mut doc = sample_document();
        doc.version = 0;

        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::Primary);
        assert_eq!(doc.version, CURRENT_VERSION);

        let loaded = persistence.load_project_data();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrates_legacy_document() {
        let legacy = json!({
            "projectTitle": "Old Project",
            "entries": {"2024-01-01": {"hours": 8, "miles": 10}}
        })
        .to_string();
        let mut persistence = with_stored(&legacy);

        let doc = persistence.load_project_data();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.project_title, "Old Project");
        let entry = &doc.entries["2024-01-01"];
        assert_eq!(entry.start_time.as_deref(), Some("09:00"));
        assert_eq!(entry.end_time.as_deref(), Some("17:00"));
        assert!((entry.hours - 8.0).abs() < f64::EPSILON);
        assert!((entry.miles - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_migration_writes_backup_of_raw_text() {
        let legacy = r#"{"projectTitle":"Old","entries":{}}"#;
        let mut persistence = with_stored(legacy);

        persistence.load_project_data();

        let backups = persistence.list_backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert!(backups[0].starts_with("projectData_backup_"));
        assert!(backups[0].ends_with('Z'));
        assert_eq!(
            persistence.primary().get(&backups[0]).unwrap().as_deref(),
            Some(legacy)
        );
    }

    #[test]
    fn test_migration_writes_through() {
        let mut persistence = with_stored(r#"{"projectTitle":"Old","entries":{}}"#);
        persistence.load_project_data();

        let stored = persistence.primary().get(PROJECT_KEY).unwrap().unwrap();
        let stored: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(stored["version"], 1);
        assert_eq!(stored["projectTitle"], "Old");
    }

    #[test]
    fn test_second_load_is_noop() {
        let mut persistence = with_stored(r#"{"projectTitle":"Old","entries":{"2024-01-01":{}}}"#);

        let first = persistence.load_project_data();
        let stored_after_first = persistence.primary().get(PROJECT_KEY).unwrap();
        let second = persistence.load_project_data();

        assert_eq!(first, second);
        assert_eq!(persistence.list_backups().unwrap().len(), 1);
        assert_eq!(persistence.primary().get(PROJECT_KEY).unwrap(), stored_after_first);
    }

    #[test]
    fn test_current_version_skips_backup_and_backfills() {
        let current = json!({
            "version": 1,
            "projectTitle": "Current",
            "entries": {"2024-05-01": {"hours": 2}}
        })
        .to_string();
        let mut persistence = with_stored(&current);

        let doc = persistence.load_project_data();
        assert!(persistence.list_backups().unwrap().is_empty());
        assert_eq!(doc.project_title, "Current");
        let entry = &doc.entries["2024-05-01"];
        assert!((entry.hours - 2.0).abs() < f64::EPSILON);
        assert!(entry.miles.abs() < f64::EPSILON);
        // Backfill does not invent legacy times on current documents
        assert!(entry.start_time.is_none());
        // And the stored text is left as it was
        assert_eq!(
            persistence.primary().get(PROJECT_KEY).unwrap().as_deref(),
            Some(current.as_str())
        );
    }

    #[test]
    fn test_newer_version_loads_as_is() {
        let newer = r#"{"version":7,"projectTitle":"Future","entries":{}}"#;
        let mut persistence = with_stored(newer);

        let doc = persistence.load_project_data();
        assert_eq!(doc.version, 7);
        assert_eq!(doc.project_title, "Future");
        assert!(persistence.is_read_only());
        assert!(persistence.list_backups().unwrap().is_empty());
    }

    #[test]
    fn test_newer_version_is_never_overwritten() {
        let newer = r#"{"version":7,"projectTitle":"Future","entries":{},"newField":42}"#;
        let mut persistence = with_stored(newer);

        let mut doc = persistence.load_project_data();
        doc.project_title = "Changed".to_string();
        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::ReadOnly);
        assert_eq!(doc.version, 7);

        assert_eq!(
            persistence.primary().get(PROJECT_KEY).unwrap().as_deref(),
            Some(newer)
        );
        assert!(persistence.fallback().is_empty());
    }

    #[test]
    fn test_read_only_cleared_by_next_load() {
        let mut persistence = with_stored(r#"{"version":7,"projectTitle":"Future","entries":{}}"#);
        persistence.load_project_data();
        assert!(persistence.is_read_only());

        persistence
            .primary_mut()
            .set(PROJECT_KEY, r#"{"version":1,"projectTitle":"Now","entries":{}}"#)
            .unwrap();
        let mut doc = persistence.load_project_data();
        assert!(!persistence.is_read_only());
        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::Primary);
    }

    #[test]
    fn test_corrupt_json_returns_default() {
        let mut persistence = with_stored("{not json");
        let doc = persistence.load_project_data();
        assert_eq!(doc, ProjectDocument::default());
        // The corrupt text is not overwritten by the load itself
        assert_eq!(
            persistence.primary().get(PROJECT_KEY).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_corrupt_json_is_backed_up() {
        let mut persistence = with_stored("{not json");
        let mut doc = persistence.load_project_data();

        let backups = persistence.list_backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            persistence.primary().get(&backups[0]).unwrap().as_deref(),
            Some("{not json")
        );

        // Saving the fresh document afterwards leaves the copy in place
        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::Primary);
        assert_eq!(
            persistence.primary().get(&backups[0]).unwrap().as_deref(),
            Some("{not json")
        );
    }

    #[test]
    fn test_non_object_json_returns_default() {
        let mut persistence = with_stored("[1, 2, 3]");
        assert_eq!(persistence.load_project_data(), ProjectDocument::default());
        assert_eq!(persistence.list_backups().unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_store_returns_default() {
        let mut persistence = with_stored(r#"{"version":1,"projectTitle":"X","entries":{}}"#);
        persistence.primary_mut().set_fail_reads(true);
        assert_eq!(persistence.load_project_data(), ProjectDocument::default());
        assert!(!persistence.is_read_only());
    }

    #[test]
    fn test_failed_backup_skips_write_through() {
        let legacy = r#"{"projectTitle":"Old","entries":{}}"#;
        let mut persistence = with_stored(legacy);
        persistence.primary_mut().set_fail_writes(true);

        let doc = persistence.load_project_data();
        assert_eq!(doc.project_title, "Old");
        assert_eq!(doc.version, CURRENT_VERSION);

        persistence.primary_mut().set_fail_writes(false);
        assert!(persistence.list_backups().unwrap().is_empty());
        assert_eq!(
            persistence.primary().get(PROJECT_KEY).unwrap().as_deref(),
            Some(legacy)
        );
        assert!(persistence.fallback().is_empty());
    }

    #[test]
    fn test_save_falls_back_to_session_store() {
        let mut persistence = create_test_persistence();
        persistence.primary_mut().set_fail_writes(true);

        let mut doc = sample_document();
        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::Fallback);

        let saved = persistence.fallback().get(PROJECT_KEY).unwrap().unwrap();
        let saved: ProjectDocument = serde_json::from_str(&saved).unwrap();
        assert_eq!(saved, doc);
    }

    #[test]
    fn test_save_dropped_when_both_fail() {
        init_test_logging();
        let mut primary = MemoryStore::new();
        primary.set_fail_writes(true);
        let mut persistence = Persistence::new(primary, MemoryStore::unavailable());

        let mut doc = sample_document();
        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::Dropped);
    }

    #[test]
    fn test_project_store_trait() {
        let mut persistence = create_test_persistence();
        let store: &mut dyn ProjectStore = &mut persistence;

        let mut doc = store.load();
        doc.project_title = "Renamed".to_string();
        assert_eq!(store.save(&mut doc), SaveOutcome::Primary);
        assert_eq!(store.load().project_title, "Renamed");
    }

    #[test]
    fn test_project_store_through_mut_reference() {
        let mut persistence = create_test_persistence();
        {
            let mut borrowed = &mut persistence;
            let mut doc = ProjectStore::load(&mut borrowed);
            doc.project_title = "Borrowed".to_string();
            assert_eq!(ProjectStore::save(&mut borrowed, &mut doc), SaveOutcome::Primary);
        }
        assert_eq!(persistence.load_project_data().project_title, "Borrowed");
    }

    #[test]
    fn test_sqlite_round_trip() {
        let primary = SqliteStore::open_in_memory().unwrap();
        let mut persistence = Persistence::new(primary, MemoryStore::new());

        let mut doc = sample_document();
        assert_eq!(persistence.save_project_data(&mut doc), SaveOutcome::Primary);
        assert_eq!(persistence.load_project_data(), doc);
    }

    #[test]
    fn test_sqlite_migration_backup() {
        let mut primary = SqliteStore::open_in_memory().unwrap();
        primary
            .set(PROJECT_KEY, r#"{"projectTitle":"Old","entries":{"2024-01-01":{"hours":8}}}"#)
            .unwrap();
        let mut persistence = Persistence::new(primary, MemoryStore::new());

        let doc = persistence.load_project_data();
        assert_eq!(doc.entries["2024-01-01"].end_time.as_deref(), Some("17:00"));
        assert_eq!(persistence.list_backups().unwrap().len(), 1);
    }
}
