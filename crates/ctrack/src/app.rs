//! Application state and the operations a front end drives.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::aggregate::Totals;
use crate::calendar::{MonthCursor, MonthView};
use crate::editor::EntryEditor;
use crate::error::{Error, Result};
use crate::model::{DayEntry, ProjectDocument};
use crate::storage::{ProjectStore, SaveOutcome};

/// Owns the project document, the month on screen, and the store it
/// persists through.
///
/// The document is loaded once in [`Tracker::open`]. Every change that
/// should survive is saved immediately. Dropping the tracker retries the
/// save only if a change has not yet reached durable storage, so opening
/// and closing without edits never writes.
#[derive(Debug)]
pub struct Tracker<S: ProjectStore> {
    store: S,
    document: ProjectDocument,
    cursor: MonthCursor,
    today: NaiveDate,
    dirty: bool,
}

impl<S: ProjectStore> Tracker<S> {
    /// Load the project and show the month containing `today`.
    pub fn open(mut store: S, today: NaiveDate) -> Self {
        let document = store.load();
        debug!(
            "Opened project '{}' with {} entries",
            document.project_title,
            document.entries.len()
        );
        Self {
            store,
            document,
            cursor: MonthCursor::from_date(today),
            today,
            dirty: false,
        }
    }

    /// The in-memory document.
    #[must_use]
    pub fn document(&self) -> &ProjectDocument {
        &self.document
    }

    /// The store this tracker saves through.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The project's title.
    #[must_use]
    pub fn project_title(&self) -> &str {
        &self.document.project_title
    }

    /// Rename the project and save.
    pub fn set_project_title(&mut self, title: impl Into<String>) -> SaveOutcome {
        self.document.project_title = title.into();
        self.dirty = true;
        self.flush()
    }

    /// Whether a change has not been written to durable storage yet.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The date treated as today.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The month on screen.
    #[must_use]
    pub fn cursor(&self) -> MonthCursor {
        self.cursor
    }

    /// Jump to a specific month.
    pub fn show_month(&mut self, cursor: MonthCursor) {
        self.cursor = cursor;
    }

    /// Step forward one month.
    pub fn next_month(&mut self) -> MonthCursor {
        self.cursor = self.cursor.next();
        self.cursor
    }

    /// Step back one month.
    pub fn prev_month(&mut self) -> MonthCursor {
        self.cursor = self.cursor.prev();
        self.cursor
    }

    /// Totals for the month on screen.
    #[must_use]
    pub fn month_totals(&self) -> Totals {
        self.month_view().totals
    }

    /// Grid of the month on screen.
    #[must_use]
    pub fn month_view(&self) -> MonthView {
        MonthView::build(&self.document, self.cursor, self.today)
    }

    /// The entry logged for `date`, if any.
    #[must_use]
    pub fn entry(&self, date: NaiveDate) -> Option<&DayEntry> {
        self.document.entry(date)
    }

    /// Open an editor for `date`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FutureDate`] for days after today.
    pub fn edit_day(&self, date: NaiveDate) -> Result<EntryEditor> {
        if date > self.today {
            return Err(Error::FutureDate { date });
        }
        Ok(EntryEditor::open(date, self.entry(date)))
    }

    /// Validate the editor and store its entry, replacing the day's old one.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every bad interval, or
    /// [`Error::FutureDate`]. Nothing is changed on error.
    pub fn save_entry(&mut self, editor: &EntryEditor) -> Result<SaveOutcome> {
        let date = editor.date();
        if date > self.today {
            return Err(Error::FutureDate { date });
        }

        let entry = editor.commit()?;
        info!(
            "Logged {} interval(s) for {}: {:.2}h, {:.1}mi",
            entry.intervals.len(),
            date,
            entry.hours,
            entry.miles
        );
        self.document.set_entry(date, entry);
        self.dirty = true;
        Ok(self.flush())
    }

    /// Save the document now.
    ///
    /// Clears the dirty flag once the save reaches durable storage.
    pub fn flush(&mut self) -> SaveOutcome {
        let outcome = self.store.save(&mut self.document);
        if outcome == SaveOutcome::Primary {
            self.dirty = false;
        }
        outcome
    }
}

impl<S: ProjectStore> Drop for Tracker<S> {
    fn drop(&mut self) {
        if self.dirty {
            debug!("Saving unsaved project changes on shutdown");
            self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::IntervalDraft;
    use crate::storage::{KeyValueStore, MemoryStore, Persistence};

    /// Counts saves and keeps the last saved document.
    #[derive(Debug, Default)]
    struct RecordingStore {
        initial: Option<ProjectDocument>,
        saves: usize,
        last_saved: Option<ProjectDocument>,
        reject: bool,
    }

    impl ProjectStore for RecordingStore {
        fn load(&mut self) -> ProjectDocument {
            self.initial.clone().unwrap_or_default()
        }

        fn save(&mut self, document: &mut ProjectDocument) -> SaveOutcome {
            self.saves += 1;
            self.last_saved = Some(document.clone());
            if self.reject {
                SaveOutcome::Fallback
            } else {
                SaveOutcome::Primary
            }
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        date(2024, 1, 20)
    }

    #[test]
    fn test_open_loads_document() {
        let mut initial = ProjectDocument::new("Loaded");
        initial.set_entry(date(2024, 1, 5), DayEntry::default());
        let store = RecordingStore {
            initial: Some(initial),
            ..RecordingStore::default()
        };

        let tracker = Tracker::open(store, today());
        assert_eq!(tracker.project_title(), "Loaded");
        assert!(tracker.entry(date(2024, 1, 5)).is_some());
        assert_eq!(tracker.cursor(), MonthCursor::new(2024, 1).unwrap());
    }

    #[test]
    fn test_save_entry_updates_and_saves() {
        let mut tracker = Tracker::open(RecordingStore::default(), today());

        let mut editor = tracker.edit_day(date(2024, 1, 15)).unwrap();
        *editor.current_mut() =
            IntervalDraft::new("09:00", "13:00").with_mileage(Some(0.0), Some(10.0));
        editor.add_interval();
        *editor.current_mut() =
            IntervalDraft::new("14:00", "17:00").with_mileage(Some(10.0), Some(15.0));

        assert_eq!(tracker.save_entry(&editor).unwrap(), SaveOutcome::Primary);
        assert_eq!(tracker.store().saves, 1);

        let totals = tracker.month_totals();
        assert!((totals.hours - 7.0).abs() < f64::EPSILON);
        assert!((totals.miles - 15.0).abs() < f64::EPSILON);

        let saved = tracker.store().last_saved.as_ref().unwrap();
        assert!(saved.entries.contains_key("2024-01-15"));
    }

    #[test]
    fn test_invalid_entry_is_not_saved() {
        let mut tracker = Tracker::open(RecordingStore::default(), today());
        let mut editor = tracker.edit_day(date(2024, 1, 15)).unwrap();
        editor.current_mut().start_time = "09:00".to_string();

        let err = tracker.save_entry(&editor).unwrap_err();
        assert!(err.is_validation_error());
        assert!(err.to_string().contains("interval 1: end time is missing"));
        assert!(tracker.entry(date(2024, 1, 15)).is_none());
        assert_eq!(tracker.store().saves, 0);
    }

    #[test]
    fn test_future_dates_rejected() {
        let tracker = Tracker::open(RecordingStore::default(), today());
        assert!(tracker.edit_day(today()).is_ok());
        let err = tracker.edit_day(date(2024, 1, 21)).unwrap_err();
        assert!(matches!(err, Error::FutureDate { .. }));
    }

    #[test]
    fn test_month_navigation() {
        let mut tracker = Tracker::open(RecordingStore::default(), today());
        assert_eq!(tracker.prev_month(), MonthCursor::new(2023, 12).unwrap());
        assert_eq!(tracker.next_month(), MonthCursor::new(2024, 1).unwrap());
        tracker.show_month(MonthCursor::new(2024, 6).unwrap());
        assert_eq!(tracker.month_view().days.len(), 30);
    }

    #[test]
    fn test_month_totals_follow_cursor() {
        let mut initial = ProjectDocument::default();
        initial.set_entry(
            date(2023, 12, 31),
            DayEntry::from_intervals(vec![crate::model::Interval::new("09:00", "10:00", None, None)]),
        );
        let store = RecordingStore {
            initial: Some(initial),
            ..RecordingStore::default()
        };
        let mut tracker = Tracker::open(store, today());

        assert_eq!(tracker.month_totals(), Totals::default());
        tracker.prev_month();
        assert!((tracker.month_totals().hours - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_set_project_title_saves() {
        let mut tracker = Tracker::open(RecordingStore::default(), today());
        tracker.set_project_title("Orchard");
        assert_eq!(tracker.project_title(), "Orchard");
        assert_eq!(
            tracker.store().last_saved.as_ref().unwrap().project_title,
            "Orchard"
        );
    }

    #[test]
    fn test_drop_without_changes_does_not_save() {
        let mut store = RecordingStore::default();
        {
            let mut tracker = Tracker::open(&mut store, today());
            tracker.next_month();
            let _ = tracker.month_view();
            assert!(!tracker.is_dirty());
        }
        assert_eq!(store.saves, 0);
    }

    #[test]
    fn test_drop_after_saved_change_does_not_save_again() {
        let mut store = RecordingStore::default();
        {
            let mut tracker = Tracker::open(&mut store, today());
            tracker.set_project_title("Orchard");
            assert!(!tracker.is_dirty());
        }
        assert_eq!(store.saves, 1);
    }

    #[test]
    fn test_drop_retries_unsaved_change() {
        let mut store = RecordingStore {
            reject: true,
            ..RecordingStore::default()
        };
        {
            let mut tracker = Tracker::open(&mut store, today());
            assert_eq!(tracker.set_project_title("Orchard"), SaveOutcome::Fallback);
            assert!(tracker.is_dirty());
        }
        assert_eq!(store.saves, 2);
        assert_eq!(store.last_saved.unwrap().project_title, "Orchard");
    }

    #[test]
    fn test_drop_keeps_unreadable_store_intact() {
        let mut primary = MemoryStore::new();
        primary
            .set(
                "projectData",
                r#"{"version":1,"projectTitle":"Kept","entries":{"2024-01-02":{"hours":3}}}"#,
            )
            .unwrap();
        let stored = primary.get("projectData").unwrap();
        primary.set_fail_reads(true);
        let mut persistence = Persistence::new(primary, MemoryStore::new());

        {
            let tracker = Tracker::open(&mut persistence, today());
            assert_eq!(tracker.project_title(), "Plants");
        }

        persistence.primary_mut().set_fail_reads(false);
        assert_eq!(persistence.primary().get("projectData").unwrap(), stored);
    }

    #[test]
    fn test_drop_keeps_newer_document_intact() {
        let newer = r#"{"version":7,"projectTitle":"Future","entries":{},"newField":42}"#;
        let mut primary = MemoryStore::new();
        primary.set("projectData", newer).unwrap();
        let mut persistence = Persistence::new(primary, MemoryStore::new());

        {
            let mut tracker = Tracker::open(&mut persistence, today());
            assert_eq!(tracker.set_project_title("Changed"), SaveOutcome::ReadOnly);
        }

        assert_eq!(
            persistence.primary().get("projectData").unwrap().as_deref(),
            Some(newer)
        );
    }

    #[test]
    fn test_end_to_end_with_persistence() {
        let persistence = Persistence::new(MemoryStore::new(), MemoryStore::new());
        let mut tracker = Tracker::open(persistence, today());

        let mut editor = tracker.edit_day(date(2024, 1, 2)).unwrap();
        *editor.current_mut() = IntervalDraft::new("23:00", "01:00");
        tracker.save_entry(&editor).unwrap();

        let reloaded = Tracker::open(
            Persistence::new(tracker.store().primary().clone(), MemoryStore::new()),
            today(),
        );
        let entry = reloaded.entry(date(2024, 1, 2)).unwrap();
        assert!((entry.hours - 2.0).abs() < f64::EPSILON);
    }
}
