//! Application state store.
//!
//! The store owns the user's canonical data (profile, medication list,
//! reminders, taken flags) and the two structures derived from the
//! medication list (interactions and schedule). Any change to the list
//! recomputes both derivations in full.
//!
//! Every mutation builds the next snapshot aside, persists it, and only then
//! commits it and notifies observers. A failed write leaves the store
//! exactly as it was.

use crate::catalog::default_catalog;
use crate::interactions::check_interactions;
use crate::persistence::SnapshotStore;
use crate::rules::default_rules;
use crate::schedule::generate_schedule;
use crate::{
    DerivedInteraction, InteractionRuleSet, MedicationCatalog, MedicationPatch, Reminder, Result,
    Schedule, TakenKey, TimeSlot, UserMedication, UserProfile,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Complete persisted state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StoreSnapshot {
    pub user_profile: UserProfile,
    pub medications: Vec<UserMedication>,
    pub schedule: Schedule,
    pub interactions: Vec<DerivedInteraction>,
    pub taken_medications: BTreeMap<TakenKey, bool>,
    pub reminders: Vec<Reminder>,
}

impl StoreSnapshot {
    pub fn medication(&self, id: &str) -> Option<&UserMedication> {
        self.medications.iter().find(|m| m.id == id)
    }

    /// Whether a dose is marked taken; absent keys count as not taken
    pub fn is_taken(&self, medication_id: &str, time_slot: TimeSlot, date: NaiveDate) -> bool {
        self.taken_medications
            .get(&TakenKey::new(medication_id, time_slot, date))
            .copied()
            .unwrap_or(false)
    }
}

/// Callback run after every committed mutation
pub type Observer = Box<dyn FnMut(&StoreSnapshot)>;

/// State container keeping derived data in step with the medication list
pub struct AppStateStore<'r> {
    catalog: &'r MedicationCatalog,
    rules: &'r InteractionRuleSet,
    backend: Box<dyn SnapshotStore>,
    snapshot: StoreSnapshot,
    observers: Vec<Observer>,
}

impl AppStateStore<'static> {
    /// Open a store over the default catalog and rule set
    pub fn open(backend: impl SnapshotStore + 'static) -> Result<Self> {
        Self::open_with(default_catalog(), default_rules(), backend)
    }
}

impl<'r> AppStateStore<'r> {
    /// Open a store, rehydrating from the backend if it holds a snapshot
    ///
    /// Derived structures are recomputed from the loaded medication list
    /// rather than trusted from storage.
    pub fn open_with(
        catalog: &'r MedicationCatalog,
        rules: &'r InteractionRuleSet,
        backend: impl SnapshotStore + 'static,
    ) -> Result<Self> {
        let mut snapshot = backend.load()?.unwrap_or_default();
        snapshot.interactions = check_interactions(catalog, rules, &snapshot.medications);
        snapshot.schedule = generate_schedule(catalog, &snapshot.medications);

        tracing::info!(
            "Opened store with {} medications, {} reminders",
            snapshot.medications.len(),
            snapshot.reminders.len()
        );

        Ok(Self {
            catalog,
            rules,
            backend: Box::new(backend),
            snapshot,
            observers: Vec::new(),
        })
    }

    pub fn snapshot(&self) -> &StoreSnapshot {
        &self.snapshot
    }

    pub fn catalog(&self) -> &'r MedicationCatalog {
        self.catalog
    }

    /// Register an observer; it runs after each committed mutation
    pub fn subscribe(&mut self, observer: impl FnMut(&StoreSnapshot) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn set_user_profile(&mut self, profile: UserProfile) -> Result<&StoreSnapshot> {
        let mut next = self.snapshot.clone();
        next.user_profile = profile;
        tracing::debug!("Replacing user profile");
        self.commit(next)
    }

    /// Append a medication; the caller guarantees its id is unique
    pub fn add_medication(&mut self, medication: UserMedication) -> Result<&StoreSnapshot> {
        tracing::debug!("Adding medication {} ({})", medication.id, medication.medication_id);
        let mut medications = self.snapshot.medications.clone();
        medications.push(medication);
        let next = self.with_medications(medications);
        self.commit(next)
    }

    /// Remove a medication by id; no-op if absent
    pub fn remove_medication(&mut self, id: &str) -> Result<&StoreSnapshot> {
        if self.snapshot.medication(id).is_none() {
            tracing::debug!("Remove ignored: no medication {}", id);
            return Ok(&self.snapshot);
        }

        tracing::debug!("Removing medication {}", id);
        let medications = self
            .snapshot
            .medications
            .iter()
            .filter(|m| m.id != id)
            .cloned()
            .collect();
        let next = self.with_medications(medications);
        self.commit(next)
    }

    /// Apply a patch to a medication by id; no-op if absent
    pub fn update_medication(&mut self, id: &str, patch: &MedicationPatch) -> Result<&StoreSnapshot> {
        if self.snapshot.medication(id).is_none() {
            tracing::debug!("Update ignored: no medication {}", id);
            return Ok(&self.snapshot);
        }

        tracing::debug!("Updating medication {}", id);
        let mut medications = self.snapshot.medications.clone();
        for medication in medications.iter_mut().filter(|m| m.id == id) {
            patch.apply(medication);
        }
        let next = self.with_medications(medications);
        self.commit(next)
    }

    /// Flip the taken flag for one dose; derived structures are untouched
    pub fn toggle_medication_taken(
        &mut self,
        medication_id: &str,
        time_slot: TimeSlot,
        date: NaiveDate,
    ) -> Result<&StoreSnapshot> {
        let mut next = self.snapshot.clone();
        let flag = next
            .taken_medications
            .entry(TakenKey::new(medication_id, time_slot, date))
            .or_insert(false);
        *flag = !*flag;
        tracing::debug!("Marked {} {} {} taken={}", medication_id, time_slot, date, flag);
        self.commit(next)
    }

    pub fn add_reminder(&mut self, reminder: Reminder) -> Result<&StoreSnapshot> {
        let mut next = self.snapshot.clone();
        tracing::debug!("Adding reminder {}", reminder.id);
        next.reminders.push(reminder);
        self.commit(next)
    }

    /// Remove a reminder by id; no-op if absent
    pub fn remove_reminder(&mut self, id: Uuid) -> Result<&StoreSnapshot> {
        if !self.snapshot.reminders.iter().any(|r| r.id == id) {
            return Ok(&self.snapshot);
        }

        let mut next = self.snapshot.clone();
        next.reminders.retain(|r| r.id != id);
        tracing::debug!("Removed reminder {}", id);
        self.commit(next)
    }

    /// Reset everything to the empty state
    pub fn clear_all_data(&mut self) -> Result<&StoreSnapshot> {
        tracing::info!("Clearing all data");
        self.commit(StoreSnapshot::default())
    }

    /// Next snapshot with a new medication list and both derivations recomputed
    fn with_medications(&self, medications: Vec<UserMedication>) -> StoreSnapshot {
        StoreSnapshot {
            interactions: check_interactions(self.catalog, self.rules, &medications),
            schedule: generate_schedule(self.catalog, &medications),
            medications,
            ..self.snapshot.clone()
        }
    }

    fn commit(&mut self, next: StoreSnapshot) -> Result<&StoreSnapshot> {
        if let Err(e) = self.backend.save(&next) {
            tracing::warn!("Failed to persist state, change discarded: {}", e);
            return Err(e);
        }

        self.snapshot = next;
        for observer in &mut self.observers {
            observer(&self.snapshot);
        }
        Ok(&self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{JsonFileStore, MemoryStore};
    use crate::{Error, Frequency, Severity};
    use chrono::{Duration, TimeZone, Utc};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn load(&self) -> Result<Option<StoreSnapshot>> {
            Ok(None)
        }

        fn save(&mut self, _snapshot: &StoreSnapshot) -> Result<()> {
            Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }
    }

    fn med(medication_id: &str, n: i64) -> UserMedication {
        UserMedication::new(
            medication_id,
            "500mg",
            Frequency::Once,
            None,
            Utc.timestamp_millis_opt(1_700_000_000_000).unwrap() + Duration::milliseconds(n),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn schedule_contents(schedule: &Schedule) -> Vec<(TimeSlot, Vec<(String, String)>)> {
        schedule
            .iter()
            .map(|(slot, entries)| {
                let contents = entries
                    .iter()
                    .map(|e| (e.medication.medication_id.clone(), e.medication.dosage.clone()))
                    .collect();
                (slot, contents)
            })
            .collect()
    }

    #[test]
    fn test_add_recomputes_derivations() {
        crate::logging::init_test();
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();

        store.add_medication(med("metformin", 0)).unwrap();
        let snapshot = store.add_medication(med("appleCiderVinegar", 1)).unwrap();

        assert_eq!(snapshot.medications.len(), 2);
        assert_eq!(snapshot.interactions.len(), 1);
        assert_eq!(snapshot.interactions[0].rule.severity, Severity::Moderate);
        assert_eq!(snapshot.schedule.morning.len(), 2);
        assert_eq!(snapshot.schedule.evening.len(), 1);
    }

    #[test]
    fn test_remove_recomputes_and_absent_is_noop() {
        let backend = MemoryStore::new();
        let mut store = AppStateStore::open(backend.clone()).unwrap();
        let metformin = med("metformin", 0);
        let metformin_id = metformin.id.clone();

        store.add_medication(metformin).unwrap();
        store.add_medication(med("magnesium", 1)).unwrap();
        assert_eq!(store.snapshot().interactions.len(), 1);
        assert_eq!(backend.save_count(), 2);

        store.remove_medication("does-not-exist").unwrap();
        assert_eq!(store.snapshot().medications.len(), 2);
        assert_eq!(backend.save_count(), 2);

        let snapshot = store.remove_medication(&metformin_id).unwrap();
        assert_eq!(snapshot.medications.len(), 1);
        assert!(snapshot.interactions.is_empty());
        assert!(snapshot.schedule.morning.is_empty());
        assert_eq!(snapshot.schedule.night.len(), 1);
    }

    #[test]
    fn test_update_applies_patch_field_by_field() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        let mut original = med("metformin", 0);
        original.notes = Some("after breakfast".into());
        let id = original.id.clone();
        store.add_medication(original).unwrap();

        let patch = MedicationPatch {
            dosage: Some("1000mg".into()),
            ..MedicationPatch::default()
        };
        let snapshot = store.update_medication(&id, &patch).unwrap();
        let updated = snapshot.medication(&id).unwrap();
        assert_eq!(updated.dosage, "1000mg");
        assert_eq!(updated.frequency, Frequency::Once);
        assert_eq!(updated.notes.as_deref(), Some("after breakfast"));
        assert_eq!(snapshot.schedule.morning[0].medication.dosage, "1000mg");

        let clear_notes = MedicationPatch {
            frequency: Some(Frequency::Twice),
            notes: Some(None),
            ..MedicationPatch::default()
        };
        let updated = store.update_medication(&id, &clear_notes).unwrap().medication(&id).unwrap();
        assert_eq!(updated.frequency, Frequency::Twice);
        assert_eq!(updated.notes, None);
        assert_eq!(updated.dosage, "1000mg");
    }

    #[test]
    fn test_update_absent_is_noop() {
        let backend = MemoryStore::new();
        let mut store = AppStateStore::open(backend.clone()).unwrap();
        store.add_medication(med("metformin", 0)).unwrap();
        let before = store.snapshot().clone();

        let patch = MedicationPatch {
            dosage: Some("850mg".into()),
            ..MedicationPatch::default()
        };
        store.update_medication("missing", &patch).unwrap();

        assert_eq!(store.snapshot(), &before);
        assert_eq!(backend.save_count(), 1);
    }

    #[test]
    fn test_toggle_taken_flips_and_leaves_derivations() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        store.add_medication(med("metformin", 0)).unwrap();
        let before = store.snapshot().clone();

        let snapshot = store
            .toggle_medication_taken("metformin_1700000000000", TimeSlot::Morning, date())
            .unwrap();
        assert!(snapshot.is_taken("metformin_1700000000000", TimeSlot::Morning, date()));
        assert!(!snapshot.is_taken("metformin_1700000000000", TimeSlot::Evening, date()));
        assert_eq!(snapshot.schedule, before.schedule);
        assert_eq!(snapshot.interactions, before.interactions);

        let snapshot = store
            .toggle_medication_taken("metformin_1700000000000", TimeSlot::Morning, date())
            .unwrap();
        assert!(!snapshot.is_taken("metformin_1700000000000", TimeSlot::Morning, date()));
        assert_eq!(snapshot.taken_medications.len(), 1);
    }

    #[test]
    fn test_reminders_independent_of_derivations() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        let reminder = Reminder::new("Take with breakfast", TimeSlot::Morning, None);
        let reminder_id = reminder.id;

        let snapshot = store.add_reminder(reminder).unwrap();
        assert_eq!(snapshot.reminders.len(), 1);
        assert!(snapshot.schedule.is_empty());

        store.remove_reminder(Uuid::new_v4()).unwrap();
        assert_eq!(store.snapshot().reminders.len(), 1);

        let snapshot = store.remove_reminder(reminder_id).unwrap();
        assert!(snapshot.reminders.is_empty());
    }

    #[test]
    fn test_remove_then_readd_is_idempotent() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        store.add_medication(med("metformin", 0)).unwrap();
        store.add_medication(med("appleCiderVinegar", 1)).unwrap();
        let magnesium = med("magnesium", 2);
        let magnesium_id = magnesium.id.clone();
        store.add_medication(magnesium.clone()).unwrap();

        let before = store.snapshot().clone();

        store.remove_medication(&magnesium_id).unwrap();
        let readded = UserMedication::new(
            magnesium.medication_id.clone(),
            magnesium.dosage.clone(),
            magnesium.frequency,
            magnesium.notes.clone(),
            magnesium.added_date + Duration::seconds(30),
        );
        assert_ne!(readded.id, magnesium_id);
        let after = store.add_medication(readded).unwrap();

        assert_eq!(after.interactions, before.interactions);
        assert_eq!(
            schedule_contents(&after.schedule),
            schedule_contents(&before.schedule)
        );
    }

    #[test]
    fn test_clear_all_data_resets_everything() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        store
            .set_user_profile(UserProfile {
                name: "Sam".into(),
                age: "34".into(),
                allergies: vec!["penicillin".into()],
                is_pregnant: true,
                ..UserProfile::default()
            })
            .unwrap();
        store.add_medication(med("metformin", 0)).unwrap();
        store.add_medication(med("appleCiderVinegar", 1)).unwrap();
        store
            .toggle_medication_taken("metformin_1700000000000", TimeSlot::Morning, date())
            .unwrap();
        store
            .add_reminder(Reminder::new("Evening dose", TimeSlot::Evening, None))
            .unwrap();

        let snapshot = store.clear_all_data().unwrap();

        assert_eq!(snapshot.user_profile, UserProfile::default());
        assert!(snapshot.medications.is_empty());
        assert!(snapshot.interactions.is_empty());
        assert!(snapshot.schedule.is_empty());
        assert!(snapshot.reminders.is_empty());
        assert!(snapshot.taken_medications.is_empty());
    }

    #[test]
    fn test_failed_persist_leaves_state_unchanged() {
        let mut store = AppStateStore::open(FailingStore).unwrap();
        let calls = Rc::new(RefCell::new(0));
        let seen = calls.clone();
        store.subscribe(move |_| *seen.borrow_mut() += 1);

        let result = store.add_medication(med("metformin", 0));
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(store.snapshot().medications.is_empty());
        assert!(store.snapshot().schedule.is_empty());
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_observers_fire_once_per_effective_mutation() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        let counts = Rc::new(RefCell::new(Vec::new()));
        let seen = counts.clone();
        store.subscribe(move |snapshot| seen.borrow_mut().push(snapshot.medications.len()));

        store.add_medication(med("metformin", 0)).unwrap();
        store.remove_medication("missing").unwrap();
        store.add_medication(med("inositol", 1)).unwrap();

        assert_eq!(*counts.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_rehydrates_from_disk_and_recomputes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state_dir = temp_dir.path().to_path_buf();

        {
            let mut store =
                AppStateStore::open(JsonFileStore::in_dir(&state_dir, "medtrack-storage")).unwrap();
            store.add_medication(med("metformin", 0)).unwrap();
            store.add_medication(med("magnesium", 1)).unwrap();
        }

        let store =
            AppStateStore::open(JsonFileStore::in_dir(&state_dir, "medtrack-storage")).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.medications.len(), 2);
        assert_eq!(snapshot.interactions.len(), 1);
        assert_eq!(snapshot.schedule.night.len(), 1);
    }

    #[test]
    fn test_stale_derivations_are_replaced_on_open() {
        let mut stale = StoreSnapshot::default();
        stale.medications.push(med("multivitamin", 0));
        // Derived fields deliberately left empty

        let store = AppStateStore::open(MemoryStore::with_snapshot(stale)).unwrap();
        assert_eq!(store.snapshot().schedule.morning.len(), 1);
    }

    #[test]
    fn test_dangling_medication_is_tolerated() {
        let mut store = AppStateStore::open(MemoryStore::new()).unwrap();
        let snapshot = store.add_medication(med("discontinuedDrug", 0)).unwrap();

        assert_eq!(snapshot.medications.len(), 1);
        assert!(snapshot.schedule.is_empty());
        assert!(snapshot.interactions.is_empty());
    }
}
