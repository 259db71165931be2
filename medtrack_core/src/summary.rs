//! Read-only dashboard views computed from a snapshot.

use crate::store::StoreSnapshot;
use crate::{Schedule, ScheduleEntry, Severity, TimeSlot};
use chrono::NaiveDate;

/// Headline counts for the dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardSummary {
    pub medication_count: usize,
    pub scheduled_doses: usize,
    pub interaction_count: usize,
    pub highest_severity: Option<Severity>,
}

impl DashboardSummary {
    pub fn from_snapshot(snapshot: &StoreSnapshot) -> Self {
        Self {
            medication_count: snapshot.medications.len(),
            scheduled_doses: snapshot.schedule.total_doses(),
            interaction_count: snapshot.interactions.len(),
            highest_severity: snapshot.interactions.iter().map(|i| i.rule.severity).max(),
        }
    }
}

/// A schedule entry tagged with its slot
#[derive(Clone, Copy, Debug)]
pub struct UpcomingDose<'a> {
    pub slot: TimeSlot,
    pub entry: &'a ScheduleEntry,
}

/// First `limit` doses of the day, morning through night
pub fn upcoming_doses(schedule: &Schedule, limit: usize) -> Vec<UpcomingDose<'_>> {
    schedule
        .iter()
        .flat_map(|(slot, entries)| entries.iter().map(move |entry| UpcomingDose { slot, entry }))
        .take(limit)
        .collect()
}

/// Taken vs. scheduled doses for one day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct DailyProgress {
    pub taken: usize,
    pub scheduled: usize,
}

/// Count scheduled doses marked taken on `date`
///
/// Doses are keyed by the user medication id, so two entries for the same
/// catalog medication are tracked separately.
pub fn daily_progress(snapshot: &StoreSnapshot, date: NaiveDate) -> DailyProgress {
    snapshot
        .schedule
        .iter()
        .flat_map(|(slot, entries)| entries.iter().map(move |entry| (slot, entry)))
        .fold(DailyProgress::default(), |mut progress, (slot, entry)| {
            progress.scheduled += 1;
            if snapshot.is_taken(&entry.medication.id, slot, date) {
                progress.taken += 1;
            }
            progress
        })
}
