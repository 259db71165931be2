//! Schedule engine: places each medication into the fixed daily slots.
//!
//! Placement rules, evaluated independently per medication:
//! - **Morning**: time of day includes morning
//! - **Afternoon**: time of day includes afternoon
//! - **Evening**: includes evening and morning, but not afternoon
//! - **Night**: spacing is required, or includes night, or includes evening
//!   without morning
//!
//! An evening-only medication therefore lands in the night slot, never the
//! evening slot.

use crate::{MedicationCatalog, MedicationDefinition, Schedule, ScheduleEntry, TimeSlot, UserMedication};

/// Generate the daily schedule for a medication list
///
/// Medications whose `medication_id` does not resolve are skipped.
pub fn generate_schedule(catalog: &MedicationCatalog, medications: &[UserMedication]) -> Schedule {
    let mut schedule = Schedule::default();

    for medication in medications {
        let Some(definition) = catalog.get(&medication.medication_id) else {
            tracing::debug!(
                "Skipping {} in schedule: unknown medication '{}'",
                medication.id,
                medication.medication_id
            );
            continue;
        };

        for slot in target_slots(definition) {
            schedule.slot_mut(slot).push(ScheduleEntry {
                medication: medication.clone(),
                info: Some(definition.clone()),
                time: slot.clock_label().to_string(),
                with_food: definition.timing.with_food,
            });
        }
    }

    schedule
}

/// Slots a definition is placed in, in display order
pub fn target_slots(definition: &MedicationDefinition) -> Vec<TimeSlot> {
    let timing = &definition.timing;
    let morning = timing.includes(TimeSlot::Morning);
    let afternoon = timing.includes(TimeSlot::Afternoon);
    let evening = timing.includes(TimeSlot::Evening);
    let night = timing.includes(TimeSlot::Night);

    TimeSlot::ALL
        .into_iter()
        .filter(|slot| match slot {
            TimeSlot::Morning => morning,
            TimeSlot::Afternoon => afternoon,
            TimeSlot::Evening => evening && morning && !afternoon,
            TimeSlot::Night => timing.spacing_hours.is_some() || night || (evening && !morning),
        })
        .collect()
}
