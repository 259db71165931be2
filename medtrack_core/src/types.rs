//! Core domain types for the MedTrack system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Medication definitions and their timing requirements
//! - Pairwise interaction rules
//! - User-owned data (medications, profile, reminders, taken flags)
//! - Derived structures (interactions, schedule)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Time Slots
// ============================================================================

/// One of the four fixed daily dosing buckets
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeSlot {
    /// All slots in display order
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Morning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Afternoon => "afternoon",
            TimeSlot::Evening => "evening",
            TimeSlot::Night => "night",
        }
    }

    /// Fixed clock label shown for the slot, independent of any medication
    pub fn clock_label(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "8:00 AM",
            TimeSlot::Afternoon => "2:00 PM",
            TimeSlot::Evening => "6:00 PM",
            TimeSlot::Night => "10:00 PM",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeSlot::Morning),
            "afternoon" => Ok(TimeSlot::Afternoon),
            "evening" => Ok(TimeSlot::Evening),
            "night" => Ok(TimeSlot::Night),
            other => Err(crate::Error::Other(format!("Unknown time slot: {}", other))),
        }
    }
}

// ============================================================================
// Medication Definitions (catalog-owned)
// ============================================================================

/// Whether a definition is a prescription drug or an over-the-counter supplement
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MedicationKind {
    Prescription,
    Supplement,
}

/// When and how a medication should be taken
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timing {
    pub with_food: bool,
    pub time_of_day: BTreeSet<TimeSlot>,
    /// Hours to keep between this and other medications
    pub spacing_hours: Option<u32>,
    pub avoid_with_categories: BTreeSet<String>,
}

impl Timing {
    pub fn includes(&self, slot: TimeSlot) -> bool {
        self.time_of_day.contains(&slot)
    }
}

/// A medication or supplement in the reference catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MedicationDefinition {
    pub id: String,
    pub name: String,
    pub generic_name: String,
    pub kind: MedicationKind,
    pub category: String,
    pub common_dosages: Vec<String>,
    pub timing: Timing,
    pub notes: String,
    pub side_effects: Vec<String>,
    pub sources: Vec<String>,
}

// ============================================================================
// Interaction Rules (rule-set-owned)
// ============================================================================

/// Interaction severity; drives emphasis only
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Minor => "minor",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A known interaction between two catalog medications.
///
/// `drug_a` and `drug_b` form an unordered pair; see [`InteractionRule::matches`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct InteractionRule {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub interaction_type: String,
    pub description: String,
    pub recommendation: String,
    pub sources: Vec<String>,
}

impl InteractionRule {
    /// True if this rule covers the unordered pair {a, b}
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.drug_a == a && self.drug_b == b) || (self.drug_a == b && self.drug_b == a)
    }
}

// ============================================================================
// User Data (store-owned)
// ============================================================================

/// How often the user takes a medication
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    #[default]
    Once,
    Twice,
    Thrice,
    AsNeeded,
}

impl Frequency {
    pub fn label(&self) -> &'static str {
        match self {
            Frequency::Once => "Once daily",
            Frequency::Twice => "Twice daily",
            Frequency::Thrice => "Three times daily",
            Frequency::AsNeeded => "As needed",
        }
    }
}

impl FromStr for Frequency {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "twice" => Ok(Frequency::Twice),
            "thrice" => Ok(Frequency::Thrice),
            "as_needed" | "as-needed" | "asneeded" => Ok(Frequency::AsNeeded),
            other => Err(crate::Error::Other(format!("Unknown frequency: {}", other))),
        }
    }
}

/// A medication the user has added to their list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserMedication {
    pub id: String,
    /// Catalog id; may not resolve if the catalog changes
    pub medication_id: String,
    pub dosage: String,
    pub frequency: Frequency,
    #[serde(default)]
    pub notes: Option<String>,
    pub added_date: DateTime<Utc>,
}

impl UserMedication {
    /// Create a new entry whose id combines the catalog id and creation time
    pub fn new(
        medication_id: impl Into<String>,
        dosage: impl Into<String>,
        frequency: Frequency,
        notes: Option<String>,
        added_date: DateTime<Utc>,
    ) -> Self {
        let medication_id = medication_id.into();
        Self {
            id: format!("{}_{}", medication_id, added_date.timestamp_millis()),
            medication_id,
            dosage: dosage.into(),
            frequency,
            notes,
            added_date,
        }
    }
}

/// Fields of a [`UserMedication`] that an update may change.
///
/// A present field replaces the existing value; an absent one keeps it.
/// `notes: Some(None)` clears the notes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MedicationPatch {
    pub dosage: Option<String>,
    pub frequency: Option<Frequency>,
    pub notes: Option<Option<String>>,
}

impl MedicationPatch {
    pub fn is_empty(&self) -> bool {
        self.dosage.is_none() && self.frequency.is_none() && self.notes.is_none()
    }

    pub fn apply(&self, medication: &mut UserMedication) {
        if let Some(ref dosage) = self.dosage {
            medication.dosage = dosage.clone();
        }
        if let Some(frequency) = self.frequency {
            medication.frequency = frequency;
        }
        if let Some(ref notes) = self.notes {
            medication.notes = notes.clone();
        }
    }
}

/// The user's health profile, always replaced as a whole
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct UserProfile {
    pub name: String,
    pub age: String,
    pub weight: String,
    pub conditions: Vec<String>,
    pub allergies: Vec<String>,
    pub is_pregnant: bool,
    pub is_breastfeeding: bool,
}

/// A user-defined reminder attached to a time slot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reminder {
    pub id: Uuid,
    pub label: String,
    pub time_slot: TimeSlot,
    #[serde(default)]
    pub medication_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn new(label: impl Into<String>, time_slot: TimeSlot, medication_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            time_slot,
            medication_id,
            created_at: Utc::now(),
        }
    }
}

/// Composite key of the taken-dose map.
///
/// Stored as `"<medication_id>_<slot>_<YYYY-MM-DD>"`. Parsing splits from
/// the right, so medication ids may themselves contain underscores.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TakenKey {
    pub medication_id: String,
    pub time_slot: TimeSlot,
    pub date: NaiveDate,
}

impl TakenKey {
    pub fn new(medication_id: impl Into<String>, time_slot: TimeSlot, date: NaiveDate) -> Self {
        Self {
            medication_id: medication_id.into(),
            time_slot,
            date,
        }
    }
}

impl fmt::Display for TakenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.medication_id,
            self.time_slot,
            self.date.format("%Y-%m-%d")
        )
    }
}

impl FromStr for TakenKey {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let mut parts = s.rsplitn(3, '_');
        let (date, slot, medication_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(d), Some(t), Some(m)) if !m.is_empty() => (d, t, m),
            _ => {
                return Err(crate::Error::Other(format!("Malformed taken key: {}", s)));
            }
        };

        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| crate::Error::Other(format!("Invalid date in taken key {}: {}", s, e)))?;

        Ok(TakenKey {
            medication_id: medication_id.to_string(),
            time_slot: slot.parse()?,
            date,
        })
    }
}

impl Serialize for TakenKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TakenKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Derived Structures
// ============================================================================

/// A rule that fired for a pair of medications in the user's list
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivedInteraction {
    #[serde(flatten)]
    pub rule: InteractionRule,
    pub med1_name: String,
    pub med2_name: String,
}

/// One dose placed in a time slot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleEntry {
    #[serde(flatten)]
    pub medication: UserMedication,
    /// Resolved catalog definition
    pub info: Option<MedicationDefinition>,
    pub time: String,
    pub with_food: bool,
}

/// Daily schedule with exactly four fixed slots
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Schedule {
    pub morning: Vec<ScheduleEntry>,
    pub afternoon: Vec<ScheduleEntry>,
    pub evening: Vec<ScheduleEntry>,
    pub night: Vec<ScheduleEntry>,
}

impl Schedule {
    pub fn slot(&self, slot: TimeSlot) -> &[ScheduleEntry] {
        match slot {
            TimeSlot::Morning => &self.morning,
            TimeSlot::Afternoon => &self.afternoon,
            TimeSlot::Evening => &self.evening,
            TimeSlot::Night => &self.night,
        }
    }

    pub fn slot_mut(&mut self, slot: TimeSlot) -> &mut Vec<ScheduleEntry> {
        match slot {
            TimeSlot::Morning => &mut self.morning,
            TimeSlot::Afternoon => &mut self.afternoon,
            TimeSlot::Evening => &mut self.evening,
            TimeSlot::Night => &mut self.night,
        }
    }

    /// Slots with their entries, in display order
    pub fn iter(&self) -> impl Iterator<Item = (TimeSlot, &[ScheduleEntry])> + '_ {
        TimeSlot::ALL.into_iter().map(move |slot| (slot, self.slot(slot)))
    }

    pub fn total_doses(&self) -> usize {
        self.iter().map(|(_, entries)| entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_doses() == 0
    }
}

// ============================================================================
// Reference Data Types
// ============================================================================

/// Read-only table of medication definitions, kept in declaration order
#[derive(Clone, Debug, Default)]
pub struct MedicationCatalog {
    definitions: Vec<MedicationDefinition>,
    index: HashMap<String, usize>,
}

impl MedicationCatalog {
    /// Build a catalog; if an id repeats, lookups return the first occurrence
    pub fn new(definitions: Vec<MedicationDefinition>) -> Self {
        let mut index = HashMap::with_capacity(definitions.len());
        for (position, def) in definitions.iter().enumerate() {
            index.entry(def.id.clone()).or_insert(position);
        }
        Self { definitions, index }
    }

    pub fn get(&self, id: &str) -> Option<&MedicationDefinition> {
        self.index.get(id).map(|&position| &self.definitions[position])
    }

    pub fn list(&self) -> &[MedicationDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Read-only table of pairwise interaction rules
#[derive(Clone, Debug, Default)]
pub struct InteractionRuleSet {
    rules: Vec<InteractionRule>,
}

impl InteractionRuleSet {
    pub fn new(rules: Vec<InteractionRule>) -> Self {
        Self { rules }
    }

    /// Find the rule for the unordered pair {a, b}; first match in table order wins
    pub fn find(&self, a: &str, b: &str) -> Option<&InteractionRule> {
        self.rules.iter().find(|rule| rule.matches(a, b))
    }

    pub fn rules(&self) -> &[InteractionRule] {
        &self.rules
    }
}
