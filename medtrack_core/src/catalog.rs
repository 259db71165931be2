//! Default catalog of medication and supplement definitions.
//!
//! The catalog is curated reference data: it is built once, never mutated,
//! and shared by every derivation.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<MedicationCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn default_catalog() -> &'static MedicationCatalog {
    &DEFAULT_CATALOG
}

fn slots(list: &[TimeSlot]) -> BTreeSet<TimeSlot> {
    list.iter().copied().collect()
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Builds the default catalog in declaration order
///
/// Prefer [`default_catalog`] outside of tests.
pub fn build_default_catalog() -> MedicationCatalog {
    MedicationCatalog::new(vec![
        MedicationDefinition {
            id: "metformin".into(),
            name: "Metformin".into(),
            generic_name: "Metformin".into(),
            kind: MedicationKind::Prescription,
            category: "Antidiabetic".into(),
            common_dosages: strings(&["500mg", "750mg", "850mg", "1000mg"]),
            timing: Timing {
                with_food: true,
                time_of_day: slots(&[TimeSlot::Morning, TimeSlot::Evening]),
                spacing_hours: None,
                avoid_with_categories: BTreeSet::new(),
            },
            notes: "Take with meals to reduce GI side effects. Common for PCOS and type 2 diabetes."
                .into(),
            side_effects: strings(&["Nausea", "Diarrhea", "Stomach upset"]),
            sources: strings(&["FDA", "NIH"]),
        },
        MedicationDefinition {
            id: "inositol".into(),
            name: "Inositol (Myo-Inositol)".into(),
            generic_name: "Myo-Inositol".into(),
            kind: MedicationKind::Supplement,
            category: "Supplement".into(),
            common_dosages: strings(&["2000mg", "4000mg"]),
            timing: Timing {
                with_food: false,
                time_of_day: slots(&[TimeSlot::Morning, TimeSlot::Evening]),
                spacing_hours: None,
                avoid_with_categories: BTreeSet::new(),
            },
            notes: "Often used for PCOS. Can be taken twice daily. May improve insulin sensitivity."
                .into(),
            side_effects: strings(&["Mild nausea", "Tiredness"]),
            sources: strings(&["NIH", "Clinical Studies"]),
        },
        MedicationDefinition {
            id: "magnesium".into(),
            name: "Magnesium".into(),
            generic_name: "Magnesium Supplement".into(),
            kind: MedicationKind::Supplement,
            category: "Mineral Supplement".into(),
            common_dosages: strings(&["200mg", "250mg", "400mg"]),
            timing: Timing {
                with_food: true,
                time_of_day: slots(&[TimeSlot::Evening]),
                spacing_hours: Some(2),
                avoid_with_categories: ["antibiotics", "bisphosphonates"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            notes: "Best taken at night. Space 2+ hours from other medications for optimal absorption."
                .into(),
            side_effects: strings(&["Diarrhea (if too high dose)", "Stomach upset"]),
            sources: strings(&["NIH", "FDA"]),
        },
        MedicationDefinition {
            id: "multivitamin".into(),
            name: "Multivitamin".into(),
            generic_name: "Multivitamin Complex".into(),
            kind: MedicationKind::Supplement,
            category: "Vitamin Supplement".into(),
            common_dosages: strings(&["1 tablet", "1 capsule"]),
            timing: Timing {
                with_food: true,
                time_of_day: slots(&[TimeSlot::Morning]),
                spacing_hours: None,
                avoid_with_categories: BTreeSet::new(),
            },
            notes: "Take with food containing some fat for better absorption of fat-soluble vitamins."
                .into(),
            side_effects: strings(&["Mild stomach upset", "Nausea"]),
            sources: strings(&["NIH"]),
        },
        MedicationDefinition {
            id: "appleCiderVinegar".into(),
            name: "Apple Cider Vinegar".into(),
            generic_name: "Apple Cider Vinegar".into(),
            kind: MedicationKind::Supplement,
            category: "Supplement".into(),
            common_dosages: strings(&["500mg", "1000mg"]),
            timing: Timing {
                with_food: true,
                time_of_day: slots(&[TimeSlot::Morning]),
                spacing_hours: None,
                avoid_with_categories: BTreeSet::new(),
            },
            notes: "Often taken before meals. May help with blood sugar control.".into(),
            side_effects: strings(&["Throat irritation", "Low potassium (with prolonged use)"]),
            sources: strings(&["Clinical Studies"]),
        },
    ])
}

impl MedicationCatalog {
    /// Case-insensitive substring search over name and category
    ///
    /// Results keep declaration order. An empty term matches everything.
    pub fn search(&self, term: &str) -> Vec<&MedicationDefinition> {
        let needle = term.trim().to_lowercase();
        self.list()
            .iter()
            .filter(|def| {
                needle.is_empty()
                    || def.name.to_lowercase().contains(&needle)
                    || def.category.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Validate the catalog for consistency and completeness
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for def in self.list() {
            if def.id.is_empty() {
                errors.push("Medication has empty ID".to_string());
            } else if !seen.insert(def.id.as_str()) {
                errors.push(format!("Duplicate medication ID '{}'", def.id));
            }
            if def.name.is_empty() {
                errors.push(format!("Medication '{}' has empty name", def.id));
            }
            if def.common_dosages.is_empty() {
                errors.push(format!("Medication '{}' has no common dosages", def.id));
            }
            if def.timing.time_of_day.is_empty() {
                errors.push(format!("Medication '{}' has no time of day", def.id));
            }
            if def.timing.spacing_hours == Some(0) {
                errors.push(format!(
                    "Medication '{}': spacing hours must be positive",
                    def.id
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads_in_declaration_order() {
        let catalog = build_default_catalog();
        let ids: Vec<_> = catalog.list().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "metformin",
                "inositol",
                "magnesium",
                "multivitamin",
                "appleCiderVinegar"
            ]
        );
    }

    #[test]
    fn test_get_known_and_unknown() {
        let catalog = default_catalog();
        assert_eq!(catalog.get("magnesium").unwrap().name, "Magnesium");
        assert!(catalog.get("ibuprofen").is_none());
    }

    #[test]
    fn test_magnesium_timing() {
        let magnesium = default_catalog().get("magnesium").unwrap();
        assert_eq!(magnesium.timing.spacing_hours, Some(2));
        assert!(magnesium.timing.includes(TimeSlot::Evening));
        assert!(!magnesium.timing.includes(TimeSlot::Morning));
        assert!(magnesium.timing.avoid_with_categories.contains("antibiotics"));
    }

    #[test]
    fn test_search_matches_name_and_category() {
        let catalog = default_catalog();

        let by_name: Vec<_> = catalog.search("METF").iter().map(|d| d.id.clone()).collect();
        assert_eq!(by_name, vec!["metformin"]);

        let by_category: Vec<_> = catalog
            .search("supplement")
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(
            by_category,
            vec!["inositol", "magnesium", "multivitamin", "appleCiderVinegar"]
        );

        assert_eq!(catalog.search("  ").len(), catalog.len());
        assert!(catalog.search("warfarin").is_empty());
    }

    #[test]
    fn test_default_catalog_validates() {
        let errors = default_catalog().validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_validate_reports_duplicates_and_bad_spacing() {
        let mut defs = build_default_catalog().list().to_vec();
        let mut copy = defs[0].clone();
        copy.timing.spacing_hours = Some(0);
        defs.push(copy);

        let catalog = MedicationCatalog::new(defs);
        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("Duplicate medication ID 'metformin'")));
        assert!(errors.iter().any(|e| e.contains("spacing hours must be positive")));

        // Lookups still resolve to the first declaration
        assert_eq!(catalog.get("metformin").unwrap().timing.spacing_hours, None);
    }
}
