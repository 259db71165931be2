//! Interaction engine: finds rule matches across a medication list.

use crate::{DerivedInteraction, InteractionRuleSet, MedicationCatalog, UserMedication};

/// Check every unordered pair of medications against the rule set
///
/// Pairs are enumerated as (i, j) with i < j in input order, so the output
/// is stable for a fixed list. Each pair costs one rule lookup; a personal
/// medication list is small enough that the quadratic walk is fine.
///
/// Display names come from the catalog, falling back to the raw
/// `medication_id` when it does not resolve.
pub fn check_interactions(
    catalog: &MedicationCatalog,
    rules: &InteractionRuleSet,
    medications: &[UserMedication],
) -> Vec<DerivedInteraction> {
    let mut interactions = Vec::new();

    for (i, first) in medications.iter().enumerate() {
        for second in &medications[i + 1..] {
            let Some(rule) = rules.find(&first.medication_id, &second.medication_id) else {
                continue;
            };

            interactions.push(DerivedInteraction {
                rule: rule.clone(),
                med1_name: display_name(catalog, &first.medication_id),
                med2_name: display_name(catalog, &second.medication_id),
            });
        }
    }

    tracing::debug!(
        "Checked {} medications, found {} interactions",
        medications.len(),
        interactions.len()
    );

    interactions
}

fn display_name(catalog: &MedicationCatalog, medication_id: &str) -> String {
    catalog
        .get(medication_id)
        .map(|def| def.name.clone())
        .unwrap_or_else(|| medication_id.to_string())
}
