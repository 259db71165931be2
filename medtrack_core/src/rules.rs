//! Default table of pairwise interaction rules.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::HashSet;

static DEFAULT_RULES: Lazy<InteractionRuleSet> = Lazy::new(build_default_rules);

/// Get a reference to the cached default rule set
pub fn default_rules() -> &'static InteractionRuleSet {
    &DEFAULT_RULES
}

/// Builds the default rule set in table order
pub fn build_default_rules() -> InteractionRuleSet {
    InteractionRuleSet::new(vec![
        InteractionRule {
            drug_a: "metformin".into(),
            drug_b: "appleCiderVinegar".into(),
            severity: Severity::Moderate,
            interaction_type: "additive".into(),
            description: "Both may lower blood sugar. Monitor glucose levels carefully.".into(),
            recommendation: "Space doses and monitor blood sugar. Consult doctor if experiencing hypoglycemia."
                .into(),
            sources: vec!["Clinical Studies".into()],
        },
        InteractionRule {
            drug_a: "magnesium".into(),
            drug_b: "metformin".into(),
            severity: Severity::Minor,
            interaction_type: "absorption".into(),
            description: "Magnesium may slightly affect metformin absorption.".into(),
            recommendation: "Take at different times of day (e.g., metformin morning/evening, magnesium at night)."
                .into(),
            sources: vec!["NIH".into()],
        },
    ])
}

impl InteractionRuleSet {
    /// Validate rules against a catalog
    ///
    /// Flags self-pairs, repeated unordered pairs (only the first would ever
    /// match) and references to ids the catalog does not define.
    pub fn validate(&self, catalog: &MedicationCatalog) -> Vec<String> {
        let mut errors = Vec::new();
        let mut pairs = HashSet::new();

        for rule in self.rules() {
            if rule.drug_a == rule.drug_b {
                errors.push(format!("Rule pairs '{}' with itself", rule.drug_a));
            }

            let pair = if rule.drug_a <= rule.drug_b {
                (rule.drug_a.as_str(), rule.drug_b.as_str())
            } else {
                (rule.drug_b.as_str(), rule.drug_a.as_str())
            };
            if !pairs.insert(pair) {
                errors.push(format!(
                    "Duplicate rule for pair '{}' / '{}'",
                    pair.0, pair.1
                ));
            }

            for id in [&rule.drug_a, &rule.drug_b] {
                if catalog.get(id).is_none() {
                    errors.push(format!("Rule references unknown medication '{}'", id));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_catalog;

    #[test]
    fn test_find_is_symmetric() {
        let rules = default_rules();
        let forward = rules.find("metformin", "appleCiderVinegar").unwrap();
        let backward = rules.find("appleCiderVinegar", "metformin").unwrap();
        assert_eq!(forward, backward);
        assert_eq!(forward.severity, Severity::Moderate);
    }

    #[test]
    fn test_find_missing_pair() {
        let rules = default_rules();
        assert!(rules.find("multivitamin", "inositol").is_none());
        assert!(rules.find("metformin", "metformin").is_none());
        assert!(rules.find("metformin", "unknown").is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let mut duplicated = build_default_rules().rules().to_vec();
        let mut shadow = duplicated[1].clone();
        std::mem::swap(&mut shadow.drug_a, &mut shadow.drug_b);
        shadow.severity = Severity::Severe;
        duplicated.push(shadow);

        let rules = InteractionRuleSet::new(duplicated);
        assert_eq!(
            rules.find("metformin", "magnesium").unwrap().severity,
            Severity::Minor
        );

        let errors = rules.validate(default_catalog());
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert!(errors[0].contains("Duplicate rule"));
    }

    #[test]
    fn test_default_rules_validate() {
        let errors = default_rules().validate(default_catalog());
        assert!(errors.is_empty(), "Default rules invalid: {:?}", errors);
    }
}
