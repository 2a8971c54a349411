use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::super::domain::{Alert, AlertKind, ProductRecord, Severity};
use super::super::restrictions::{CompiledRestriction, RestrictionCatalog};
use super::detection::{detect, Detection, DetectionScope};
use super::{critical_only, AnalyzerLimits, AnalyzerOutcome, CompatibilityAnalyzer};

/// Flags declared allergies found in tags, ingredients, traces, or product text.
#[derive(Debug, Clone)]
pub struct AllergenAnalyzer {
    restrictions: Arc<RestrictionCatalog>,
    limits: AnalyzerLimits,
}

impl AllergenAnalyzer {
    pub fn new(restrictions: Arc<RestrictionCatalog>, limits: AnalyzerLimits) -> Self {
        Self {
            restrictions,
            limits,
        }
    }

    fn run(
        &self,
        product: &ProductRecord,
        keys: &BTreeSet<String>,
        scope: DetectionScope,
    ) -> AnalyzerOutcome {
        let allergens = self.restrictions.allergens();
        let mut alerts = Vec::new();

        for key in keys {
            let Some(rule) = allergens.get(key) else {
                warn!(allergen = %key, "unknown allergen key skipped");
                continue;
            };
            if let Some(detection) = detect(rule, product, &self.limits, scope) {
                alerts.push(self.alert(rule, detection));
            }
        }

        AnalyzerOutcome::from_alerts(alerts, &self.limits)
    }

    fn alert(&self, rule: &CompiledRestriction, detection: Detection) -> Alert {
        let severity = detection.severity(&self.limits);
        let message = if detection.trace_only() {
            format!("May contain traces of {}", rule.label())
        } else if severity == Severity::Critical {
            format!("Contains {}", rule.label())
        } else {
            format!("Possible {} content", rule.label())
        };

        Alert {
            kind: AlertKind::Allergen,
            severity,
            message,
            detection_method: detection.methods,
            confidence: detection.confidence,
            source_key: rule.key().to_string(),
            details: detection.evidence,
        }
    }
}

impl CompatibilityAnalyzer for AllergenAnalyzer {
    fn kind(&self) -> AlertKind {
        AlertKind::Allergen
    }

    fn analyze(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> AnalyzerOutcome {
        self.run(product, keys, DetectionScope::Full)
    }

    fn quick_check(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> Vec<Alert> {
        critical_only(self.run(product, keys, DetectionScope::TagsOnly))
    }
}
