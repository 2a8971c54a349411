use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::super::domain::{Alert, AlertKind, DetectionMethod, ProductRecord, Severity};
use super::super::restrictions::RestrictionCatalog;
use super::detection::{check_thresholds, detect, DetectionScope};
use super::{critical_only, AnalyzerLimits, AnalyzerOutcome, CompatibilityAnalyzer};

/// Checks dietary preferences. Forbidden ingredients and nutrient limits for one preference fold
/// into a single alert.
#[derive(Debug, Clone)]
pub struct DietaryAnalyzer {
    restrictions: Arc<RestrictionCatalog>,
    limits: AnalyzerLimits,
}

impl DietaryAnalyzer {
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
        let preferences = self.restrictions.dietary_preferences();
        let mut alerts = Vec::new();

        for key in keys {
            let Some(rule) = preferences.get(key) else {
                warn!(preference = %key, "unknown dietary preference skipped");
                continue;
            };

            let detection = detect(rule, product, &self.limits, scope);
            let breaches = check_thresholds(rule, product);
            if detection.is_none() && breaches.is_empty() {
                continue;
            }

            let (mut methods, mut confidence, mut severity, mut details) = match detection {
                Some(found) => {
                    let severity = found.severity(&self.limits);
                    (found.methods, found.confidence, severity, found.evidence)
                }
                None => (Vec::new(), 0, Severity::Warning, Vec::new()),
            };
            if !breaches.is_empty() {
                methods.push(DetectionMethod::ThresholdMatch);
                confidence = confidence.max(self.limits.threshold_confidence);
                severity = severity.min(Severity::Warning);
                details.extend(breaches.iter().map(|breach| breach.describe()));
            }

            alerts.push(Alert {
                kind: AlertKind::Dietary,
                severity,
                message: format!("Not compatible with a {} diet", rule.label().to_lowercase()),
                detection_method: methods,
                confidence,
                source_key: rule.key().to_string(),
                details,
            });
        }

        AnalyzerOutcome::from_alerts(alerts, &self.limits)
    }
}

impl CompatibilityAnalyzer for DietaryAnalyzer {
    fn kind(&self) -> AlertKind {
        AlertKind::Dietary
    }

    fn analyze(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> AnalyzerOutcome {
        self.run(product, keys, DetectionScope::Full)
    }

    fn quick_check(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> Vec<Alert> {
        critical_only(self.run(product, keys, DetectionScope::TagsOnly))
    }
}
