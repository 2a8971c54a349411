use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use super::super::domain::{Alert, AlertKind, DetectionMethod, ProductRecord};
use super::super::restrictions::{CompiledRestriction, RestrictionCatalog};
use super::detection::{check_thresholds, detect, DetectionScope, ThresholdBreach};
use super::{critical_only, AnalyzerLimits, AnalyzerOutcome, CompatibilityAnalyzer};

/// Checks medical conditions: avoid-ingredients through the detection tiers, plus one alert per
/// breached nutrient threshold.
#[derive(Debug, Clone)]
pub struct MedicalAnalyzer {
    restrictions: Arc<RestrictionCatalog>,
    limits: AnalyzerLimits,
}

impl MedicalAnalyzer {
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
        let conditions = self.restrictions.medical_conditions();
        let mut alerts = Vec::new();

        for key in keys {
            let Some(rule) = conditions.get(key) else {
                warn!(condition = %key, "unknown medical condition skipped");
                continue;
            };

            if let Some(detection) = detect(rule, product, &self.limits, scope) {
                alerts.push(Alert {
                    kind: AlertKind::Medical,
                    severity: detection.severity(&self.limits),
                    message: format!("{}: contains ingredients to avoid", rule.label()),
                    detection_method: detection.methods,
                    confidence: detection.confidence,
                    source_key: rule.key().to_string(),
                    details: detection.evidence,
                });
            }

            alerts.extend(
                check_thresholds(rule, product)
                    .into_iter()
                    .map(|breach| self.threshold_alert(rule, breach)),
            );
        }

        AnalyzerOutcome::from_alerts(alerts, &self.limits)
    }

    fn threshold_alert(&self, rule: &CompiledRestriction, breach: ThresholdBreach) -> Alert {
        let description = breach.describe();
        Alert {
            kind: AlertKind::Medical,
            severity: breach.severity(),
            message: format!("{}: {}", rule.label(), description),
            detection_method: vec![DetectionMethod::ThresholdMatch],
            confidence: self.limits.threshold_confidence,
            source_key: rule.key().to_string(),
            details: vec![description],
        }
    }
}

impl CompatibilityAnalyzer for MedicalAnalyzer {
    fn kind(&self) -> AlertKind {
        AlertKind::Medical
    }

    fn analyze(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> AnalyzerOutcome {
        self.run(product, keys, DetectionScope::Full)
    }

    fn quick_check(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> Vec<Alert> {
        critical_only(self.run(product, keys, DetectionScope::TagsOnly))
    }
}
