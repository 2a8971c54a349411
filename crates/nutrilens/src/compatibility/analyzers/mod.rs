//! Rule-based analyzers for allergens, medical conditions, and dietary preferences.

mod allergen;
mod detection;
mod dietary;
mod medical;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{sort_alerts, Alert, AlertKind, ProductRecord};

pub use allergen::AllergenAnalyzer;
pub use dietary::DietaryAnalyzer;
pub use medical::MedicalAnalyzer;

/// Confidence assigned per detection tier, plus the per-analyzer alert cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerLimits {
    pub max_alerts: usize,
    pub tag_confidence: u8,
    pub text_confidence: u8,
    pub trace_confidence: u8,
    pub keyword_confidence: u8,
    pub threshold_confidence: u8,
    /// Detections at or above this confidence are critical.
    pub critical_confidence: u8,
}

impl Default for AnalyzerLimits {
    fn default() -> Self {
        Self {
            max_alerts: 25,
            tag_confidence: 95,
            text_confidence: 85,
            trace_confidence: 60,
            keyword_confidence: 70,
            threshold_confidence: 80,
            critical_confidence: 85,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalyzerOutcome {
    pub alerts: Vec<Alert>,
    pub compliant: bool,
}

impl AnalyzerOutcome {
    fn from_alerts(mut alerts: Vec<Alert>, limits: &AnalyzerLimits) -> Self {
        sort_alerts(&mut alerts);
        alerts.truncate(limits.max_alerts);
        let compliant = alerts.is_empty();
        Self { alerts, compliant }
    }
}

/// One restriction family. Implementations hold no per-call state.
pub trait CompatibilityAnalyzer: Send + Sync {
    fn kind(&self) -> AlertKind;

    fn analyze(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> AnalyzerOutcome;

    /// Tag and threshold checks only; returns critical alerts.
    fn quick_check(&self, product: &ProductRecord, keys: &BTreeSet<String>) -> Vec<Alert>;
}

fn critical_only(outcome: AnalyzerOutcome) -> Vec<Alert> {
    outcome
        .alerts
        .into_iter()
        .filter(Alert::is_critical)
        .collect()
}
