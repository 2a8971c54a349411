use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::alternatives::AlternativeCandidate;
use super::domain::{Alert, AlertKind, Severity, UserHealthProfile};
use super::restrictions::RestrictionCatalog;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    pub max_recommendations: usize,
    pub max_tips: usize,
    pub max_alternatives_shown: usize,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_recommendations: 10,
            max_tips: 3,
            max_alternatives_shown: 3,
        }
    }
}

/// Declared in output order for equal severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Allergen,
    Medical,
    Dietary,
    Nutrition,
    Alternatives,
    Tip,
}

impl From<AlertKind> for RecommendationKind {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Allergen => RecommendationKind::Allergen,
            AlertKind::Medical => RecommendationKind::Medical,
            AlertKind::Dietary => RecommendationKind::Dietary,
            AlertKind::Nutrition => RecommendationKind::Nutrition,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    AvoidCompletely,
    ConsultDoctor,
    CheckAlternatives,
    LimitConsumption,
    ConsiderAlternatives,
    Monitor,
}

impl RecommendedAction {
    pub fn for_alert(alert: &Alert) -> Self {
        match (alert.kind, alert.severity) {
            (AlertKind::Allergen, Severity::Critical) => RecommendedAction::AvoidCompletely,
            (AlertKind::Medical, Severity::Critical) => RecommendedAction::ConsultDoctor,
            (AlertKind::Dietary, _) => RecommendedAction::CheckAlternatives,
            (_, Severity::Critical | Severity::Warning) => RecommendedAction::LimitConsumption,
            (_, Severity::Info) => RecommendedAction::Monitor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeSummary {
    pub code: String,
    pub name: String,
    pub final_score: f64,
    pub reasons: Vec<String>,
}

impl From<&AlternativeCandidate> for AlternativeSummary {
    fn from(candidate: &AlternativeCandidate) -> Self {
        Self {
            code: candidate.product.code.to_string(),
            name: candidate.product.name.clone(),
            final_score: candidate.final_score,
            reasons: candidate
                .improvement_reasons
                .iter()
                .map(|improvement| improvement.message.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub action: RecommendedAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<AlternativeSummary>,
}

/// Terminal aggregator: alerts, nutrition findings, alternatives, and tips in one ordered list.
#[derive(Debug, Clone)]
pub struct RecommendationComposer {
    restrictions: Arc<RestrictionCatalog>,
    config: ComposerConfig,
}

impl RecommendationComposer {
    pub fn new(restrictions: Arc<RestrictionCatalog>, config: ComposerConfig) -> Self {
        Self {
            restrictions,
            config,
        }
    }

    pub fn compose(
        &self,
        profile: &UserHealthProfile,
        alerts: &[Alert],
        findings: &[Alert],
        alternatives: &[AlternativeCandidate],
    ) -> Vec<Recommendation> {
        let mut entries: Vec<Recommendation> = alerts
            .iter()
            .chain(findings)
            .map(|alert| self.from_alert(alert))
            .collect();

        if !alternatives.is_empty() {
            let shown: Vec<AlternativeSummary> = alternatives
                .iter()
                .take(self.config.max_alternatives_shown)
                .map(AlternativeSummary::from)
                .collect();
            entries.push(Recommendation {
                kind: RecommendationKind::Alternatives,
                severity: Severity::Info,
                title: "Healthier alternatives".to_string(),
                message: format!(
                    "{} product(s) fit your profile better",
                    alternatives.len()
                ),
                action: RecommendedAction::ConsiderAlternatives,
                source_key: None,
                alternatives: shown,
            });
        }

        entries.extend(
            self.restrictions
                .tips()
                .iter()
                .filter(|tip| tip.trigger.applies_to(profile))
                .take(self.config.max_tips)
                .map(|tip| Recommendation {
                    kind: RecommendationKind::Tip,
                    severity: Severity::Info,
                    title: tip.title.clone(),
                    message: tip.message.clone(),
                    action: RecommendedAction::Monitor,
                    source_key: Some(tip.id.clone()),
                    alternatives: Vec::new(),
                }),
        );

        entries.sort_by(|left, right| {
            left.severity
                .cmp(&right.severity)
                .then(left.kind.cmp(&right.kind))
        });
        entries.truncate(self.config.max_recommendations);
        entries
    }

    fn from_alert(&self, alert: &Alert) -> Recommendation {
        let label = self.restrictions.label_for(alert.kind, &alert.source_key);
        let title = match alert.kind {
            AlertKind::Allergen => format!("Allergen alert: {label}"),
            AlertKind::Medical => format!("Medical warning: {label}"),
            AlertKind::Dietary => format!("Dietary conflict: {label}"),
            AlertKind::Nutrition => format!("Nutrition note: {}", alert.source_key.replace('_', " ")),
        };

        Recommendation {
            kind: alert.kind.into(),
            severity: alert.severity,
            title,
            message: alert.message.clone(),
            action: RecommendedAction::for_alert(alert),
            source_key: Some(alert.source_key.clone()),
            alternatives: Vec::new(),
        }
    }
}
