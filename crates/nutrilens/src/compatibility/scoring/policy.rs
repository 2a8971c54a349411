use serde::{Deserialize, Serialize};

use super::config::ScoringConfig;
use super::rules::ScoreSignals;

/// Whether the product is suitable for the profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuitabilityDecision {
    Suitable,
    Unsuitable { reasons: Vec<UnsuitableReason> },
}

impl SuitabilityDecision {
    pub fn is_suitable(&self) -> bool {
        matches!(self, SuitabilityDecision::Suitable)
    }

    pub fn summary(&self) -> String {
        match self {
            SuitabilityDecision::Suitable => "suitable".to_string(),
            SuitabilityDecision::Unsuitable { reasons } => {
                let parts: Vec<String> = reasons.iter().map(UnsuitableReason::summary).collect();
                format!("unsuitable: {}", parts.join("; "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnsuitableReason {
    CriticalAlerts { keys: Vec<String> },
    BelowFloor { score: u8, floor: u8 },
    InvalidProduct { message: String },
    AnalysisFailed { message: String },
}

impl UnsuitableReason {
    pub fn summary(&self) -> String {
        match self {
            UnsuitableReason::CriticalAlerts { keys } => {
                format!("critical alerts for {}", keys.join(", "))
            }
            UnsuitableReason::BelowFloor { score, floor } => {
                format!("score {score} below floor {floor}")
            }
            UnsuitableReason::InvalidProduct { message } => format!("invalid product: {message}"),
            UnsuitableReason::AnalysisFailed { message } => format!("analysis failed: {message}"),
        }
    }
}

/// Any critical alert rules the product out regardless of score.
pub(crate) fn decide_suitability(
    health_score: u8,
    signals: &ScoreSignals,
    config: &ScoringConfig,
) -> SuitabilityDecision {
    let mut reasons = Vec::new();

    if !signals.critical_keys.is_empty() {
        let mut keys = signals.critical_keys.clone();
        keys.sort();
        keys.dedup();
        reasons.push(UnsuitableReason::CriticalAlerts { keys });
    }
    if health_score < config.suitability_floor {
        reasons.push(UnsuitableReason::BelowFloor {
            score: health_score,
            floor: config.suitability_floor,
        });
    }

    if reasons.is_empty() {
        SuitabilityDecision::Suitable
    } else {
        SuitabilityDecision::Unsuitable { reasons }
    }
}
