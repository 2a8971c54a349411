//! Per-100g nutrient classification and the 0-10 nutrition quality rating.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{Alert, AlertKind, DetectionMethod, Nutrient, Nutrients, ProductRecord, Severity};

const RISKY_ADDITIVE_COUNT: u32 = 5;
const LOW_FIBER: f64 = 3.0;
const FINDING_CONFIDENCE: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientAxis {
    Calories,
    Fat,
    Sugar,
    Salt,
    SaturatedFat,
    Protein,
    Fiber,
}

impl NutrientAxis {
    pub const ALL: [NutrientAxis; 7] = [
        NutrientAxis::Calories,
        NutrientAxis::Fat,
        NutrientAxis::Sugar,
        NutrientAxis::Salt,
        NutrientAxis::SaturatedFat,
        NutrientAxis::Protein,
        NutrientAxis::Fiber,
    ];

    pub fn key(self) -> &'static str {
        match self {
            NutrientAxis::Calories => "calories",
            NutrientAxis::Fat => "fat",
            NutrientAxis::Sugar => "sugar",
            NutrientAxis::Salt => "salt",
            NutrientAxis::SaturatedFat => "saturated_fat",
            NutrientAxis::Protein => "protein",
            NutrientAxis::Fiber => "fiber",
        }
    }

    pub fn nutrient(self) -> Nutrient {
        match self {
            NutrientAxis::Calories => Nutrient::EnergyKcal,
            NutrientAxis::Fat => Nutrient::Fat,
            NutrientAxis::Sugar => Nutrient::Sugars,
            NutrientAxis::Salt => Nutrient::Salt,
            NutrientAxis::SaturatedFat => Nutrient::SaturatedFat,
            NutrientAxis::Protein => Nutrient::Proteins,
            NutrientAxis::Fiber => Nutrient::Fiber,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NutrientLevel {
    Low,
    Moderate,
    High,
}

/// Values strictly above `moderate_above` are moderate, strictly above `high_above` are high.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelBand {
    pub moderate_above: f64,
    pub high_above: f64,
}

impl LevelBand {
    const fn new(moderate_above: f64, high_above: f64) -> Self {
        Self {
            moderate_above,
            high_above,
        }
    }

    pub fn classify(&self, value: f64) -> NutrientLevel {
        if value > self.high_above {
            NutrientLevel::High
        } else if value > self.moderate_above {
            NutrientLevel::Moderate
        } else {
            NutrientLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionBands {
    pub calories: LevelBand,
    pub fat: LevelBand,
    pub sugar: LevelBand,
    pub salt: LevelBand,
    pub saturated_fat: LevelBand,
    pub protein: LevelBand,
    pub fiber: LevelBand,
}

impl Default for NutritionBands {
    fn default() -> Self {
        Self {
            calories: LevelBand::new(150.0, 400.0),
            fat: LevelBand::new(3.0, 20.0),
            sugar: LevelBand::new(5.0, 22.5),
            salt: LevelBand::new(0.3, 1.5),
            saturated_fat: LevelBand::new(1.5, 5.0),
            protein: LevelBand::new(5.0, 12.0),
            fiber: LevelBand::new(3.0, 6.0),
        }
    }
}

impl NutritionBands {
    pub fn band(&self, axis: NutrientAxis) -> &LevelBand {
        match axis {
            NutrientAxis::Calories => &self.calories,
            NutrientAxis::Fat => &self.fat,
            NutrientAxis::Sugar => &self.sugar,
            NutrientAxis::Salt => &self.salt,
            NutrientAxis::SaturatedFat => &self.saturated_fat,
            NutrientAxis::Protein => &self.protein,
            NutrientAxis::Fiber => &self.fiber,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionAnalysis {
    pub levels: BTreeMap<NutrientAxis, NutrientLevel>,
    pub values: BTreeMap<NutrientAxis, f64>,
    /// 0-10.
    pub quality_rating: f64,
    /// 0-10 product-only health indicator, independent of any profile.
    pub health_indicator: f64,
    pub risky_additives: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Alert>,
}

impl NutritionAnalysis {
    pub fn level(&self, axis: NutrientAxis) -> NutrientLevel {
        self.levels
            .get(&axis)
            .copied()
            .unwrap_or(NutrientLevel::Low)
    }

    pub fn is_high(&self, axis: NutrientAxis) -> bool {
        self.level(axis) == NutrientLevel::High
    }

    pub fn value(&self, axis: NutrientAxis) -> f64 {
        self.values.get(&axis).copied().unwrap_or(0.0)
    }
}

/// Stateless evaluator over configurable bands.
#[derive(Debug, Clone, Default)]
pub struct NutritionEvaluator {
    bands: NutritionBands,
}

impl NutritionEvaluator {
    pub fn new(bands: NutritionBands) -> Self {
        Self { bands }
    }

    pub fn evaluate(&self, product: &ProductRecord) -> NutritionAnalysis {
        let mut levels = BTreeMap::new();
        let mut values = BTreeMap::new();
        for axis in NutrientAxis::ALL {
            let value = product.nutrients.get(axis.nutrient());
            levels.insert(axis, self.bands.band(axis).classify(value));
            values.insert(axis, value);
        }

        let mut analysis = NutritionAnalysis {
            levels,
            values,
            quality_rating: quality_rating(&product.nutrients),
            health_indicator: 0.0,
            risky_additives: product.additive_count > RISKY_ADDITIVE_COUNT,
            findings: Vec::new(),
        };
        analysis.health_indicator = health_indicator(&analysis, product.additive_count);
        analysis.findings = findings(&analysis);
        analysis
    }
}

/// 0-10 rating; missing nutrients count as 0.
pub fn quality_rating(nutrients: &Nutrients) -> f64 {
    let calories = nutrients.get(Nutrient::EnergyKcal);
    let fat = nutrients.get(Nutrient::Fat);
    let sugar = nutrients.get(Nutrient::Sugars);
    let salt = nutrients.get(Nutrient::Salt);
    let protein = nutrients.get(Nutrient::Proteins);
    let fiber = nutrients.get(Nutrient::Fiber);

    let mut score = 5.0;

    if calories < 300.0 {
        score += 1.0;
    } else if calories > 500.0 {
        score -= 1.0;
    }

    if fat < 10.0 {
        score += 1.0;
    } else if fat > 20.0 {
        score -= 1.0;
    }

    if sugar < 5.0 {
        score += 1.0;
    } else if sugar > 15.0 {
        score -= 2.0;
    }

    if salt < 0.5 {
        score += 1.0;
    } else if salt > 1.5 {
        score -= 2.0;
    }

    if protein > 10.0 {
        score += 1.0;
    }
    if fiber > 5.0 {
        score += 1.0;
    }

    f64::clamp(score, 0.0, 10.0)
}

fn health_indicator(analysis: &NutritionAnalysis, additive_count: u32) -> f64 {
    let mut score = 5.0;
    if analysis.is_high(NutrientAxis::Calories) {
        score -= 1.0;
    }
    if analysis.is_high(NutrientAxis::Fat) {
        score -= 1.0;
    }
    if analysis.is_high(NutrientAxis::Sugar) {
        score -= 1.5;
    }
    if analysis.is_high(NutrientAxis::Salt) {
        score -= 1.5;
    }
    score -= (f64::from(additive_count) * 0.2).min(2.0);
    if analysis.is_high(NutrientAxis::Protein) {
        score += 1.0;
    }
    if analysis.is_high(NutrientAxis::Fiber) {
        score += 1.0;
    }
    f64::clamp(score, 0.0, 10.0)
}

fn findings(analysis: &NutritionAnalysis) -> Vec<Alert> {
    let mut findings = Vec::new();
    let mut push = |severity: Severity, axis: NutrientAxis, message: String| {
        findings.push(Alert {
            kind: AlertKind::Nutrition,
            severity,
            message,
            detection_method: vec![DetectionMethod::ThresholdMatch],
            confidence: FINDING_CONFIDENCE,
            source_key: axis.key().to_string(),
            details: vec![format!("{:.1} per 100g", analysis.value(axis))],
        });
    };

    if analysis.is_high(NutrientAxis::Sugar) {
        push(
            Severity::Warning,
            NutrientAxis::Sugar,
            "High sugar content; keep portions small".to_string(),
        );
    }
    if analysis.is_high(NutrientAxis::Salt) {
        push(
            Severity::Warning,
            NutrientAxis::Salt,
            "High salt content; balance with low-salt meals".to_string(),
        );
    }
    if analysis.is_high(NutrientAxis::Calories) {
        push(
            Severity::Info,
            NutrientAxis::Calories,
            "Energy dense; mind the portion size".to_string(),
        );
    }
    if analysis.value(NutrientAxis::Fiber) < LOW_FIBER {
        push(
            Severity::Info,
            NutrientAxis::Fiber,
            "Low in fiber; pair with vegetables or whole grains".to_string(),
        );
    }
    findings
}
