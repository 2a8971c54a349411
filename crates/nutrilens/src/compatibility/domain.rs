use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::CompatibilityError;

const SALT_PER_SODIUM: f64 = 2.5;
const DEFAULT_NOVA_GROUP: u8 = 4;
const DEFAULT_PROCESSING_LEVEL: u8 = 2;
pub(crate) const DEFAULT_AGE: u32 = 30;
pub(crate) const DEFAULT_BMI: f64 = 24.0;

/// Catalog identifier, usually a barcode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductCode(pub String);

impl ProductCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-100g nutrient keys understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    EnergyKcal,
    Fat,
    SaturatedFat,
    Sugars,
    Salt,
    Sodium,
    Proteins,
    Fiber,
    Carbohydrates,
}

impl Nutrient {
    pub const ALL: [Nutrient; 9] = [
        Nutrient::EnergyKcal,
        Nutrient::Fat,
        Nutrient::SaturatedFat,
        Nutrient::Sugars,
        Nutrient::Salt,
        Nutrient::Sodium,
        Nutrient::Proteins,
        Nutrient::Fiber,
        Nutrient::Carbohydrates,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Nutrient::EnergyKcal => "calories",
            Nutrient::Fat => "fat",
            Nutrient::SaturatedFat => "saturated fat",
            Nutrient::Sugars => "sugar",
            Nutrient::Salt => "salt",
            Nutrient::Sodium => "sodium",
            Nutrient::Proteins => "protein",
            Nutrient::Fiber => "fiber",
            Nutrient::Carbohydrates => "carbohydrates",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Nutrient::EnergyKcal => "kcal",
            _ => "g",
        }
    }
}

/// Sparse nutrient map. Missing entries read as 0; salt and sodium derive from each other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<Nutrient, f64>", into = "BTreeMap<Nutrient, f64>")]
pub struct Nutrients(BTreeMap<Nutrient, f64>);

impl Nutrients {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, nutrient: Nutrient, value: f64) -> Self {
        self.set(nutrient, value);
        self
    }

    /// Negative or non-finite readings are discarded.
    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        if value.is_finite() && value >= 0.0 {
            self.0.insert(nutrient, value);
        } else {
            self.0.remove(&nutrient);
        }
    }

    pub fn raw(&self, nutrient: Nutrient) -> Option<f64> {
        self.0.get(&nutrient).copied()
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
        if let Some(value) = self.raw(nutrient) {
            return value;
        }
        match nutrient {
            Nutrient::Salt => self
                .raw(Nutrient::Sodium)
                .map(|sodium| sodium * SALT_PER_SODIUM)
                .unwrap_or(0.0),
            Nutrient::Sodium => self
                .raw(Nutrient::Salt)
                .map(|salt| salt / SALT_PER_SODIUM)
                .unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<Nutrient, f64>> for Nutrients {
    fn from(values: BTreeMap<Nutrient, f64>) -> Self {
        let mut nutrients = Nutrients::new();
        for (nutrient, value) in values {
            nutrients.set(nutrient, value);
        }
        nutrients
    }
}

impl From<Nutrients> for BTreeMap<Nutrient, f64> {
    fn from(value: Nutrients) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NutriscoreGrade {
    A,
    B,
    C,
    D,
    E,
    #[default]
    Unknown,
}

impl NutriscoreGrade {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "a" => Self::A,
            "b" => Self::B,
            "c" => Self::C,
            "d" => Self::D,
            "e" => Self::E,
            _ => Self::Unknown,
        }
    }

    /// A=5 down to E=1; unknown grades rank 0.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::A => 5,
            Self::B => 4,
            Self::C => 3,
            Self::D => 2,
            Self::E => 1,
            Self::Unknown => 0,
        }
    }
}

impl From<String> for NutriscoreGrade {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Catalog snapshot of a product as the engine consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub code: ProductCode,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default, rename = "nutrients_per_100g")]
    pub nutrients: Nutrients,
    #[serde(default)]
    pub allergen_tags: BTreeSet<String>,
    #[serde(default)]
    pub trace_tags: BTreeSet<String>,
    #[serde(default)]
    pub label_tags: BTreeSet<String>,
    #[serde(default)]
    pub ingredients_text: String,
    #[serde(default)]
    pub nutriscore_grade: NutriscoreGrade,
    #[serde(default = "default_nova_group")]
    pub nova_group: u8,
    #[serde(default)]
    pub additive_count: u32,
    #[serde(default = "default_processing_level")]
    pub processing_level: u8,
}

fn default_nova_group() -> u8 {
    DEFAULT_NOVA_GROUP
}

fn default_processing_level() -> u8 {
    DEFAULT_PROCESSING_LEVEL
}

impl ProductRecord {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: ProductCode(code.into()),
            name: name.into(),
            category: String::new(),
            brand: String::new(),
            nutrients: Nutrients::new(),
            allergen_tags: BTreeSet::new(),
            trace_tags: BTreeSet::new(),
            label_tags: BTreeSet::new(),
            ingredients_text: String::new(),
            nutriscore_grade: NutriscoreGrade::Unknown,
            nova_group: DEFAULT_NOVA_GROUP,
            additive_count: 0,
            processing_level: DEFAULT_PROCESSING_LEVEL,
        }
    }

    /// First listed category without its language prefix.
    pub fn primary_category(&self) -> &str {
        let first = self.category.split(',').next().unwrap_or_default().trim();
        first
            .strip_prefix("en:")
            .or_else(|| first.strip_prefix("fr:"))
            .unwrap_or(first)
            .trim()
    }

    pub fn primary_brand(&self) -> &str {
        self.brand.split(',').next().unwrap_or_default().trim()
    }

    pub fn nova(&self) -> u8 {
        self.nova_group.clamp(1, 4)
    }

    pub fn processing(&self) -> u8 {
        self.processing_level.clamp(1, 4)
    }

    pub fn carries_tag(&self, tag: &str) -> bool {
        self.allergen_tags.contains(tag) || self.label_tags.contains(tag)
    }

    /// Identity used for deduplication: the code, or the lowercased name when the code is blank.
    pub fn identity(&self) -> String {
        if self.code.is_blank() {
            format!("name:{}", self.name.trim().to_lowercase())
        } else {
            format!("code:{}", self.code.0.trim())
        }
    }

    pub fn same_product(&self, other: &ProductRecord) -> bool {
        if !self.code.is_blank() && !other.code.is_blank() {
            return self.code.0.trim() == other.code.0.trim();
        }
        !self.name.trim().is_empty()
            && self.name.trim().to_lowercase() == other.name.trim().to_lowercase()
    }

    pub fn validate(&self) -> Result<(), CompatibilityError> {
        if self.code.is_blank() {
            return Err(CompatibilityError::Validation(
                "product code is required".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(CompatibilityError::Validation(format!(
                "product {} is missing a name",
                self.code
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Low,
    #[default]
    Moderate,
    High,
}

/// Canonical user profile consumed by every component. Build it through the profile normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserHealthProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub allergies: BTreeSet<String>,
    #[serde(default)]
    pub medical_conditions: BTreeSet<String>,
    #[serde(default)]
    pub dietary_preferences: BTreeSet<String>,
    #[serde(default)]
    pub health_goals: BTreeSet<String>,
    pub age: u32,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub activity_level: ActivityLevel,
    pub bmi: f64,
}

impl Default for UserHealthProfile {
    fn default() -> Self {
        Self {
            user_id: None,
            allergies: BTreeSet::new(),
            medical_conditions: BTreeSet::new(),
            dietary_preferences: BTreeSet::new(),
            health_goals: BTreeSet::new(),
            age: DEFAULT_AGE,
            gender: Gender::Unspecified,
            activity_level: ActivityLevel::Moderate,
            bmi: DEFAULT_BMI,
        }
    }
}

impl UserHealthProfile {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has_restrictions(&self) -> bool {
        !(self.allergies.is_empty()
            && self.medical_conditions.is_empty()
            && self.dietary_preferences.is_empty())
    }

    pub fn has_condition(&self, key: &str) -> bool {
        self.medical_conditions.contains(key)
    }

    /// Stable digest of everything that influences an analysis; used in cache keys.
    pub fn fingerprint(&self) -> String {
        let join = |set: &BTreeSet<String>| set.iter().cloned().collect::<Vec<_>>().join("+");
        format!(
            "a={};c={};d={};g={};age={};sex={:?};act={:?};bmi={:.1}",
            join(&self.allergies),
            join(&self.medical_conditions),
            join(&self.dietary_preferences),
            join(&self.health_goals),
            self.age,
            self.gender,
            self.activity_level,
            self.bmi
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Allergen,
    Medical,
    Dietary,
    Nutrition,
}

impl AlertKind {
    pub fn label(self) -> &'static str {
        match self {
            AlertKind::Allergen => "allergen",
            AlertKind::Medical => "medical",
            AlertKind::Dietary => "dietary",
            AlertKind::Nutrition => "nutrition",
        }
    }
}

/// Declared most severe first, so an ascending sort puts critical alerts on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    TagMatch,
    TextMatch,
    TraceMatch,
    KeywordMatch,
    ThresholdMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    pub detection_method: Vec<DetectionMethod>,
    /// 0-100.
    pub confidence: u8,
    pub source_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl Alert {
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}

/// Severity, then kind, then highest confidence, then key.
pub(crate) fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|left, right| {
        left.severity
            .cmp(&right.severity)
            .then(left.kind.cmp(&right.kind))
            .then(right.confidence.cmp(&left.confidence))
            .then_with(|| left.source_key.cmp(&right.source_key))
    });
}
