//! Versioned restriction tables for the analyzers, composer, and alternative search.
//!
//! The built-in tables ship with the crate; deployments may replace them with a JSON file of the
//! same shape. Ingredient word lists are compiled into case-insensitive word-boundary patterns once,
//! when the catalog is built.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::domain::{AlertKind, Nutrient, UserHealthProfile};

const BUILTIN_TABLES: &str = include_str!("../../data/restrictions.json");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    #[default]
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientThreshold {
    pub nutrient: Nutrient,
    pub limit: f64,
    #[serde(default)]
    pub kind: LimitKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientCeiling {
    pub nutrient: Nutrient,
    pub max: f64,
}

/// Ranking bonus for alternatives that stay under a nutrient level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientBonus {
    pub nutrient: Nutrient,
    pub below: f64,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub ingredient_words: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub thresholds: Vec<NutrientThreshold>,
    #[serde(default)]
    pub label_tags: Vec<String>,
    #[serde(default)]
    pub search_ceilings: Vec<NutrientCeiling>,
    #[serde(default)]
    pub compatibility_bonuses: Vec<NutrientBonus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum TipTrigger {
    Condition { keys: Vec<String> },
    Preference { keys: Vec<String> },
    AnyAllergy,
}

impl TipTrigger {
    pub fn applies_to(&self, profile: &UserHealthProfile) -> bool {
        match self {
            TipTrigger::Condition { keys } => {
                keys.iter().any(|key| profile.medical_conditions.contains(key))
            }
            TipTrigger::Preference { keys } => {
                keys.iter().any(|key| profile.dietary_preferences.contains(key))
            }
            TipTrigger::AnyAllergy => !profile.allergies.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    pub title: String,
    pub message: String,
    pub trigger: TipTrigger,
}

/// Serialized form of the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestrictionTables {
    pub version: String,
    #[serde(default)]
    pub allergens: Vec<RestrictionDefinition>,
    #[serde(default)]
    pub medical_conditions: Vec<RestrictionDefinition>,
    #[serde(default)]
    pub dietary_preferences: Vec<RestrictionDefinition>,
    #[serde(default)]
    pub tips: Vec<Tip>,
}

#[derive(Debug, thiserror::Error)]
pub enum RestrictionConfigError {
    #[error("failed to read restriction tables from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("restriction tables are malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("ingredient pattern for '{key}' does not compile: {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },
    #[error("restriction key '{key}' is defined twice in the {kind:?} table")]
    DuplicateKey { kind: AlertKind, key: String },
    #[error("restriction '{key}' has a non-positive or non-finite limit")]
    InvalidLimit { key: String },
}

/// A definition plus its precompiled ingredient pattern.
#[derive(Debug, Clone)]
pub struct CompiledRestriction {
    definition: RestrictionDefinition,
    ingredient_pattern: Option<Regex>,
}

impl CompiledRestriction {
    fn compile(definition: RestrictionDefinition) -> Result<Self, RestrictionConfigError> {
        let limits = definition
            .thresholds
            .iter()
            .map(|threshold| threshold.limit)
            .chain(definition.search_ceilings.iter().map(|ceiling| ceiling.max))
            .chain(definition.compatibility_bonuses.iter().map(|bonus| bonus.below));
        for limit in limits {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(RestrictionConfigError::InvalidLimit {
                    key: definition.key.clone(),
                });
            }
        }

        let words: Vec<String> = definition
            .ingredient_words
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .map(regex::escape)
            .collect();

        let ingredient_pattern = if words.is_empty() {
            None
        } else {
            let pattern = format!(r"(?i)\b(?:{})\b", words.join("|"));
            Some(
                Regex::new(&pattern).map_err(|source| RestrictionConfigError::Pattern {
                    key: definition.key.clone(),
                    source,
                })?,
            )
        };

        Ok(Self {
            definition,
            ingredient_pattern,
        })
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn label(&self) -> &str {
        &self.definition.label
    }

    pub fn definition(&self) -> &RestrictionDefinition {
        &self.definition
    }

    pub fn ingredient_pattern(&self) -> Option<&Regex> {
        self.ingredient_pattern.as_ref()
    }
}

/// Restrictions of one kind, keyed by canonical key.
#[derive(Debug, Clone, Default)]
pub struct RestrictionSet {
    entries: BTreeMap<String, CompiledRestriction>,
}

impl RestrictionSet {
    fn build(
        kind: AlertKind,
        definitions: Vec<RestrictionDefinition>,
    ) -> Result<Self, RestrictionConfigError> {
        let mut entries = BTreeMap::new();
        for definition in definitions {
            let key = definition.key.clone();
            if entries.contains_key(&key) {
                return Err(RestrictionConfigError::DuplicateKey { kind, key });
            }
            entries.insert(key, CompiledRestriction::compile(definition)?);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&CompiledRestriction> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Definitions for the given keys, skipping unknown ones.
    pub fn select<'a>(
        &'a self,
        keys: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a CompiledRestriction> + 'a {
        keys.iter().filter_map(|key| self.entries.get(key))
    }
}

/// Immutable, shareable view of every restriction table.
#[derive(Debug, Clone)]
pub struct RestrictionCatalog {
    version: String,
    allergens: RestrictionSet,
    medical: RestrictionSet,
    dietary: RestrictionSet,
    tips: Vec<Tip>,
}

impl RestrictionCatalog {
    pub fn builtin() -> Result<Self, RestrictionConfigError> {
        Self::from_json(BUILTIN_TABLES)
    }

    pub fn from_json(raw: &str) -> Result<Self, RestrictionConfigError> {
        let tables: RestrictionTables = serde_json::from_str(raw)?;
        Self::from_tables(tables)
    }

    pub fn from_path(path: &Path) -> Result<Self, RestrictionConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| RestrictionConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_tables(tables: RestrictionTables) -> Result<Self, RestrictionConfigError> {
        Ok(Self {
            version: tables.version,
            allergens: RestrictionSet::build(AlertKind::Allergen, tables.allergens)?,
            medical: RestrictionSet::build(AlertKind::Medical, tables.medical_conditions)?,
            dietary: RestrictionSet::build(AlertKind::Dietary, tables.dietary_preferences)?,
            tips: tables.tips,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn allergens(&self) -> &RestrictionSet {
        &self.allergens
    }

    pub fn medical_conditions(&self) -> &RestrictionSet {
        &self.medical
    }

    pub fn dietary_preferences(&self) -> &RestrictionSet {
        &self.dietary
    }

    pub fn tips(&self) -> &[Tip] {
        &self.tips
    }

    pub fn set_for(&self, kind: AlertKind) -> Option<&RestrictionSet> {
        match kind {
            AlertKind::Allergen => Some(&self.allergens),
            AlertKind::Medical => Some(&self.medical),
            AlertKind::Dietary => Some(&self.dietary),
            AlertKind::Nutrition => None,
        }
    }

    /// Display label for a key, falling back to the key itself.
    pub fn label_for<'a>(&'a self, kind: AlertKind, key: &'a str) -> &'a str {
        self.set_for(kind)
            .and_then(|set| set.get(key))
            .map(CompiledRestriction::label)
            .unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tables_load() {
        let catalog = RestrictionCatalog::builtin().expect("builtin tables parse");
        assert!(catalog.allergens().get("milk").is_some());
        assert!(catalog.medical_conditions().get("hypertension").is_some());
        assert!(catalog.dietary_preferences().get("vegan").is_some());
        assert_eq!(catalog.allergens().len(), 14);
        assert!(!catalog.tips().is_empty());
    }

    #[test]
    fn ingredient_patterns_respect_word_boundaries() {
        let catalog = RestrictionCatalog::builtin().expect("builtin tables parse");
        let milk = catalog.allergens().get("milk").expect("milk defined");
        let pattern = milk.ingredient_pattern().expect("milk has words");
        assert!(pattern.is_match("Sugar, MILK powder"));
        assert!(!pattern.is_match("buttermilkish flavouring"));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let raw = r#"{
            "version": "test",
            "allergens": [
                {"key": "milk", "label": "Milk"},
                {"key": "milk", "label": "Dairy"}
            ]
        }"#;
        match RestrictionCatalog::from_json(raw) {
            Err(RestrictionConfigError::DuplicateKey { key, .. }) => assert_eq!(key, "milk"),
            other => panic!("expected duplicate key error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_limits() {
        let raw = r#"{
            "version": "test",
            "medical_conditions": [
                {"key": "hypertension", "label": "Hypertension",
                 "thresholds": [{"nutrient": "salt", "limit": 0.0}]}
            ]
        }"#;
        assert!(matches!(
            RestrictionCatalog::from_json(raw),
            Err(RestrictionConfigError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn label_lookup_falls_back_to_key() {
        let catalog = RestrictionCatalog::builtin().expect("builtin tables parse");
        assert_eq!(catalog.label_for(AlertKind::Allergen, "tree_nuts"), "Tree nuts");
        assert_eq!(catalog.label_for(AlertKind::Medical, "unlisted"), "unlisted");
    }
}
