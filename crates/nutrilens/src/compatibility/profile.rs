use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    ActivityLevel, Gender, UserHealthProfile, UserId, DEFAULT_AGE, DEFAULT_BMI,
};

const IGNORED_KEYS: [&str; 4] = ["none", "no_preference", "n/a", "null"];

/// A list field as users submit it: a JSON array or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListInput {
    Items(Vec<String>),
    Text(String),
}

impl Default for ListInput {
    fn default() -> Self {
        ListInput::Items(Vec::new())
    }
}

impl ListInput {
    fn entries(&self) -> Vec<&str> {
        match self {
            ListInput::Items(items) => items.iter().flat_map(|item| item.split(',')).collect(),
            ListInput::Text(text) => text.split(',').collect(),
        }
    }
}

impl From<Vec<&str>> for ListInput {
    fn from(items: Vec<&str>) -> Self {
        ListInput::Items(items.into_iter().map(str::to_string).collect())
    }
}

/// Unvalidated profile payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProfileInput {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub allergies: ListInput,
    #[serde(default)]
    pub medical_conditions: ListInput,
    #[serde(default)]
    pub dietary_preferences: ListInput,
    #[serde(default)]
    pub health_goals: ListInput,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub activity_level: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub bmi: Option<f64>,
}

impl From<UserHealthProfile> for RawProfileInput {
    fn from(profile: UserHealthProfile) -> Self {
        let list = |set: BTreeSet<String>| ListInput::Items(set.into_iter().collect());
        Self {
            user_id: profile.user_id.map(|id| id.0),
            allergies: list(profile.allergies),
            medical_conditions: list(profile.medical_conditions),
            dietary_preferences: list(profile.dietary_preferences),
            health_goals: list(profile.health_goals),
            age: Some(profile.age),
            gender: Some(gender_key(profile.gender).to_string()),
            activity_level: Some(activity_key(profile.activity_level).to_string()),
            height_cm: None,
            weight_kg: None,
            bmi: Some(profile.bmi),
        }
    }
}

/// Canonicalizes raw input. Normalizing an already-normal profile is a no-op.
pub fn normalize_profile(input: RawProfileInput) -> UserHealthProfile {
    let user_id = input
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .map(UserId);

    UserHealthProfile {
        user_id,
        allergies: canonical_set(&input.allergies),
        medical_conditions: canonical_set(&input.medical_conditions),
        dietary_preferences: canonical_set(&input.dietary_preferences),
        health_goals: canonical_set(&input.health_goals),
        age: input.age.filter(|age| *age > 0).unwrap_or(DEFAULT_AGE),
        gender: input.gender.as_deref().map(parse_gender).unwrap_or_default(),
        activity_level: input
            .activity_level
            .as_deref()
            .map(parse_activity)
            .unwrap_or_default(),
        bmi: resolve_bmi(input.bmi, input.height_cm, input.weight_kg),
    }
}

/// Lowercase snake_case form of a restriction key.
pub fn canonical_key(value: &str) -> String {
    let mut key = String::with_capacity(value.len());
    for ch in value.trim().chars() {
        match ch {
            ' ' | '-' | '\t' => {
                if !key.ends_with('_') {
                    key.push('_');
                }
            }
            _ => key.extend(ch.to_lowercase()),
        }
    }
    key.trim_matches('_').to_string()
}

fn canonical_set(input: &ListInput) -> BTreeSet<String> {
    input
        .entries()
        .into_iter()
        .map(canonical_key)
        .filter(|key| !key.is_empty() && !IGNORED_KEYS.contains(&key.as_str()))
        .collect()
}

fn parse_gender(value: &str) -> Gender {
    match canonical_key(value).as_str() {
        "male" | "m" | "man" => Gender::Male,
        "female" | "f" | "woman" => Gender::Female,
        "other" | "non_binary" => Gender::Other,
        _ => Gender::Unspecified,
    }
}

fn parse_activity(value: &str) -> ActivityLevel {
    match canonical_key(value).as_str() {
        "low" | "sedentary" => ActivityLevel::Low,
        "high" | "active" | "very_active" => ActivityLevel::High,
        _ => ActivityLevel::Moderate,
    }
}

fn gender_key(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::Other => "other",
        Gender::Unspecified => "unspecified",
    }
}

fn activity_key(level: ActivityLevel) -> &'static str {
    match level {
        ActivityLevel::Low => "low",
        ActivityLevel::Moderate => "moderate",
        ActivityLevel::High => "high",
    }
}

/// Explicit BMI wins; otherwise weight / height(m)^2 rounded to one decimal; otherwise 24.0.
fn resolve_bmi(bmi: Option<f64>, height_cm: Option<f64>, weight_kg: Option<f64>) -> f64 {
    if let Some(value) = bmi.filter(|value| value.is_finite() && *value > 0.0) {
        return value;
    }

    match (height_cm, weight_kg) {
        (Some(height), Some(weight))
            if height.is_finite() && weight.is_finite() && height > 0.0 && weight > 0.0 =>
        {
            let meters = height / 100.0;
            ((weight / (meters * meters)) * 10.0).round() / 10.0
        }
        _ => DEFAULT_BMI,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_comma_separated_text_and_canonicalizes_keys() {
        let input = RawProfileInput {
            allergies: ListInput::Text("Milk, tree nuts,, Peanuts ".to_string()),
            dietary_preferences: ListInput::from(vec!["Gluten-Free", "none"]),
            ..RawProfileInput::default()
        };

        let profile = normalize_profile(input);
        let allergies: Vec<_> = profile.allergies.iter().map(String::as_str).collect();
        assert_eq!(allergies, vec!["milk", "peanuts", "tree_nuts"]);
        assert!(profile.dietary_preferences.contains("gluten_free"));
        assert_eq!(profile.dietary_preferences.len(), 1);
    }

    #[test]
    fn derives_bmi_from_height_and_weight() {
        let input = RawProfileInput {
            height_cm: Some(180.0),
            weight_kg: Some(81.0),
            ..RawProfileInput::default()
        };
        assert_eq!(normalize_profile(input).bmi, 25.0);
    }

    #[test]
    fn defaults_apply_when_fields_missing() {
        let profile = normalize_profile(RawProfileInput::default());
        assert_eq!(profile.age, 30);
        assert_eq!(profile.bmi, 24.0);
        assert_eq!(profile.activity_level, ActivityLevel::Moderate);
        assert_eq!(profile.gender, Gender::Unspecified);
        assert!(!profile.has_restrictions());
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let input = RawProfileInput {
            user_id: Some(" user-7 ".to_string()),
            allergies: ListInput::Text("Sesame".to_string()),
            medical_conditions: ListInput::from(vec!["Diabetes Type 2", "hypertension"]),
            gender: Some("F".to_string()),
            activity_level: Some("very active".to_string()),
            height_cm: Some(165.0),
            weight_kg: Some(70.0),
            ..RawProfileInput::default()
        };

        let once = normalize_profile(input);
        let twice = normalize_profile(RawProfileInput::from(once.clone()));
        assert_eq!(once, twice);
        assert!(once.medical_conditions.contains("diabetes_type_2"));
    }
}
