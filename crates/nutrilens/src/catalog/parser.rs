use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::normalizer::{normalize_text, split_tags};
use crate::compatibility::domain::{
    NutriscoreGrade, Nutrient, Nutrients, ProductCode, ProductRecord,
};

pub(crate) fn parse_products<R: Read>(reader: R) -> Result<Vec<ProductRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut products = Vec::new();

    for (index, row) in csv_reader.deserialize::<ProductRow>().enumerate() {
        let product = row?.into_record();
        if let Err(error) = product.validate() {
            warn!(row = index + 1, %error, "skipping catalog row");
            continue;
        }
        products.push(product);
    }

    Ok(products)
}

#[derive(Debug, Deserialize)]
struct ProductRow {
    #[serde(default)]
    code: String,
    #[serde(default)]
    product_name: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    brands: String,
    #[serde(default, deserialize_with = "lenient_number")]
    energy_kcal_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    fat_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    saturated_fat_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    sugars_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    salt_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    sodium_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    proteins_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    fiber_100g: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    carbohydrates_100g: Option<f64>,
    #[serde(default)]
    allergens_tags: String,
    #[serde(default)]
    traces_tags: String,
    #[serde(default)]
    labels_tags: String,
    #[serde(default)]
    ingredients_text: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    nutriscore_grade: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    nova_group: Option<u8>,
    #[serde(default, deserialize_with = "lenient_number")]
    additives_n: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    processing_level: Option<u8>,
}

impl ProductRow {
    fn into_record(self) -> ProductRecord {
        let mut product = ProductRecord::new(self.code.trim(), normalize_text(&self.product_name));
        product.category = normalize_text(&self.categories);
        product.brand = normalize_text(&self.brands);
        product.nutrients = self.nutrients();
        product.allergen_tags = split_tags(&self.allergens_tags);
        product.trace_tags = split_tags(&self.traces_tags);
        product.label_tags = split_tags(&self.labels_tags);
        product.ingredients_text = normalize_text(&self.ingredients_text);
        product.nutriscore_grade = self
            .nutriscore_grade
            .as_deref()
            .map(NutriscoreGrade::parse)
            .unwrap_or_default();
        if let Some(nova) = self.nova_group {
            product.nova_group = nova.clamp(1, 4);
        }
        product.additive_count = self.additives_n.unwrap_or(0);
        if let Some(level) = self.processing_level {
            product.processing_level = level.clamp(1, 4);
        }
        product
    }

    fn nutrients(&self) -> Nutrients {
        let mut nutrients = Nutrients::new();
        for (nutrient, value) in [
            (Nutrient::EnergyKcal, self.energy_kcal_100g),
            (Nutrient::Fat, self.fat_100g),
            (Nutrient::SaturatedFat, self.saturated_fat_100g),
            (Nutrient::Sugars, self.sugars_100g),
            (Nutrient::Salt, self.salt_100g),
            (Nutrient::Sodium, self.sodium_100g),
            (Nutrient::Proteins, self.proteins_100g),
            (Nutrient::Fiber, self.fiber_100g),
            (Nutrient::Carbohydrates, self.carbohydrates_100g),
        ] {
            if let Some(value) = value {
                nutrients.set(nutrient, value);
            }
        }
        nutrients
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Unparseable cells count as missing rather than failing the whole import.
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let raw = empty_string_as_none(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}
