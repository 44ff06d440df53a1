use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} {}", self.quantity, self.name)
        } else {
            write!(f, "{} {} {}", self.quantity, self.unit, self.name)
        }
    }
}

/// Combine ingredients that share a name and unit (case-insensitive name),
/// summing their quantities. Output is sorted by name for stable display.
pub fn aggregate(ingredients: &[Ingredient]) -> Vec<Ingredient> {
    let mut combined: BTreeMap<(String, String), Ingredient> = BTreeMap::new();
    for ingredient in ingredients {
        let key = (ingredient.name.to_lowercase(), ingredient.unit.clone());
        combined
            .entry(key)
            .and_modify(|existing| existing.quantity += ingredient.quantity)
            .or_insert_with(|| ingredient.clone());
    }
    combined.into_values().collect()
}
