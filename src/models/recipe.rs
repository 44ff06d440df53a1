use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ingredient::Ingredient;
use super::sync_state::SyncState;

/// A recipe owned by one user.
///
/// `is_public` recipes are additionally visible to every user through the
/// shared public partition; they remain editable only by their owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub description: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: String,
    pub prep_time: Option<i32>, // minutes
    pub cook_time: Option<i32>, // minutes
    pub servings: Option<i32>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub sync_state: SyncState,
}

impl Recipe {
    pub fn new(title: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: String::new(),
            ingredients: Vec::new(),
            instructions: String::new(),
            prep_time: None,
            cook_time: None,
            servings: None,
            tags: Vec::new(),
            is_public: false,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::PendingCreate,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_prep_time(mut self, minutes: i32) -> Self {
        self.prep_time = Some(minutes);
        self
    }

    pub fn with_cook_time(mut self, minutes: i32) -> Self {
        self.cook_time = Some(minutes);
        self
    }

    pub fn with_servings(mut self, servings: i32) -> Self {
        self.servings = Some(servings);
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }

    /// Record a local edit: bump `updated_at` (never backwards) and move the
    /// replication state through its edit transition.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
        self.sync_state = self.sync_state.on_edit();
    }

    pub fn total_time(&self) -> Option<i32> {
        match (self.prep_time, self.cook_time) {
            (None, None) => None,
            (prep, cook) => Some(prep.unwrap_or(0) + cook.unwrap_or(0)),
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.len()))?;

        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        if let Some(servings) = self.servings {
            writeln!(f, "Servings: {}", servings)?;
        }
        if let Some(total) = self.total_time() {
            writeln!(f, "Time: {} min", total)?;
        }
        if !self.tags.is_empty() {
            writeln!(f, "Tags: {}", self.tags.join(", "))?;
        }
        if self.is_public {
            writeln!(f, "Visibility: public")?;
        }

        if !self.ingredients.is_empty() {
            writeln!(f, "\nIngredients:")?;
            for ingredient in &self.ingredients {
                writeln!(f, "  - {}", ingredient)?;
            }
        }
        if !self.instructions.is_empty() {
            writeln!(f, "\nInstructions:\n{}", self.instructions)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_recipe_is_pending_create() {
        let recipe = Recipe::new("Omelet", "user1");
        assert_eq!(recipe.sync_state, SyncState::PendingCreate);
        assert_eq!(recipe.created_at, recipe.updated_at);
        assert!(!recipe.is_public);
    }

    #[test]
    fn test_touch_bumps_updated_at_and_state() {
        let mut recipe = Recipe::new("Omelet", "user1");
        recipe.sync_state = SyncState::Synced;
        let before = recipe.updated_at;

        recipe.touch();
        assert!(recipe.updated_at >= before);
        assert_eq!(recipe.sync_state, SyncState::PendingUpdate);
    }

    #[test]
    fn test_touch_preserves_pending_create() {
        let mut recipe = Recipe::new("Omelet", "user1");
        recipe.touch();
        assert_eq!(recipe.sync_state, SyncState::PendingCreate);
    }

    #[test]
    fn test_total_time() {
        let recipe = Recipe::new("Stew", "user1")
            .with_prep_time(20)
            .with_cook_time(90);
        assert_eq!(recipe.total_time(), Some(110));

        let quick = Recipe::new("Toast", "user1").with_prep_time(5);
        assert_eq!(quick.total_time(), Some(5));

        assert_eq!(Recipe::new("Water", "user1").total_time(), None);
    }

    #[test]
    fn test_display() {
        let recipe = Recipe::new("Morning Omelet", "user1")
            .with_servings(2)
            .with_ingredients(vec![Ingredient::new("eggs", 3.0, "")]);
        let output = format!("{}", recipe);
        assert!(output.contains("Morning Omelet"));
        assert!(output.contains("Servings: 2"));
        assert!(output.contains("3 eggs"));
    }
}
