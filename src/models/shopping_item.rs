use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::ingredient::Ingredient;
use super::sync_state::SyncState;

/// One line on a week's shopping list.
///
/// Items are either generated from the week's planned recipes or added
/// manually (`is_manual`). Checking an item off is a local edit like any
/// other and replicates through the same pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub id: Uuid,
    pub user_id: String,
    /// Monday of the week this item belongs to.
    pub week_start: NaiveDate,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    pub checked: bool,
    pub is_manual: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub sync_state: SyncState,
}

impl ShoppingItem {
    pub fn new(user_id: impl Into<String>, week_start: NaiveDate, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            week_start,
            name: name.into(),
            quantity: 1.0,
            unit: String::new(),
            checked: false,
            is_manual: false,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::PendingCreate,
        }
    }

    /// An item generated from a planned recipe's ingredient.
    pub fn from_ingredient(
        user_id: impl Into<String>,
        week_start: NaiveDate,
        ingredient: &Ingredient,
    ) -> Self {
        let mut item = Self::new(user_id, week_start, ingredient.name.clone());
        item.quantity = ingredient.quantity;
        item.unit = ingredient.unit.clone();
        item
    }

    /// An item the user typed in directly.
    pub fn manual(
        user_id: impl Into<String>,
        week_start: NaiveDate,
        name: impl Into<String>,
        quantity: f64,
        unit: impl Into<String>,
    ) -> Self {
        let mut item = Self::new(user_id, week_start, name);
        item.quantity = quantity;
        item.unit = unit.into();
        item.is_manual = true;
        item
    }

    /// Record a local edit: bump `updated_at` (never backwards) and move the
    /// replication state through its edit transition.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
        self.sync_state = self.sync_state.on_edit();
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
        self.touch();
    }
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let check = if self.checked { "[x]" } else { "[ ]" };
        if self.unit.is_empty() {
            write!(f, "{} {:<24} {}", check, self.name, self.quantity)
        } else {
            write!(
                f,
                "{} {:<24} {} {}",
                check, self.name, self.quantity, self.unit
            )
        }
    }
}
