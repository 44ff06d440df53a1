use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::meal_type::MealType;
use super::sync_state::SyncState;

/// One slot on the weekly meal calendar: a recipe planned for a date and
/// meal type.
///
/// The natural key is (user, date, meal type): two devices creating an entry
/// for the same slot independently produce different ids, and sync reconciles
/// them by slot rather than by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MealPlanEntry {
    pub id: Uuid,
    pub user_id: String,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: Uuid,
    pub servings: Option<i32>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub sync_state: SyncState,
}

impl MealPlanEntry {
    pub fn new(
        user_id: impl Into<String>,
        date: NaiveDate,
        meal_type: MealType,
        recipe_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            date,
            meal_type,
            recipe_id,
            servings: None,
            note: None,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::PendingCreate,
        }
    }

    pub fn with_servings(mut self, servings: i32) -> Self {
        self.servings = Some(servings);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Record a local edit: bump `updated_at` (never backwards) and move the
    /// replication state through its edit transition.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
        self.sync_state = self.sync_state.on_edit();
    }
}

impl fmt::Display for MealPlanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.date, self.meal_type, self.recipe_id)?;
        if let Some(servings) = self.servings {
            write!(f, " ({} servings)", servings)?;
        }
        if let Some(note) = &self.note {
            write!(f, " [{}]", note)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_new_entry() {
        let recipe_id = Uuid::new_v4();
        let entry = MealPlanEntry::new("user1", date(2), MealType::Dinner, recipe_id);
        assert_eq!(entry.meal_type, MealType::Dinner);
        assert_eq!(entry.recipe_id, recipe_id);
        assert_eq!(entry.sync_state, SyncState::PendingCreate);
    }

    #[test]
    fn test_touch_after_sync_marks_updated() {
        let mut entry = MealPlanEntry::new("user1", date(2), MealType::Lunch, Uuid::new_v4());
        entry.sync_state = SyncState::Synced;
        entry.touch();
        assert_eq!(entry.sync_state, SyncState::PendingUpdate);
    }

    #[test]
    fn test_display() {
        let entry = MealPlanEntry::new("user1", date(2), MealType::Dinner, Uuid::new_v4())
            .with_servings(4)
            .with_note("double the sauce");
        let output = format!("{}", entry);
        assert!(output.contains("2025-06-02 dinner"));
        assert!(output.contains("4 servings"));
        assert!(output.contains("double the sauce"));
    }
}
