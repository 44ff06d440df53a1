use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sync_state::SyncState;

/// A user's favorite marker for a recipe.
///
/// Favorites are rows of their own (not a flag on the recipe) so that a
/// favorite for someone else's public recipe replicates independently of the
/// recipe document. At most one favorite per (user, recipe) exists locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: String,
    pub recipe_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub sync_state: SyncState,
}

impl Favorite {
    pub fn new(user_id: impl Into<String>, recipe_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            recipe_id,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::PendingCreate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_favorite() {
        let recipe_id = Uuid::new_v4();
        let favorite = Favorite::new("user1", recipe_id);
        assert_eq!(favorite.recipe_id, recipe_id);
        assert_eq!(favorite.sync_state, SyncState::PendingCreate);
    }
}
