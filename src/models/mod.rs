mod favorite;
mod ingredient;
mod meal_plan;
mod meal_type;
mod recipe;
mod shopping_item;
mod sync_state;

pub use favorite::Favorite;
pub use ingredient::{aggregate, Ingredient};
pub use meal_plan::MealPlanEntry;
pub use meal_type::MealType;
pub use recipe::Recipe;
pub use shopping_item::ShoppingItem;
pub use sync_state::{DeleteAction, InvalidSyncState, SyncState};
