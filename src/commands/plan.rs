//! Meal plan CLI commands: the weekly calendar.

use chrono::Duration;
use clap::{Args, Subcommand};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{MealPlanRepository, RecipeRepository};
use crate::models::{MealPlanEntry, MealType};
use crate::session::Session;
use crate::sync::EntityKind;

use super::{active_user, parse_date_or_today, try_auto_sync, week_start};

#[derive(Args)]
pub struct PlanCommand {
    #[command(subcommand)]
    pub command: PlanSubcommand,
}

#[derive(Subcommand)]
pub enum PlanSubcommand {
    /// Plan a recipe into a calendar slot
    Set {
        /// Date (YYYY-MM-DD)
        #[arg(long, short)]
        date: String,

        /// Meal type (breakfast, lunch, dinner, snack)
        #[arg(long = "meal", short = 'm', value_name = "MEAL")]
        meal_type: String,

        /// Recipe id or exact title of one of your recipes
        recipe: String,

        /// Servings to cook
        #[arg(long)]
        servings: Option<i32>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// Show the weekly calendar
    Week {
        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        date: Option<String>,
    },

    /// Clear a calendar slot
    Remove {
        /// Date (YYYY-MM-DD)
        #[arg(long, short)]
        date: String,

        /// Meal type (breakfast, lunch, dinner, snack)
        #[arg(long = "meal", short = 'm', value_name = "MEAL")]
        meal_type: String,
    },
}

impl PlanCommand {
    pub async fn run(
        &self,
        plans: &MealPlanRepository,
        recipes: &RecipeRepository,
        session: &Session,
        config: &Config,
        pool: &SqlitePool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = active_user(session);

        match &self.command {
            PlanSubcommand::Set {
                date,
                meal_type,
                recipe,
                servings,
                note,
            } => {
                let date = parse_date_or_today(Some(date))?;
                let meal_type = MealType::from_str(meal_type)?;
                let recipe = resolve_recipe(recipes, &user_id, recipe).await?;

                let mut entry = MealPlanEntry::new(&user_id, date, meal_type, recipe.id);
                if let Some(servings) = servings {
                    entry = entry.with_servings(*servings);
                }
                if let Some(note) = note {
                    entry = entry.with_note(note);
                }
                plans.set_slot(entry).await?;

                println!("Planned '{}' for {} {}", recipe.title, date, meal_type);
                try_auto_sync(config, session, pool, EntityKind::MealPlans).await;
            }

            PlanSubcommand::Week { date } => {
                let start = week_start(parse_date_or_today(date.as_deref())?);
                let end = start + Duration::days(6);
                let entries = plans.list_range(&user_id, start, end).await?;

                println!("Week of {}", start);
                for offset in 0..7 {
                    let day = start + Duration::days(offset);
                    let planned: Vec<&MealPlanEntry> =
                        entries.iter().filter(|e| e.date == day).collect();
                    if planned.is_empty() {
                        continue;
                    }
                    println!("\n{} ({})", day.format("%A"), day);
                    for meal_type in MealType::all() {
                        let Some(entry) = planned.iter().find(|e| e.meal_type == meal_type)
                        else {
                            continue;
                        };
                        let title = match recipes.get(entry.recipe_id).await? {
                            Some(recipe) => recipe.title,
                            None => "(recipe not synced yet)".to_string(),
                        };
                        let meal = meal_type.to_string();
                        match entry.servings {
                            Some(servings) => {
                                println!("  {:<10} {} ({} servings)", meal, title, servings)
                            }
                            None => println!("  {:<10} {}", meal, title),
                        }
                    }
                }
                if entries.is_empty() {
                    println!("Nothing planned.");
                }
            }

            PlanSubcommand::Remove { date, meal_type } => {
                let date = parse_date_or_today(Some(date))?;
                let meal_type = MealType::from_str(meal_type)?;
                match plans.delete_slot(&user_id, date, meal_type).await? {
                    Some(_) => {
                        println!("Cleared {} {}", date, meal_type);
                        try_auto_sync(config, session, pool, EntityKind::MealPlans).await;
                    }
                    None => println!("Nothing planned for {} {}", date, meal_type),
                }
            }
        }

        Ok(())
    }
}

/// Look a recipe up by id, falling back to an exact title match among the
/// user's own recipes.
async fn resolve_recipe(
    recipes: &RecipeRepository,
    user_id: &str,
    reference: &str,
) -> Result<crate::models::Recipe, Box<dyn std::error::Error>> {
    if let Ok(id) = Uuid::parse_str(reference) {
        if let Some(recipe) = recipes.get(id).await? {
            return Ok(recipe);
        }
        return Err(format!("Recipe not found: {}", reference).into());
    }

    let owned = recipes.list(user_id).await?;
    owned
        .into_iter()
        .find(|recipe| recipe.title.eq_ignore_ascii_case(reference))
        .ok_or_else(|| format!("No recipe titled '{}'", reference).into())
}
