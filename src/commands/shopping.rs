//! Shopping list CLI commands.

use chrono::Duration;
use clap::{Args, Subcommand, ValueEnum};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::{MealPlanRepository, RecipeRepository, ShoppingRepository};
use crate::models::{aggregate, Ingredient, ShoppingItem};
use crate::session::Session;
use crate::sync::EntityKind;

use super::{active_user, parse_date_or_today, try_auto_sync, week_start};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ShoppingCommand {
    #[command(subcommand)]
    pub command: ShoppingSubcommand,
}

#[derive(Subcommand)]
pub enum ShoppingSubcommand {
    /// Rebuild the week's list from its planned recipes
    Generate {
        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        week: Option<String>,
    },

    /// List the week's shopping items
    List {
        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        week: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a manual item
    Add {
        /// Item name
        name: String,

        /// Quantity
        #[arg(long, short)]
        qty: Option<f64>,

        /// Unit (e.g. "rolls", "bags")
        #[arg(long, short)]
        unit: Option<String>,

        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        week: Option<String>,
    },

    /// Mark an item as purchased
    Check {
        /// Item name
        name: String,

        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        week: Option<String>,
    },

    /// Unmark a purchased item
    Uncheck {
        /// Item name
        name: String,

        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        week: Option<String>,
    },

    /// Remove an item from the list
    Remove {
        /// Item name
        name: String,

        /// Any date inside the week (YYYY-MM-DD), defaults to this week
        #[arg(long, short)]
        week: Option<String>,
    },
}

impl ShoppingCommand {
    pub async fn run(
        &self,
        shopping: &ShoppingRepository,
        plans: &MealPlanRepository,
        recipes: &RecipeRepository,
        session: &Session,
        config: &Config,
        pool: &SqlitePool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = active_user(session);

        match &self.command {
            ShoppingSubcommand::Generate { week } => {
                let start = week_start(parse_date_or_today(week.as_deref())?);
                let end = start + Duration::days(6);

                // Collect every ingredient from the week's planned recipes
                let mut ingredients: Vec<Ingredient> = Vec::new();
                for entry in plans.list_range(&user_id, start, end).await? {
                    if let Some(recipe) = recipes.get(entry.recipe_id).await? {
                        ingredients.extend(recipe.ingredients.iter().cloned());
                    }
                }
                let combined = aggregate(&ingredients);

                shopping.delete_generated(&user_id, start).await?;
                for ingredient in &combined {
                    shopping
                        .create(&ShoppingItem::from_ingredient(&user_id, start, ingredient))
                        .await?;
                }

                println!(
                    "Generated {} item(s) for the week of {}",
                    combined.len(),
                    start
                );
                try_auto_sync(config, session, pool, EntityKind::Shopping).await;
            }

            ShoppingSubcommand::List { week, format } => {
                let start = week_start(parse_date_or_today(week.as_deref())?);
                let items = shopping.list_week(&user_id, start).await?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
                    OutputFormat::Text => {
                        println!("Shopping list, week of {}", start);
                        if items.is_empty() {
                            println!("(empty)");
                        }
                        for item in &items {
                            println!("{}", item);
                        }
                    }
                }
            }

            ShoppingSubcommand::Add {
                name,
                qty,
                unit,
                week,
            } => {
                let start = week_start(parse_date_or_today(week.as_deref())?);
                if shopping.find_by_name(&user_id, start, name).await?.is_some() {
                    println!("'{}' is already on the list.", name);
                    return Ok(());
                }
                let item = ShoppingItem::manual(
                    &user_id,
                    start,
                    name,
                    qty.unwrap_or(1.0),
                    unit.clone().unwrap_or_default(),
                );
                shopping.create(&item).await?;
                println!("Added '{}'", name);
                try_auto_sync(config, session, pool, EntityKind::Shopping).await;
            }

            ShoppingSubcommand::Check { name, week } => {
                self.set_checked(shopping, &user_id, name, week.as_deref(), true)
                    .await?;
                try_auto_sync(config, session, pool, EntityKind::Shopping).await;
            }

            ShoppingSubcommand::Uncheck { name, week } => {
                self.set_checked(shopping, &user_id, name, week.as_deref(), false)
                    .await?;
                try_auto_sync(config, session, pool, EntityKind::Shopping).await;
            }

            ShoppingSubcommand::Remove { name, week } => {
                let start = week_start(parse_date_or_today(week.as_deref())?);
                match shopping.find_by_name(&user_id, start, name).await? {
                    Some(item) => {
                        shopping.delete(item.id).await?;
                        println!("Removed '{}'", item.name);
                        try_auto_sync(config, session, pool, EntityKind::Shopping).await;
                    }
                    None => println!("No item named '{}'", name),
                }
            }
        }

        Ok(())
    }

    async fn set_checked(
        &self,
        shopping: &ShoppingRepository,
        user_id: &str,
        name: &str,
        week: Option<&str>,
        checked: bool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let start = week_start(parse_date_or_today(week)?);
        match shopping.find_by_name(user_id, start, name).await? {
            Some(mut item) => {
                item.set_checked(checked);
                shopping.update(&item).await?;
                println!(
                    "{} '{}'",
                    if checked { "Checked" } else { "Unchecked" },
                    item.name
                );
            }
            None => println!("No item named '{}'", name),
        }
        Ok(())
    }
}
