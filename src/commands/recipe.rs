//! Recipe CLI commands, favorites included.

use clap::{Args, Subcommand, ValueEnum};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{FavoriteRepository, RecipeRepository};
use crate::models::Recipe;
use crate::session::Session;
use crate::sync::EntityKind;

use super::{active_user, parse_ingredient, try_auto_sync};

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct RecipeCommand {
    #[command(subcommand)]
    pub command: RecipeSubcommand,
}

#[derive(Subcommand)]
pub enum RecipeSubcommand {
    /// Create a new recipe
    Add {
        /// Recipe title
        title: String,

        /// Short description
        #[arg(long, short)]
        description: Option<String>,

        /// Ingredient as name:quantity:unit (can be repeated)
        #[arg(long = "ingredient", short = 'i', value_name = "INGREDIENT")]
        ingredients: Vec<String>,

        /// Preparation instructions
        #[arg(long)]
        instructions: Option<String>,

        /// Prep time in minutes
        #[arg(long)]
        prep: Option<i32>,

        /// Cook time in minutes
        #[arg(long)]
        cook: Option<i32>,

        /// Number of servings
        #[arg(long)]
        servings: Option<i32>,

        /// Tag (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Publish to the shared public collection
        #[arg(long)]
        public: bool,
    },

    /// List recipes
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// List public recipes from everyone instead of your own
        #[arg(long)]
        public: bool,
    },

    /// Show one recipe
    Show {
        /// Recipe id
        id: Uuid,
    },

    /// Edit a recipe
    Edit {
        /// Recipe id
        id: Uuid,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, short)]
        description: Option<String>,

        /// Replace the ingredient list (name:quantity:unit, can be repeated)
        #[arg(long = "ingredient", short = 'i', value_name = "INGREDIENT")]
        ingredients: Vec<String>,

        #[arg(long)]
        instructions: Option<String>,

        #[arg(long)]
        prep: Option<i32>,

        #[arg(long)]
        cook: Option<i32>,

        #[arg(long)]
        servings: Option<i32>,

        /// Change public visibility
        #[arg(long)]
        public: Option<bool>,
    },

    /// Delete a recipe
    Delete {
        /// Recipe id
        id: Uuid,
    },

    /// Mark a recipe as a favorite
    Favorite {
        /// Recipe id
        id: Uuid,
    },

    /// Remove a recipe from favorites
    Unfavorite {
        /// Recipe id
        id: Uuid,
    },

    /// List favorite recipes
    Favorites,
}

impl RecipeCommand {
    pub async fn run(
        &self,
        recipes: &RecipeRepository,
        favorites: &FavoriteRepository,
        session: &Session,
        config: &Config,
        pool: &SqlitePool,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let user_id = active_user(session);

        match &self.command {
            RecipeSubcommand::Add {
                title,
                description,
                ingredients,
                instructions,
                prep,
                cook,
                servings,
                tags,
                public,
            } => {
                let parsed = ingredients
                    .iter()
                    .map(|raw| parse_ingredient(raw))
                    .collect::<Result<Vec<_>, _>>()?;

                let mut recipe = Recipe::new(title, &user_id)
                    .with_ingredients(parsed)
                    .with_tags(tags.clone())
                    .with_public(*public);
                if let Some(description) = description {
                    recipe = recipe.with_description(description);
                }
                if let Some(instructions) = instructions {
                    recipe = recipe.with_instructions(instructions);
                }
                if let Some(prep) = prep {
                    recipe = recipe.with_prep_time(*prep);
                }
                if let Some(cook) = cook {
                    recipe = recipe.with_cook_time(*cook);
                }
                if let Some(servings) = servings {
                    recipe = recipe.with_servings(*servings);
                }

                recipes.create(&recipe).await?;
                println!("Created recipe '{}' ({})", recipe.title, recipe.id);
                try_auto_sync(config, session, pool, EntityKind::Recipes).await;
            }

            RecipeSubcommand::List { format, public } => {
                let listed = if *public {
                    recipes.list_public().await?
                } else {
                    recipes.list(&user_id).await?
                };
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listed)?),
                    OutputFormat::Text => {
                        if listed.is_empty() {
                            println!("No recipes yet.");
                        }
                        for recipe in &listed {
                            let marker = if recipe.is_public { " (public)" } else { "" };
                            println!("{}  {}{}", recipe.id, recipe.title, marker);
                        }
                    }
                }
            }

            RecipeSubcommand::Show { id } => match recipes.get(*id).await? {
                Some(recipe) => println!("{}", recipe),
                None => println!("Recipe not found: {}", id),
            },

            RecipeSubcommand::Edit {
                id,
                title,
                description,
                ingredients,
                instructions,
                prep,
                cook,
                servings,
                public,
            } => {
                let Some(mut recipe) = recipes.get(*id).await? else {
                    return Err(format!("Recipe not found: {}", id).into());
                };
                if recipe.owner_id != user_id {
                    return Err("Only the owner can edit a recipe".into());
                }

                if let Some(title) = title {
                    recipe.title = title.clone();
                }
                if let Some(description) = description {
                    recipe.description = description.clone();
                }
                if !ingredients.is_empty() {
                    recipe.ingredients = ingredients
                        .iter()
                        .map(|raw| parse_ingredient(raw))
                        .collect::<Result<Vec<_>, _>>()?;
                }
                if let Some(instructions) = instructions {
                    recipe.instructions = instructions.clone();
                }
                if prep.is_some() {
                    recipe.prep_time = *prep;
                }
                if cook.is_some() {
                    recipe.cook_time = *cook;
                }
                if servings.is_some() {
                    recipe.servings = *servings;
                }
                if let Some(public) = public {
                    recipe.is_public = *public;
                }

                recipe.touch();
                recipes.update(&recipe).await?;
                println!("Updated recipe '{}'", recipe.title);
                try_auto_sync(config, session, pool, EntityKind::Recipes).await;
            }

            RecipeSubcommand::Delete { id } => {
                let Some(recipe) = recipes.get(*id).await? else {
                    return Err(format!("Recipe not found: {}", id).into());
                };
                if recipe.owner_id != user_id {
                    return Err("Only the owner can delete a recipe".into());
                }
                recipes.delete(*id).await?;
                println!("Deleted recipe '{}'", recipe.title);
                try_auto_sync(config, session, pool, EntityKind::Recipes).await;
            }

            RecipeSubcommand::Favorite { id } => {
                if recipes.get(*id).await?.is_none() {
                    return Err(format!("Recipe not found: {}", id).into());
                }
                if favorites.find(&user_id, *id).await?.is_some() {
                    println!("Already a favorite.");
                    return Ok(());
                }
                favorites.add(&user_id, *id).await?;
                println!("Added to favorites.");
                try_auto_sync(config, session, pool, EntityKind::Favorites).await;
            }

            RecipeSubcommand::Unfavorite { id } => {
                match favorites.find(&user_id, *id).await? {
                    Some(favorite) => {
                        favorites.delete(favorite.id).await?;
                        println!("Removed from favorites.");
                        try_auto_sync(config, session, pool, EntityKind::Favorites).await;
                    }
                    None => println!("Not a favorite."),
                }
            }

            RecipeSubcommand::Favorites => {
                let listed = favorites.list(&user_id).await?;
                if listed.is_empty() {
                    println!("No favorites yet.");
                }
                for favorite in &listed {
                    match recipes.get(favorite.recipe_id).await? {
                        Some(recipe) => println!("{}  {}", recipe.id, recipe.title),
                        None => println!("{}  (recipe not synced yet)", favorite.recipe_id),
                    }
                }
            }
        }

        Ok(())
    }
}
