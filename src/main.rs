use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use ladle::commands::{
    AccountCommand, ConfigCommand, PlanCommand, RecipeCommand, ShoppingCommand, SyncCommand,
};
use ladle::config::Config;
use ladle::db::{
    init_db, FavoriteRepository, MealPlanRepository, RecipeRepository, ShoppingRepository,
};
use ladle::session::Session;

#[derive(Parser)]
#[command(name = "ladle")]
#[command(version)]
#[command(about = "Recipes, meal plans and shopping lists that sync", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage recipes and favorites
    Recipe(RecipeCommand),

    /// Plan meals on the weekly calendar
    Plan(PlanCommand),

    /// Manage shopping lists
    Shopping(ShoppingCommand),

    /// Sync with the remote store
    Sync(SyncCommand),

    /// Manage the signed-in account
    Account(AccountCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config)?;
    let session = Arc::new(Session::load(&config.data_dir)?);

    match cli.command {
        Some(Commands::Recipe(cmd)) => {
            let pool = init_db(&config.database_path).await?;
            let recipes = RecipeRepository::new(pool.clone());
            let favorites = FavoriteRepository::new(pool.clone());
            cmd.run(&recipes, &favorites, &session, &config, &pool).await?;
        }
        Some(Commands::Plan(cmd)) => {
            let pool = init_db(&config.database_path).await?;
            let plans = MealPlanRepository::new(pool.clone());
            let recipes = RecipeRepository::new(pool.clone());
            cmd.run(&plans, &recipes, &session, &config, &pool).await?;
        }
        Some(Commands::Shopping(cmd)) => {
            let pool = init_db(&config.database_path).await?;
            let shopping = ShoppingRepository::new(pool.clone());
            let plans = MealPlanRepository::new(pool.clone());
            let recipes = RecipeRepository::new(pool.clone());
            cmd.run(&shopping, &plans, &recipes, &session, &config, &pool)
                .await?;
        }
        Some(Commands::Sync(cmd)) => {
            cmd.run(&config, session.clone()).await?;
        }
        Some(Commands::Account(cmd)) => {
            cmd.run(&config, session.clone()).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
