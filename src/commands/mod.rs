//! CLI commands.

mod account;
mod config_cmd;
mod plan;
mod recipe;
mod shopping;
mod sync_cmd;

pub use account::AccountCommand;
pub use config_cmd::ConfigCommand;
pub use plan::PlanCommand;
pub use recipe::RecipeCommand;
pub use shopping::ShoppingCommand;
pub use sync_cmd::SyncCommand;

use chrono::{Datelike, Local, NaiveDate};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::models::Ingredient;
use crate::remote::{HttpRemote, RemoteStore};
use crate::session::Session;
use crate::sync::{run_entity, EntityKind};

/// Identity records are written under. Guests work against a fixed local
/// identity that never syncs (no triggers are registered without a session).
pub(crate) fn active_user(session: &Session) -> String {
    session
        .current_user()
        .unwrap_or_else(|| "local".to_string())
}

/// Parse `YYYY-MM-DD`, defaulting to today.
pub(crate) fn parse_date_or_today(value: Option<&str>) -> Result<NaiveDate, String> {
    match value {
        None => Ok(Local::now().date_naive()),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date '{}'. Expected YYYY-MM-DD", s)),
    }
}

/// Monday of the week containing `date`.
pub(crate) fn week_start(date: NaiveDate) -> NaiveDate {
    date - chrono::Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Parse an ingredient argument in `name:quantity:unit` form; quantity and
/// unit are optional (`eggs`, `eggs:3`, `flour:2.5:cups`).
pub(crate) fn parse_ingredient(value: &str) -> Result<Ingredient, String> {
    let mut parts = value.splitn(3, ':');
    let name = parts
        .next()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| format!("Invalid ingredient '{}'", value))?;

    let quantity = match parts.next() {
        None => 1.0,
        Some(q) => q
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("Invalid quantity in ingredient '{}'", value))?,
    };
    let unit = parts.next().map(str::trim).unwrap_or("");

    Ok(Ingredient::new(name, quantity, unit))
}

/// Fire a one-shot sync for the entity a command just mutated, when
/// `auto_sync` is enabled. Failures degrade gracefully: the data is safely
/// pending and the next sync picks it up.
pub(crate) async fn try_auto_sync(
    config: &Config,
    session: &Session,
    pool: &SqlitePool,
    kind: EntityKind,
) {
    if !config.sync.auto_sync || !config.sync.is_configured() {
        return;
    }
    let Some(user_id) = session.current_user() else {
        return;
    };
    let Some(server_url) = config.sync.server_url.as_deref() else {
        return;
    };

    let remote = HttpRemote::new(server_url, config.sync.api_key.clone());
    if !remote.reachable().await {
        tracing::debug!("auto-sync: remote unreachable, skipping");
        return;
    }

    if let Err(error) = run_entity(pool, &remote, kind, &user_id).await {
        tracing::debug!(%kind, %error, "auto-sync failed, change stays pending");
    }
}
