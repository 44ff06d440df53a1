//! Sync CLI commands.

use clap::{Args, Subcommand};
use std::sync::Arc;

use crate::config::Config;
use crate::remote::{HttpRemote, RemoteStore};
use crate::session::Session;
use crate::sync::{EntityKind, SyncOutcome, SyncRun, SyncScheduler};

/// Sync with the remote store
#[derive(Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,
}

#[derive(Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and remote status
    Status,

    /// Keep syncing periodically until interrupted
    Watch,
}

impl SyncCommand {
    pub async fn run(
        &self,
        config: &Config,
        session: Arc<Session>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            None => self.sync_now(config, session).await,
            Some(SyncSubcommand::Status) => self.status(config, &session).await,
            Some(SyncSubcommand::Watch) => self.watch(config, session).await,
        }
    }

    fn scheduler(&self, config: &Config, session: Arc<Session>) -> Result<SyncScheduler, String> {
        let server_url = config
            .sync
            .server_url
            .as_deref()
            .ok_or("Sync not configured. Add sync.server_url to your config file.")?;
        let remote: Arc<dyn RemoteStore> =
            Arc::new(HttpRemote::new(server_url, config.sync.api_key.clone()));
        Ok(SyncScheduler::with_interval(
            config.database_path.clone(),
            remote,
            session,
            config.sync.interval(),
        ))
    }

    async fn sync_now(
        &self,
        config: &Config,
        session: Arc<Session>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !session.is_authenticated() {
            return Err("Sign in first: ladle account sign-in <user>".into());
        }
        let scheduler = self.scheduler(config, session)?;

        println!("Syncing...");
        scheduler.trigger_all_once();
        scheduler.wait_idle().await;

        println!();
        let mut total = SyncOutcome::default();
        for kind in EntityKind::ALL {
            match scheduler.last_run(kind) {
                Some(run) => {
                    if let SyncRun::Completed(outcome) = &run {
                        total.absorb(*outcome);
                    }
                    println!("  {:<12} {}", kind.to_string(), run);
                }
                None => println!("  {:<12} not run", kind.to_string()),
            }
        }
        println!();
        if total.is_noop() {
            println!("Already up to date.");
        } else {
            println!(
                "Done: {} uploaded, {} pulled, {} removed, {} conflict-skipped.",
                total.uploaded, total.applied, total.purged, total.skipped
            );
        }
        Ok(())
    }

    async fn status(
        &self,
        config: &Config,
        session: &Session,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    auto_sync: false");
            println!();
            println!("Or set environment variables:");
            println!("  LADLE_SYNC_URL");
            println!("  LADLE_SYNC_API_KEY");
            return Ok(());
        }

        let server_url = config.sync.server_url.as_deref().unwrap_or_default();
        println!("Server:    {}", server_url);
        match &config.sync.api_key {
            Some(key) => println!("API Key:   {}...", &key[..key.len().min(8)]),
            None => println!("API Key:   (none)"),
        }
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Interval:  {} min", config.sync.interval_minutes);
        match session.current_user() {
            Some(user) => println!("User:      {}", user),
            None => println!("User:      (guest, sync disabled)"),
        }

        let remote = HttpRemote::new(server_url, config.sync.api_key.clone());
        println!();
        if remote.reachable().await {
            println!("Server is reachable.");
        } else {
            println!("Server is unreachable.");
        }
        Ok(())
    }

    async fn watch(
        &self,
        config: &Config,
        session: Arc<Session>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let scheduler = self.scheduler(config, session)?;
        if !scheduler.register_all() {
            return Err("Sign in first: ladle account sign-in <user>".into());
        }

        println!(
            "Syncing every {} min. Press Ctrl-C to stop.",
            config.sync.interval_minutes
        );
        tokio::signal::ctrl_c().await?;
        scheduler.shutdown();
        println!("\nStopped.");
        Ok(())
    }
}
