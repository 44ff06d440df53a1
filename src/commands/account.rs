//! Account CLI commands.
//!
//! Signing in (or registering) is also the moment sync triggers get
//! registered, so a fresh identity starts pulling its data right away.

use clap::{Args, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::remote::{HttpRemote, RemoteStore};
use crate::session::{Account, Session};
use crate::sync::{EntityKind, SyncScheduler};

#[derive(Args)]
pub struct AccountCommand {
    #[command(subcommand)]
    pub command: AccountSubcommand,
}

#[derive(Subcommand)]
pub enum AccountSubcommand {
    /// Create a fresh identity and sign in
    Register {
        /// Email to attach to the account
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign in with an existing user id
    SignIn {
        /// User id
        user: String,

        /// Email to attach to the account
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out
    SignOut,

    /// Show the current session
    Status,
}

impl AccountCommand {
    pub async fn run(
        &self,
        config: &Config,
        session: Arc<Session>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            AccountSubcommand::Register { email } => {
                let user_id = Uuid::new_v4().to_string();
                self.sign_in(config, session, user_id, email.clone()).await
            }

            AccountSubcommand::SignIn { user, email } => {
                self.sign_in(config, session, user.clone(), email.clone())
                    .await
            }

            AccountSubcommand::SignOut => {
                session.sign_out()?;
                println!("Signed out. Sync is disabled until you sign in again.");
                Ok(())
            }

            AccountSubcommand::Status => {
                match session.account() {
                    Some(account) => {
                        println!("Signed in as {}", account.user_id);
                        if let Some(email) = &account.email {
                            println!("Email: {}", email);
                        }
                    }
                    None => println!("Guest (not signed in)."),
                }
                Ok(())
            }
        }
    }

    async fn sign_in(
        &self,
        config: &Config,
        session: Arc<Session>,
        user_id: String,
        email: Option<String>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut account = Account::new(user_id);
        if let Some(email) = email {
            account = account.with_email(email);
        }
        session.sign_in(account.clone())?;
        println!("Signed in as {}", account.user_id);

        // Kick off an immediate full pass so the new session's data lands
        if let Some(server_url) = config.sync.server_url.as_deref() {
            let remote: Arc<dyn RemoteStore> =
                Arc::new(HttpRemote::new(server_url, config.sync.api_key.clone()));
            let scheduler = SyncScheduler::new(config.database_path.clone(), remote, session);
            scheduler.trigger_all_once();
            scheduler.wait_idle().await;
            for kind in EntityKind::ALL {
                if let Some(run) = scheduler.last_run(kind) {
                    println!("  {:<12} {}", kind.to_string(), run);
                }
            }
        }
        Ok(())
    }
}
