//! Config CLI commands.

use clap::{Args, Subcommand};

use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the resolved configuration
    Show,

    /// Print the config file path
    Path,
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show => {
                println!("database_path: {}", config.database_path.display());
                println!("data_dir:      {}", config.data_dir.display());
                println!(
                    "sync.server_url: {}",
                    config.sync.server_url.as_deref().unwrap_or("(unset)")
                );
                println!(
                    "sync.api_key:    {}",
                    if config.sync.api_key.is_some() {
                        "(set)"
                    } else {
                        "(unset)"
                    }
                );
                println!("sync.auto_sync:  {}", config.sync.auto_sync);
                println!("sync.interval_minutes: {}", config.sync.interval_minutes);
            }
            ConfigSubcommand::Path => {
                println!("{}", Config::default_config_path().display());
            }
        }
        Ok(())
    }
}
