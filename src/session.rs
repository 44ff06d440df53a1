//! The signed-in account, as an explicitly constructed service.
//!
//! One `Session` is built at startup and handed to whoever needs the current
//! identity (commands, the sync scheduler). Guests simply have no account:
//! everything works locally and no sync triggers are registered.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

const SESSION_FILE: &str = "session.yaml";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse session file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A user identity. Identity assertion only; authentication protocols are
/// out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Account {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

pub struct Session {
    path: PathBuf,
    current: RwLock<Option<Account>>,
}

impl Session {
    /// Load the persisted session from the data directory, if any.
    pub fn load(data_dir: &Path) -> Result<Self, SessionError> {
        let path = data_dir.join(SESSION_FILE);
        let current = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Some(serde_yaml::from_str(&contents)?)
        } else {
            None
        };
        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    pub fn sign_in(&self, account: Account) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yaml::to_string(&account)?)?;
        *self.current.write().unwrap() = Some(account);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<(), SessionError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        *self.current.write().unwrap() = None;
        Ok(())
    }

    pub fn account(&self) -> Option<Account> {
        self.current.read().unwrap().clone()
    }

    pub fn current_user(&self) -> Option<String> {
        self.current
            .read()
            .unwrap()
            .as_ref()
            .map(|account| account.user_id.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.read().unwrap().is_some()
    }
}
