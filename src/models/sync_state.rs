//! Replication status for locally stored records.
//!
//! Every syncable row carries a `SyncState`. Anything other than `Synced` is
//! "pending" and will be pushed by the next upload phase. `Tombstone` marks a
//! soft-deleted row that is kept around only until the remote tombstone has
//! been written, after which the row is purged.

use std::fmt;
use thiserror::Error;

/// Replication status of a local record.
///
/// Stored on disk as an integer code: 0=synced, 1=created, 2=updated,
/// 3=deleted. The codes are part of the database schema and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Local and remote agree; nothing to upload.
    Synced,
    /// Created locally, never uploaded.
    PendingCreate,
    /// Edited locally after a successful upload.
    PendingUpdate,
    /// Soft-deleted locally; awaiting remote tombstone write, then purge.
    Tombstone,
}

/// What a local delete should do to the row, given its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    /// Remove the row immediately; the remote side has never seen it.
    Purge,
    /// Keep the row as a tombstone until the next upload confirms it remotely.
    Tombstone,
}

/// Unknown sync status code read from the database.
#[derive(Debug, Error)]
#[error("invalid sync status code {0}")]
pub struct InvalidSyncState(pub i64);

impl SyncState {
    pub fn code(self) -> i64 {
        match self {
            SyncState::Synced => 0,
            SyncState::PendingCreate => 1,
            SyncState::PendingUpdate => 2,
            SyncState::Tombstone => 3,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, InvalidSyncState> {
        match code {
            0 => Ok(SyncState::Synced),
            1 => Ok(SyncState::PendingCreate),
            2 => Ok(SyncState::PendingUpdate),
            3 => Ok(SyncState::Tombstone),
            other => Err(InvalidSyncState(other)),
        }
    }

    /// A record is pending while it has anything left to upload.
    pub fn is_pending(self) -> bool {
        self != SyncState::Synced
    }

    /// State after a local edit.
    ///
    /// An unsynced-then-edited record is still just "not yet uploaded", so
    /// `PendingCreate` is preserved. Tombstones are hidden from editing paths
    /// and stay tombstones.
    pub fn on_edit(self) -> SyncState {
        match self {
            SyncState::PendingCreate => SyncState::PendingCreate,
            SyncState::Tombstone => SyncState::Tombstone,
            SyncState::Synced | SyncState::PendingUpdate => SyncState::PendingUpdate,
        }
    }

    /// What a local delete does to the row.
    ///
    /// A record the remote side has never seen (`PendingCreate`) is purged
    /// outright instead of making a wasted upload-then-tombstone round trip.
    pub fn on_delete(self) -> DeleteAction {
        match self {
            SyncState::PendingCreate => DeleteAction::Purge,
            _ => DeleteAction::Tombstone,
        }
    }
}

/// A record that has never been uploaded starts as `PendingCreate`.
impl Default for SyncState {
    fn default() -> Self {
        SyncState::PendingCreate
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Synced => write!(f, "synced"),
            SyncState::PendingCreate => write!(f, "created"),
            SyncState::PendingUpdate => write!(f, "updated"),
            SyncState::Tombstone => write!(f, "deleted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_roundtrip() {
        for state in [
            SyncState::Synced,
            SyncState::PendingCreate,
            SyncState::PendingUpdate,
            SyncState::Tombstone,
        ] {
            assert_eq!(SyncState::from_code(state.code()).unwrap(), state);
        }
    }

    #[test]
    fn test_invalid_code() {
        assert!(SyncState::from_code(4).is_err());
        assert!(SyncState::from_code(-1).is_err());
    }

    #[test]
    fn test_is_pending() {
        assert!(!SyncState::Synced.is_pending());
        assert!(SyncState::PendingCreate.is_pending());
        assert!(SyncState::PendingUpdate.is_pending());
        assert!(SyncState::Tombstone.is_pending());
    }

    #[test]
    fn test_edit_preserves_pending_create() {
        assert_eq!(SyncState::PendingCreate.on_edit(), SyncState::PendingCreate);
    }

    #[test]
    fn test_edit_marks_synced_as_updated() {
        assert_eq!(SyncState::Synced.on_edit(), SyncState::PendingUpdate);
        assert_eq!(SyncState::PendingUpdate.on_edit(), SyncState::PendingUpdate);
    }

    #[test]
    fn test_delete_while_created_purges() {
        assert_eq!(SyncState::PendingCreate.on_delete(), DeleteAction::Purge);
    }

    #[test]
    fn test_delete_after_sync_tombstones() {
        assert_eq!(SyncState::Synced.on_delete(), DeleteAction::Tombstone);
        assert_eq!(SyncState::PendingUpdate.on_delete(), DeleteAction::Tombstone);
    }
}
