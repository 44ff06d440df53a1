//! Decides when the entity workers run.
//!
//! One-shot triggers are deduplicated per entity kind (re-triggering while a
//! run is in flight is a no-op), periodic triggers re-register in place, and
//! both gate on connectivity and an authenticated session. The reconciliation
//! logic itself never checks connectivity; that is this module's job.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::db::init_db;
use crate::remote::RemoteStore;
use crate::session::Session;

use super::{run_entity, EntityKind, SyncOutcome};

/// How often periodic workers fire.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Why a worker invocation did no work. Neither case is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoUser,
    Offline,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoUser => write!(f, "no signed-in user"),
            SkipReason::Offline => write!(f, "remote unreachable"),
        }
    }
}

/// Outcome of one worker invocation.
#[derive(Debug, Clone)]
pub enum SyncRun {
    Skipped(SkipReason),
    Completed(SyncOutcome),
    /// Aborted partway; committed progress is kept and a later run retries.
    Failed(String),
}

impl fmt::Display for SyncRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncRun::Skipped(reason) => write!(f, "skipped ({})", reason),
            SyncRun::Completed(outcome) if outcome.is_noop() => write!(f, "up to date"),
            SyncRun::Completed(outcome) => write!(
                f,
                "{} up, {} down, {} removed, {} skipped",
                outcome.uploaded, outcome.applied, outcome.purged, outcome.skipped
            ),
            SyncRun::Failed(error) => write!(f, "failed, will retry ({})", error),
        }
    }
}

struct Inner {
    db_path: PathBuf,
    remote: Arc<dyn RemoteStore>,
    session: Arc<Session>,
    interval: Duration,
    one_shot: Mutex<HashMap<EntityKind, JoinHandle<()>>>,
    periodic: Mutex<HashMap<EntityKind, JoinHandle<()>>>,
    last_runs: Mutex<HashMap<EntityKind, SyncRun>>,
}

/// Schedules worker invocations; cheap to clone and share.
///
/// Each invocation opens its own database pool for its lifetime; the remote
/// store is the process-wide shared client.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<Inner>,
}

impl SyncScheduler {
    pub fn new(db_path: PathBuf, remote: Arc<dyn RemoteStore>, session: Arc<Session>) -> Self {
        Self::with_interval(db_path, remote, session, DEFAULT_SYNC_INTERVAL)
    }

    pub fn with_interval(
        db_path: PathBuf,
        remote: Arc<dyn RemoteStore>,
        session: Arc<Session>,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                db_path,
                remote,
                session,
                interval,
                one_shot: Mutex::new(HashMap::new()),
                periodic: Mutex::new(HashMap::new()),
                last_runs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Request a single worker invocation. Returns `false` when one for this
    /// entity kind is already queued or running (the request is deduplicated,
    /// not stacked).
    pub fn trigger_once(&self, kind: EntityKind) -> bool {
        let mut jobs = self.inner.one_shot.lock().unwrap();
        if let Some(handle) = jobs.get(&kind) {
            if !handle.is_finished() {
                tracing::debug!(%kind, "sync already in flight, trigger deduplicated");
                return false;
            }
        }

        let inner = Arc::clone(&self.inner);
        jobs.insert(
            kind,
            tokio::spawn(async move {
                run_and_record(&inner, kind).await;
            }),
        );
        true
    }

    /// Register a recurring worker invocation. Re-registering replaces the
    /// existing schedule for this entity kind instead of adding a second one.
    pub fn schedule_periodic(&self, kind: EntityKind) {
        let mut jobs = self.inner.periodic.lock().unwrap();
        if let Some(previous) = jobs.remove(&kind) {
            previous.abort();
        }

        let inner = Arc::clone(&self.inner);
        jobs.insert(
            kind,
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(inner.interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    run_and_record(&inner, kind).await;
                }
            }),
        );
    }

    pub fn trigger_all_once(&self) {
        for kind in EntityKind::ALL {
            self.trigger_once(kind);
        }
    }

    pub fn schedule_all_periodic(&self) {
        for kind in EntityKind::ALL {
            self.schedule_periodic(kind);
        }
    }

    /// Hook for sign-in, registration and validated-session startup: register
    /// everything, and kick off an immediate pass. Does nothing for a guest.
    pub fn register_all(&self) -> bool {
        if !self.inner.session.is_authenticated() {
            tracing::debug!("guest session, sync triggers not registered");
            return false;
        }
        self.schedule_all_periodic();
        self.trigger_all_once();
        true
    }

    pub fn last_run(&self, kind: EntityKind) -> Option<SyncRun> {
        self.inner.last_runs.lock().unwrap().get(&kind).cloned()
    }

    pub fn is_scheduled(&self, kind: EntityKind) -> bool {
        self.inner
            .periodic
            .lock()
            .unwrap()
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for all in-flight one-shot invocations to settle.
    pub async fn wait_idle(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut jobs = self.inner.one_shot.lock().unwrap();
            jobs.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Abort everything that is queued or scheduled.
    pub fn shutdown(&self) {
        for handle in self.inner.one_shot.lock().unwrap().values() {
            handle.abort();
        }
        self.inner.one_shot.lock().unwrap().clear();
        for handle in self.inner.periodic.lock().unwrap().values() {
            handle.abort();
        }
        self.inner.periodic.lock().unwrap().clear();
    }
}

async fn run_and_record(inner: &Inner, kind: EntityKind) {
    let run = run_worker(inner, kind).await;
    match &run {
        SyncRun::Completed(outcome) => {
            tracing::info!(%kind, ?outcome, "sync completed");
        }
        SyncRun::Skipped(reason) => {
            tracing::debug!(%kind, %reason, "sync skipped");
        }
        SyncRun::Failed(error) => {
            tracing::warn!(%kind, %error, "sync failed, will retry on next trigger");
        }
    }
    inner.last_runs.lock().unwrap().insert(kind, run);
}

async fn run_worker(inner: &Inner, kind: EntityKind) -> SyncRun {
    let Some(user_id) = inner.session.current_user() else {
        return SyncRun::Skipped(SkipReason::NoUser);
    };
    if !inner.remote.reachable().await {
        return SyncRun::Skipped(SkipReason::Offline);
    }

    // The pool lives exactly as long as this invocation.
    let pool = match init_db(&inner.db_path).await {
        Ok(pool) => pool,
        Err(error) => return SyncRun::Failed(error.to_string()),
    };
    let result = run_entity(&pool, inner.remote.as_ref(), kind, &user_id).await;
    pool.close().await;

    match result {
        Ok(outcome) => SyncRun::Completed(outcome),
        Err(error) => SyncRun::Failed(error.to_string()),
    }
}
