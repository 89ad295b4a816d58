//! Lease expiry scheduler.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bng_types::{ExpiryCoordinator, ExpiryHandler};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Armed timers, indexed both by session and by deadline.
#[derive(Debug, Default)]
struct TimerSet {
    by_session: HashMap<String, DateTime<Utc>>,
    queue: BTreeSet<(DateTime<Utc>, String)>,
}

impl TimerSet {
    fn arm(&mut self, session_id: &str, at: DateTime<Utc>) {
        if let Some(previous) = self.by_session.insert(session_id.to_string(), at) {
            self.queue.remove(&(previous, session_id.to_string()));
        }
        self.queue.insert((at, session_id.to_string()));
    }

    fn cancel(&mut self, session_id: &str) -> bool {
        match self.by_session.remove(session_id) {
            Some(at) => {
                self.queue.remove(&(at, session_id.to_string()));
                true
            }
            None => false,
        }
    }

    /// Take every timer due at `now`, earliest first.
    fn pop_due(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut due = Vec::new();
        while let Some((at, _)) = self.queue.first() {
            if *at > now {
                break;
            }
            if let Some((_, session_id)) = self.queue.pop_first() {
                self.by_session.remove(&session_id);
                due.push(session_id);
            }
        }
        due
    }

    fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.queue.first().map(|(at, _)| *at)
    }
}

struct Shared {
    timers: Mutex<TimerSet>,
    changed: Notify,
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single-node [`ExpiryCoordinator`].
///
/// A tokio task sleeps until the earliest deadline (or until timers change),
/// removes every due timer under the lock, then invokes the handler for each
/// one with the lock released. A timer therefore fires at most once per
/// `set`, and a `remove` that wins the race suppresses it.
pub struct ExpiryScheduler {
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl Default for ExpiryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                timers: Mutex::new(TimerSet::default()),
                changed: Notify::new(),
            }),
            running: Mutex::new(None),
        }
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.shared.timers.lock().by_session.len()
    }

    /// Deadline armed for a session, if any.
    pub fn deadline(&self, session_id: &str) -> Option<DateTime<Utc>> {
        self.shared.timers.lock().by_session.get(session_id).copied()
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }
}

async fn run(shared: Arc<Shared>, handler: Arc<dyn ExpiryHandler>, cancel: CancellationToken) {
    loop {
        let due = shared.timers.lock().pop_due(Utc::now());
        for session_id in due {
            let fired_at = Utc::now();
            debug!(session_id = %session_id, "Expiry timer fired");
            handler.on_expired(&session_id, fired_at).await;
        }

        let wait = shared
            .timers
            .lock()
            .next_deadline()
            .map(|at| (at - Utc::now()).to_std().unwrap_or(Duration::ZERO));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = shared.changed.notified() => {}
            _ = sleep_for(wait) => {}
        }
    }
    debug!("Expiry scheduler loop exited");
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending::<()>().await,
    }
}

#[async_trait]
impl ExpiryCoordinator for ExpiryScheduler {
    async fn start(&self, handler: Arc<dyn ExpiryHandler>) {
        let mut running = self.running.lock();
        if running.is_some() {
            warn!("Expiry scheduler already running");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(Arc::clone(&self.shared), handler, cancel.clone()));
        *running = Some(Running { cancel, handle });
        info!(pending = self.pending(), "Expiry scheduler started");
    }

    async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(Running { cancel, handle }) = running else {
            return;
        };

        cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "Expiry scheduler task ended abnormally");
        }
        info!(pending = self.pending(), "Expiry scheduler stopped");
    }

    fn set(&self, session_id: &str, at: DateTime<Utc>) {
        self.shared.timers.lock().arm(session_id, at);
        self.shared.changed.notify_one();
        trace!(session_id = %session_id, at = %at, "Expiry timer armed");
    }

    fn remove(&self, session_id: &str) {
        if self.shared.timers.lock().cancel(session_id) {
            self.shared.changed.notify_one();
            trace!(session_id = %session_id, "Expiry timer cancelled");
        }
    }
}
