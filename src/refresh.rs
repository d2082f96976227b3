//! Cancellable delayed tasks: the search debounce and the smart-refresh
//! countdown, plus the session-scoped UI snapshot they protect.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

use crate::storage::{Scope, StorageAdapter, KEY_UI_STATE};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const REFRESH_DELAY: Duration = Duration::from_secs(10);

/// Snapshots older than this are stale and discarded on restore.
pub const UI_STATE_MAX_AGE_MS: i64 = 30_000;

/// One pending delayed task; each new schedule supersedes the previous
/// one, so only the last input within the window runs.
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Wait for the pending task (if any) to run to completion.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// In-session UI state, valid for 30 seconds across a reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSnapshot {
    pub search_term: String,
    pub active_tags: Vec<String>,
    pub collapsed_categories: Vec<String>,
    pub tag_section_expanded: bool,
    pub current_theme: String,
    pub timestamp: i64,
}

pub fn save_ui_snapshot(storage: &StorageAdapter, snapshot: &UiSnapshot) {
    if let Err(e) = storage.set(Scope::Session, KEY_UI_STATE, snapshot) {
        tracing::warn!("⚠️  Could not save UI snapshot: {}", e);
    }
}

/// Take the stored snapshot when it is still fresh; stale snapshots are
/// deleted and ignored.
pub fn restore_ui_snapshot(storage: &StorageAdapter, now: i64) -> Option<UiSnapshot> {
    let snapshot: UiSnapshot = storage.get_opt(Scope::Session, KEY_UI_STATE)?;
    if now - snapshot.timestamp > UI_STATE_MAX_AGE_MS {
        storage.remove(Scope::Session, KEY_UI_STATE);
        return None;
    }
    Some(snapshot)
}

/// Delayed re-render with a visible countdown. Cancelling clears the
/// refresh timer, the countdown ticker and the persisted snapshot.
pub struct SmartRefresh {
    delay: Duration,
    timer: Option<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

impl SmartRefresh {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: None,
            countdown: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Save the snapshot and arm both tasks. Scheduling again resets the
    /// pending refresh.
    pub fn schedule<F>(&mut self, storage: &StorageAdapter, snapshot: UiSnapshot, on_refresh: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.abort_tasks();
        save_ui_snapshot(storage, &snapshot);

        let total_secs = self.delay.as_secs();
        if total_secs > 1 {
            self.countdown = Some(tokio::spawn(async move {
                for remaining in (1..total_secs).rev() {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    info!("⏳ Refreshing in {} seconds...", remaining);
                }
            }));
        }

        let delay = self.delay;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_refresh();
        }));
    }

    /// Abort both tasks and remove the persisted snapshot.
    pub fn cancel(&mut self, storage: &StorageAdapter) {
        self.abort_tasks();
        storage.remove(Scope::Session, KEY_UI_STATE);
    }

    fn abort_tasks(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

impl Drop for SmartRefresh {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::now_millis;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn snapshot(ts: i64) -> UiSnapshot {
        UiSnapshot {
            search_term: "lenovo".to_string(),
            active_tags: vec!["hardware".to_string()],
            collapsed_categories: vec![],
            tag_section_expanded: false,
            current_theme: "eco-lime".to_string(),
            timestamp: ts,
        }
    }

    #[tokio::test]
    async fn debouncer_runs_only_the_last_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(20));

        for i in 1..=5 {
            let counter = Arc::clone(&counter);
            debouncer.schedule(move || {
                counter.store(i, Ordering::SeqCst);
            });
        }
        debouncer.settle().await;

        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn debouncer_cancel_prevents_execution() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        {
            let counter = Arc::clone(&counter);
            debouncer.schedule(move || {
                counter.store(1, Ordering::SeqCst);
            });
        }
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn smart_refresh_fires_after_delay() {
        let dir = TempDir::new().unwrap();
        let storage = StorageAdapter::new(dir.path());
        let counter = Arc::new(AtomicUsize::new(0));
        let mut refresh = SmartRefresh::new(Duration::from_millis(20));

        {
            let counter = Arc::clone(&counter);
            refresh.schedule(&storage, snapshot(now_millis()), move || {
                counter.store(1, Ordering::SeqCst);
            });
        }
        assert!(refresh.is_pending());
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!refresh.is_pending());
        // the snapshot stays for the post-refresh restore
        assert!(storage.contains(Scope::Session, KEY_UI_STATE));
    }

    #[tokio::test]
    async fn cancel_clears_tasks_and_snapshot() {
        let dir = TempDir::new().unwrap();
        let storage = StorageAdapter::new(dir.path());
        let counter = Arc::new(AtomicUsize::new(0));
        let mut refresh = SmartRefresh::new(Duration::from_millis(30));

        {
            let counter = Arc::clone(&counter);
            refresh.schedule(&storage, snapshot(now_millis()), move || {
                counter.store(1, Ordering::SeqCst);
            });
        }
        refresh.cancel(&storage);
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(!refresh.is_pending());
        assert!(!storage.contains(Scope::Session, KEY_UI_STATE));
    }

    #[test]
    fn stale_snapshot_is_discarded_on_restore() {
        let dir = TempDir::new().unwrap();
        let storage = StorageAdapter::new(dir.path());
        let now = now_millis();

        save_ui_snapshot(&storage, &snapshot(now - UI_STATE_MAX_AGE_MS - 1));
        assert!(restore_ui_snapshot(&storage, now).is_none());
        assert!(!storage.contains(Scope::Session, KEY_UI_STATE));

        save_ui_snapshot(&storage, &snapshot(now - 1_000));
        let restored = restore_ui_snapshot(&storage, now).unwrap();
        assert_eq!(restored.search_term, "lenovo");
    }
}
