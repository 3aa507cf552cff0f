//! Workspace watch mode
//!
//! Blocks on file-system notifications for the workspace root, collects
//! events for manifest-tracked files until they have been quiet for the
//! debounce window, then runs one restricted sync for the collected paths. Stopping is checked between
//! syncs, never during one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use super::manifest::ExportManifest;
use super::sync::{RetryPolicy, SyncSummary, sync_manifest_with};
use crate::constants::workspace::{DEFAULT_DEBOUNCE_MS, WATCH_POLL_MS};
use crate::types::{Result, WikiError, redact_secrets};

/// Watches one exported workspace and syncs edits back into its cache
#[derive(Debug, Clone)]
pub struct WorkspaceWatcher {
    manifest_path: PathBuf,
    debounce: Duration,
    retry: RetryPolicy,
}

/// Running watcher thread
pub struct WatchHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl WatchHandle {
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Request a stop and wait for the thread. A sync in progress finishes
    /// first, so the manifest is never left half-written.
    pub fn stop(mut self) -> Result<()> {
        self.stop.store(true, Ordering::SeqCst);
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| WikiError::Workspace("watch thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl WorkspaceWatcher {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Run on a background thread, calling `on_sync` after every sync
    pub fn spawn<F>(self, on_sync: F) -> Result<WatchHandle>
    where
        F: FnMut(&SyncSummary) + Send + 'static,
    {
        // Fail fast on a bad manifest instead of inside the thread.
        ExportManifest::load(&self.manifest_path)?;

        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let thread = std::thread::Builder::new()
            .name("wikidelta-watch".to_string())
            .spawn(move || self.run(&flag, on_sync))?;

        Ok(WatchHandle {
            stop,
            thread: Some(thread),
        })
    }

    /// Block the current thread until `stop` is set.
    ///
    /// Sync failures are logged and the loop keeps going; a corrupt manifest
    /// or a vanished cache ends the loop with that error.
    pub fn run<F>(&self, stop: &AtomicBool, mut on_sync: F) -> Result<()>
    where
        F: FnMut(&SyncSummary),
    {
        let manifest = ExportManifest::load(&self.manifest_path)?;
        let root = self
            .manifest_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let tracked: BTreeSet<PathBuf> = manifest
            .tracked_files()
            .iter()
            .map(|rel| root.join(rel))
            .collect();

        let (tx, rx) = mpsc::channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(
            "Watching {} ({} files, debounce {:?})",
            root.display(),
            tracked.len(),
            self.debounce
        );

        let poll = Duration::from_millis(WATCH_POLL_MS);
        let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
        let mut deadline: Option<Instant> = None;

        while !stop.load(Ordering::SeqCst) {
            let wait = deadline
                .map(|d| d.saturating_duration_since(Instant::now()).min(poll))
                .unwrap_or(poll);

            match rx.recv_timeout(wait) {
                Ok(Ok(event)) => {
                    if !is_content_event(&event.kind) {
                        continue;
                    }
                    let mut touched = false;
                    for path in event.paths.into_iter().filter(|p| tracked.contains(p)) {
                        pending.insert(path);
                        touched = true;
                    }
                    // Quiet period restarts on every write to a tracked file
                    if touched {
                        deadline = Some(Instant::now() + self.debounce);
                    }
                }
                Ok(Err(e)) => warn!("Watch error: {}", e),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(WikiError::Workspace("watcher channel closed".to_string()));
                }
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                deadline = None;
                let paths: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                debug!("Debounced {} changed files", paths.len());

                match sync_manifest_with(&self.manifest_path, Some(&paths), &self.retry) {
                    Ok(summary) => {
                        if summary.updated > 0 {
                            info!("Synced {} pages", summary.updated);
                        }
                        on_sync(&summary);
                    }
                    Err(e @ (WikiError::ManifestCorrupt { .. } | WikiError::CacheMissing { .. })) => {
                        error!("Stopping watch: {}", e);
                        return Err(e);
                    }
                    Err(e) => warn!("Sync failed: {}", redact_secrets(&e.to_string())),
                }
            }
        }

        info!("Stopped watching {}", root.display());
        Ok(())
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}
