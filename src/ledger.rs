//! First-contact ledger
//!
//! A durable set of entity ids that have completed first contact, stored as
//! plain text (one decimal id per line, ascending). Registrations schedule a
//! debounced save; the set is copied before any disk I/O so a slow write
//! never blocks concurrent registrations.

use crate::error::{GuardError, Result};
use skinguard_host::EntityId;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SaveSchedule {
    pending: bool,
    next_save_at: Option<Instant>,
}

#[derive(Debug)]
pub struct LedgerStore {
    path: PathBuf,
    debounce: Duration,
    ids: Mutex<BTreeSet<EntityId>>,
    schedule: Mutex<SaveSchedule>,
}

/// Parse ledger contents, skipping blank and malformed lines
pub fn parse(contents: &str) -> BTreeSet<EntityId> {
    contents
        .lines()
        .filter_map(|line| line.trim().parse::<EntityId>().ok())
        .collect()
}

/// Render ledger contents, one id per line in ascending order
pub fn render(ids: &BTreeSet<EntityId>) -> String {
    let mut out = String::with_capacity(ids.len() * 18);
    for id in ids {
        out.push_str(&id.to_string());
        out.push('\n');
    }
    out
}

impl LedgerStore {
    /// Empty ledger that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self::with_ids(path, debounce, BTreeSet::new())
    }

    fn with_ids(path: impl Into<PathBuf>, debounce: Duration, ids: BTreeSet<EntityId>) -> Self {
        Self {
            path: path.into(),
            debounce,
            ids: Mutex::new(ids),
            schedule: Mutex::new(SaveSchedule::default()),
        }
    }

    /// Load the ledger from `path`
    ///
    /// A missing file is a fresh start. Any other read failure is logged and
    /// also yields an empty ledger.
    pub async fn load(path: impl Into<PathBuf>, debounce: Duration) -> Self {
        let path = path.into();
        let ids = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => parse(&contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No ledger at {}, starting fresh", path.display());
                BTreeSet::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read ledger {}: {}. Starting with an empty ledger",
                    path.display(),
                    e
                );
                BTreeSet::new()
            }
        };

        Self::with_ids(path, debounce, ids)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register first contact for `id`
    ///
    /// Returns true exactly once per id. A new registration schedules a save.
    pub async fn mark_first_contact(&self, id: EntityId) -> bool {
        let inserted = self.ids.lock().await.insert(id);
        if inserted {
            self.queue_save().await;
        }
        inserted
    }

    pub async fn contains(&self, id: EntityId) -> bool {
        self.ids.lock().await.contains(&id)
    }

    pub async fn len(&self) -> usize {
        self.ids.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// All registered ids, ascending
    pub async fn ids(&self) -> Vec<EntityId> {
        self.ids.lock().await.iter().copied().collect()
    }

    pub async fn is_save_pending(&self) -> bool {
        self.schedule.lock().await.pending
    }

    /// Mark a save as pending
    ///
    /// An already scheduled save keeps its deadline so a stream of
    /// registrations coalesces into one write.
    async fn queue_save(&self) {
        let now = Instant::now();
        let mut schedule = self.schedule.lock().await;
        schedule.pending = true;
        match schedule.next_save_at {
            Some(at) if at > now => {}
            _ => schedule.next_save_at = Some(now + self.debounce),
        }
    }

    /// Write the ledger if a save is pending and its deadline has passed
    ///
    /// Returns `Ok(true)` when a write happened. A failed write is queued
    /// again for the next debounce cycle.
    pub async fn flush_if_due(&self) -> Result<bool> {
        {
            let mut schedule = self.schedule.lock().await;
            let due = matches!(schedule.next_save_at, Some(at) if Instant::now() >= at);
            if !schedule.pending || !due {
                return Ok(false);
            }
            schedule.pending = false;
            schedule.next_save_at = None;
        }

        if let Err(e) = self.save().await {
            self.queue_save().await;
            return Err(e);
        }
        Ok(true)
    }

    /// Write the ledger immediately, bypassing the debounce
    pub async fn flush_now(&self) -> Result<()> {
        {
            let mut schedule = self.schedule.lock().await;
            schedule.pending = false;
            schedule.next_save_at = None;
        }

        if let Err(e) = self.save().await {
            self.queue_save().await;
            return Err(e);
        }
        Ok(())
    }

    async fn save(&self) -> Result<()> {
        let snapshot = self.ids.lock().await.clone();
        let contents = render(&snapshot);

        let ledger_err = |source: io::Error| GuardError::Ledger {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(ledger_err)?;
        }

        // Write a sibling file and rename it over the target so a failed
        // write leaves the previous contents in place.
        let tmp_path = self.temp_path();
        if let Err(e) = tokio::fs::write(&tmp_path, contents).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(ledger_err(e));
        }
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(ledger_err)?;

        info!(
            "Saved {} first-contact entries to {}",
            snapshot.len(),
            self.path.display()
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
