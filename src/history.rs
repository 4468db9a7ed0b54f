// State history store
// Append-only log of immutable snapshots with live / frozen viewing

use std::path::Path;
use std::sync::Arc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A snapshot type that can absorb a partial update.
pub trait Snapshot: Default {
    type Update;

    /// New snapshot: fields present in `update` replace ours, the rest are shared.
    fn merge(&self, update: Self::Update) -> Self;
}

/// Which snapshot `current()` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Always the newest snapshot
    Live,
    /// Pinned to one index
    Frozen(usize),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("malformed history document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("history document contains no snapshots")]
    Empty,
    #[error("history file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
pub struct HistoryStore<S> {
    history: Vec<Arc<S>>,
    /// Shown and merged over while the history is empty
    seed: Arc<S>,
    view: ViewMode,
}

impl<S: Snapshot> HistoryStore<S> {
    pub fn new() -> Self {
        Self::with_seed(S::default())
    }

    pub fn with_seed(seed: S) -> Self {
        HistoryStore {
            history: Vec::new(),
            seed: Arc::new(seed),
            view: ViewMode::Live,
        }
    }

    /// Merge `update` over the newest snapshot and append the result.
    ///
    /// Frozen views are unaffected; the new snapshot is still built on top of the newest one,
    /// not on the one being viewed.
    pub fn append(&mut self, update: S::Update) -> usize {
        let next = self.latest().merge(update);
        self.history.push(Arc::new(next));
        self.history.len() - 1
    }

    /// Switch view. Frozen indices past the end are ignored. Returns the view now in effect.
    pub fn set_view(&mut self, view: ViewMode) -> ViewMode {
        match view {
            ViewMode::Frozen(i) if i >= self.history.len() => {
                debug!("Ignoring view {} (history has {} snapshots)", i, self.history.len());
            }
            v => self.view = v,
        }
        self.view
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn is_live(&self) -> bool {
        self.view == ViewMode::Live
    }

    /// The snapshot being viewed.
    pub fn current(&self) -> Arc<S> {
        match self.view {
            ViewMode::Live => self.latest(),
            ViewMode::Frozen(i) => Arc::clone(&self.history[i]),
        }
    }

    /// The newest snapshot, or the seed when empty.
    pub fn latest(&self) -> Arc<S> {
        self.history.last().cloned().unwrap_or_else(|| Arc::clone(&self.seed))
    }

    pub fn get(&self, index: usize) -> Option<Arc<S>> {
        self.history.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<S>> {
        self.history.iter()
    }

    /// Replace the whole history and go live. Empty input is refused.
    pub fn set_history(&mut self, snapshots: Vec<S>) -> Result<(), HistoryError> {
        if snapshots.is_empty() {
            return Err(HistoryError::Empty);
        }
        self.history = snapshots.into_iter().map(Arc::new).collect();
        self.view = ViewMode::Live;
        Ok(())
    }
}

impl<S: Snapshot + Serialize> HistoryStore<S> {
    /// Export as one JSON array.
    pub fn save(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string(&self.history)?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), HistoryError> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.history)?;
        std::io::Write::flush(&mut writer)?;
        Ok(())
    }
}

impl<S: Snapshot + DeserializeOwned> HistoryStore<S> {
    /// Import a document produced by `save`. On error the store is left untouched.
    pub fn load(&mut self, json: &str) -> Result<(), HistoryError> {
        let snapshots: Vec<S> = serde_json::from_str(json)?;
        self.set_history(snapshots)
    }

    pub fn load_from_path(&mut self, path: &Path) -> Result<(), HistoryError> {
        let json = std::fs::read_to_string(path)?;
        self.load(&json)
    }
}

impl<S: Snapshot> Default for HistoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}
