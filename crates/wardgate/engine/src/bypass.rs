//! Per-actor bypass flags, optionally durable across restarts.

use std::path::PathBuf;

use dashmap::DashSet;
use tracing::warn;

use wardgate_types::ActorId;

use crate::error::StoreError;

/// Concurrent set of actors whose bypass flag is on.
///
/// With a store configured, the full set is snapshotted to a newline-delimited
/// file on every mutation and on [`flush`](Self::flush); the snapshot is
/// best-effort, not transactional. I/O failures are logged and leave the
/// in-memory state untouched.
pub struct BypassRegistry {
    enabled: DashSet<ActorId>,
    store: Option<PathBuf>,
}

impl BypassRegistry {
    /// A registry that forgets everything on restart.
    pub fn in_memory() -> Self {
        Self {
            enabled: DashSet::new(),
            store: None,
        }
    }

    /// A registry backed by a newline-delimited actor-ID file.
    ///
    /// Existing entries are loaded immediately; unparsable lines are skipped.
    pub fn with_store(path: impl Into<PathBuf>) -> Self {
        let registry = Self {
            enabled: DashSet::new(),
            store: Some(path.into()),
        };
        if let Err(err) = registry.load() {
            warn!(error = %err, "failed to load bypass store");
        }
        registry
    }

    /// Whether the actor's bypass flag is on.
    pub fn has(&self, actor: &ActorId) -> bool {
        self.enabled.contains(actor)
    }

    /// Set the flag and return the new state.
    pub fn set(&self, actor: &ActorId, on: bool) -> bool {
        if on {
            self.enabled.insert(*actor);
        } else {
            self.enabled.remove(actor);
        }
        if let Err(err) = self.save() {
            warn!(error = %err, "failed to save bypass store");
        }
        on
    }

    /// Flip the flag and return the new state.
    pub fn toggle(&self, actor: &ActorId) -> bool {
        self.set(actor, !self.has(actor))
    }

    /// Write the current snapshot to the store, if one is configured.
    pub fn flush(&self) {
        if let Err(err) = self.save() {
            warn!(error = %err, "failed to flush bypass store");
        }
    }

    fn load(&self) -> Result<(), StoreError> {
        let Some(path) = &self.store else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.display().to_string(),
            source,
        })?;
        for line in contents.lines() {
            if let Ok(actor) = line.trim().parse::<ActorId>() {
                self.enabled.insert(actor);
            }
        }
        Ok(())
    }

    fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.store else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: path.display().to_string(),
                source,
            })?;
        }
        let lines: Vec<String> = self.enabled.iter().map(|a| a.to_string()).collect();
        std::fs::write(path, lines.join("\n")).map_err(|source| StoreError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}
