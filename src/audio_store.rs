//! Per-client audio artifact state
//!
//! Each robot has at most one live response artifact. Replacing it deletes
//! the superseded file while holding that robot's lock, and readers copy the
//! bytes under the same lock, so a reader never observes a path whose backing
//! file a concurrent writer already removed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::{Error, Result};

type Slot = Arc<tokio::sync::Mutex<Option<PathBuf>>>;

/// Tracks the current response audio file per robot
#[derive(Debug, Default, Clone)]
pub struct AudioStateStore {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl AudioStateStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, robot_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        slots
            .entry(robot_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(None)))
            .clone()
    }

    /// Replace the robot's current artifact, deleting the superseded file
    pub async fn set(&self, robot_id: &str, path: PathBuf) {
        let slot = self.slot(robot_id);
        let mut guard = slot.lock().await;

        if let Some(old) = guard.replace(path) {
            if let Err(e) = tokio::fs::remove_file(&old).await {
                tracing::warn!(path = %old.display(), error = %e, "failed to delete superseded audio");
            } else {
                tracing::debug!(path = %old.display(), "superseded audio deleted");
            }
        }
    }

    /// Read the robot's current artifact bytes
    ///
    /// The copy happens under the robot's lock, so a concurrent `set` cannot
    /// delete the file mid-read.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` when no artifact exists
    pub async fn read(&self, robot_id: &str) -> Result<Vec<u8>> {
        let slot = self.slot(robot_id);
        let guard = slot.lock().await;

        let Some(path) = guard.as_ref() else {
            return Err(Error::NotFound(format!(
                "no audio response for robot {robot_id}"
            )));
        };

        Ok(tokio::fs::read(path).await?)
    }

    /// Current artifact path, if any
    pub async fn get(&self, robot_id: &str) -> Option<PathBuf> {
        let slot = self.slot(robot_id);
        let current = slot.lock().await.clone();
        current
    }

    /// Drop the robot's artifact, deleting the backing file best-effort
    pub async fn clear(&self, robot_id: &str) {
        let slot = self.slot(robot_id);
        let mut guard = slot.lock().await;

        if let Some(old) = guard.take() {
            if let Err(e) = tokio::fs::remove_file(&old).await {
                tracing::debug!(path = %old.display(), error = %e, "audio already gone on clear");
            }
        }
    }
}
