//! Watermark store
//!
//! File-based persistence of the watermark with atomic writes. The watermark
//! is read once when a run starts and written once when a window commits.

use super::types::{parse_date, WatermarkState, DATE_FORMAT};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Persists the last fully ingested date
#[derive(Debug)]
pub struct WatermarkStore {
    /// Path to the state file
    path: PathBuf,
    /// Current state (cached)
    state: Arc<RwLock<WatermarkState>>,
    /// Returned when nothing has been persisted yet
    initial: Option<NaiveDate>,
}

impl WatermarkStore {
    /// Create a store for the given path; nothing is read yet
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(WatermarkState::new())),
            initial: None,
        }
    }

    /// Create an in-memory store (no file persistence)
    pub fn in_memory() -> Self {
        Self::new(PathBuf::new())
    }

    /// Create a store from a file, loading the watermark if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;
            parse_state(&contents)?
        } else {
            WatermarkState::new()
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
            initial: None,
        })
    }

    /// Set the watermark used before anything has been persisted
    #[must_use]
    pub fn with_initial(mut self, date: Option<NaiveDate>) -> Self {
        self.initial = date;
        self
    }

    /// Reload state from file
    pub async fn load(&self) -> Result<()> {
        if self.is_in_memory() || !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;
        let loaded = parse_state(&contents)?;

        *self.state.write().await = loaded;
        Ok(())
    }

    /// Save current state to file
    pub async fn save(&self) -> Result<()> {
        let state = self.state.read().await.clone();
        self.write_file(&state).await
    }

    /// Write `state` to the file without touching the cached state
    async fn write_file(&self, state: &WatermarkState) -> Result<()> {
        if self.is_in_memory() {
            return Ok(());
        }

        let contents = serde_json::to_string_pretty(state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::State {
                    message: format!("Failed to create state directory: {e}"),
                })?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to rename state file: {e}"),
            })?;

        Ok(())
    }

    /// Last fully ingested date, falling back to the initial watermark
    pub async fn last_date(&self) -> Result<NaiveDate> {
        let state = self.state.read().await;
        state.last_run_date.or(self.initial).ok_or_else(|| Error::State {
            message: format!(
                "No watermark in {} and no initial watermark configured",
                self.describe()
            ),
        })
    }

    /// Last fully ingested date as `YYYY-MM-DD`
    pub async fn get_last_state(&self) -> Result<String> {
        Ok(self.last_date().await?.format(DATE_FORMAT).to_string())
    }

    /// Persist a new watermark given as `YYYY-MM-DD`
    pub async fn update_state(&self, last_run_date: &str) -> Result<()> {
        let date = parse_date(last_run_date).ok_or_else(|| Error::State {
            message: format!("Invalid watermark '{last_run_date}', expected YYYY-MM-DD"),
        })?;
        self.advance_to(date).await
    }

    /// Persist a new watermark. Moving backwards is rejected.
    ///
    /// The cached watermark only changes once the file is written.
    pub async fn advance_to(&self, date: NaiveDate) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if let Some(current) = state.last_run_date.or(self.initial) {
                if date < current {
                    return Err(Error::State {
                        message: format!("Watermark cannot move backwards from {current} to {date}"),
                    });
                }
            }
            let next = WatermarkState::at(date);
            self.write_file(&next).await?;
            *state = next;
        }

        info!(watermark = %date, store = %self.describe(), "Watermark updated");
        Ok(())
    }

    /// Overwrite the watermark regardless of order (operator override)
    pub async fn reset_to(&self, date: NaiveDate) -> Result<()> {
        let mut state = self.state.write().await;
        let next = WatermarkState::at(date);
        self.write_file(&next).await?;
        *state = next;
        Ok(())
    }

    /// Get a copy of the current state
    pub async fn state(&self) -> WatermarkState {
        self.state.read().await.clone()
    }

    /// Export state as pretty-printed JSON string
    pub async fn to_json_pretty(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    fn describe(&self) -> String {
        if self.is_in_memory() {
            "memory".to_string()
        } else {
            self.path.display().to_string()
        }
    }
}

impl Clone for WatermarkStore {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
            initial: self.initial,
        }
    }
}

fn parse_state(contents: &str) -> Result<WatermarkState> {
    serde_json::from_str(contents).map_err(|e| Error::State {
        message: format!("Failed to parse state file: {e}"),
    })
}
