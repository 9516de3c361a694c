//! Persistence for the simulated-time anchor.
//!
//! # Responsibility
//! - Load and store `TimeAnchor` under a single settings key.

use crate::model::settings::TimeAnchor;
use crate::repo::kv_repo::{get_json, set_json, KeyValueStore, RepoResult};

/// Store key holding the time settings document.
pub const SETTINGS_KEY: &str = "timeSettings";

/// Typed access to the time settings document.
pub struct SettingsRepository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SettingsRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the stored anchor, or `None` when nothing was saved yet.
    pub fn load(&self) -> RepoResult<Option<TimeAnchor>> {
        get_json(&self.store, SETTINGS_KEY)
    }

    pub fn save(&self, anchor: &TimeAnchor) -> RepoResult<()> {
        set_json(&self.store, SETTINGS_KEY, anchor)
    }
}
