//! Time-anchor settings use-cases.
//!
//! # Responsibility
//! - Load, validate and save the simulated-time anchor.
//! - Establish the reference instant exactly once (idempotent initializer).
//! - Feed freshly loaded settings into a running `SimulatedClock`.
//!
//! # Invariants
//! - A saved anchor always combines into a valid local instant.
//! - Saving a new anchor keeps the stored reference instant.
//! - `ensure_reference_instant` writes only when no reference instant is stored.

use crate::clock::{anchor_instant, SimulatedClock, WallClock};
use crate::model::settings::TimeAnchor;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::KeyValueStore;
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

/// Settings facade over the key-value store.
pub struct SettingsService<S: KeyValueStore, W: WallClock> {
    repo: SettingsRepository<S>,
    wall: W,
}

impl<S: KeyValueStore, W: WallClock> SettingsService<S, W> {
    pub fn new(store: S, wall: W) -> Self {
        Self {
            repo: SettingsRepository::new(store),
            wall,
        }
    }

    /// Stored anchor, or an anchor equal to real now when nothing is stored.
    pub fn load_anchor(&self) -> ServiceResult<TimeAnchor> {
        Ok(self
            .repo
            .load()?
            .unwrap_or_else(|| TimeAnchor::starting_at(self.wall.now())))
    }

    /// Validates and stores a new anchor date/time.
    ///
    /// # Errors
    /// - `InvalidAnchor` when the pair does not form a valid local instant.
    pub fn save_anchor(&self, anchor_date: &str, anchor_time: &str) -> ServiceResult<TimeAnchor> {
        let anchor = self.load_anchor()?.with_anchor(anchor_date, anchor_time);
        anchor_instant(&anchor).map_err(ServiceError::InvalidAnchor)?;
        self.repo.save(&anchor)?;
        info!(
            "event=anchor_save module=service status=ok anchor_date={} anchor_time={}",
            anchor.anchor_date, anchor.anchor_time
        );
        Ok(anchor)
    }

    /// Records the reference instant if none is stored yet.
    ///
    /// Returns `true` when this call wrote it.
    pub fn ensure_reference_instant(&self) -> ServiceResult<bool> {
        let anchor = match self.repo.load()? {
            Some(anchor) if anchor.reference_instant.is_some() => return Ok(false),
            Some(mut anchor) => {
                anchor.set_reference_instant(self.wall.now());
                anchor
            }
            None => TimeAnchor::starting_at(self.wall.now()),
        };
        self.repo.save(&anchor)?;
        info!(
            "event=reference_instant_init module=service status=ok reference_instant={}",
            anchor.reference_instant.as_deref().unwrap_or_default()
        );
        Ok(true)
    }

    /// Re-establishes the reference instant at real now.
    ///
    /// Simulated time restarts from the anchor itself.
    pub fn reset_reference_instant(&self) -> ServiceResult<TimeAnchor> {
        let mut anchor = self.load_anchor()?;
        anchor.set_reference_instant(self.wall.now());
        self.repo.save(&anchor)?;
        info!("event=reference_instant_reset module=service status=ok");
        Ok(anchor)
    }

    /// Hands the currently stored settings to `clock`.
    pub fn reload_clock<C: WallClock>(&self, clock: &mut SimulatedClock<C>) -> ServiceResult<()> {
        clock.reload(self.load_anchor()?);
        Ok(())
    }
}

impl<S: KeyValueStore, W: WallClock + Clone> SettingsService<S, W> {
    /// Builds a clock over the stored settings and this service's wall clock.
    pub fn clock(&self) -> ServiceResult<SimulatedClock<W>> {
        Ok(SimulatedClock::new(self.load_anchor()?, self.wall.clone()))
    }
}
