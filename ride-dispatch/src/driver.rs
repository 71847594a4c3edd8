//! Driver records and the registry that owns them.

use std::{collections::HashSet, path::Path};

use anyhow::{ensure, Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

pub type DriverId = String;

/// Largest per-axis jitter offset, in degrees.
pub const MAX_JITTER_DEGREES: f64 = 90.0;

/// A driver as stored in the registry and returned by `GET /drivers`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub available: bool,
}

impl Driver {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            lat,
            lon,
            available: true,
        }
    }
}

/// Roster file entry. Drivers always start out available.
#[derive(Debug, Deserialize)]
struct RosterEntry {
    id: DriverId,
    name: String,
    lat: f64,
    lon: f64,
}

/// Authoritative, ordered set of drivers.
///
/// Iteration order is insertion order and never changes, so matching ties are
/// resolved the same way on every scan.
#[derive(Debug, Clone)]
pub struct DriverRegistry {
    drivers: Vec<Driver>,
}

impl DriverRegistry {
    pub fn new(drivers: Vec<Driver>) -> Result<Self> {
        ensure!(!drivers.is_empty(), "driver roster cannot be empty");

        let mut seen = HashSet::new();
        for driver in &drivers {
            ensure!(
                seen.insert(driver.id.as_str()),
                "duplicate driver id '{}' in roster",
                driver.id
            );
        }

        Ok(Self { drivers })
    }

    /// Three drivers around lower Manhattan, all available.
    pub fn demo() -> Self {
        Self::new(vec![
            Driver::new("d1", "John", 40.7128, -74.0060),
            Driver::new("d2", "Sarah", 40.7300, -74.0100),
            Driver::new("d3", "Mike", 40.7400, -73.9900),
        ])
        .expect("valid demo roster")
    }

    /// Loads a roster from a JSON array of `{id, name, lat, lon}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read roster {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("invalid roster {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let entries: Vec<RosterEntry> = serde_json::from_str(raw)?;
        let drivers = entries
            .into_iter()
            .map(|entry| Driver::new(entry.id, entry.name, entry.lat, entry.lon))
            .collect();
        Self::new(drivers)
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    /// Snapshot of the drivers that can currently be matched.
    pub fn list_available(&self) -> Vec<Driver> {
        self.drivers
            .iter()
            .filter(|driver| driver.available)
            .cloned()
            .collect()
    }

    pub fn set_availability(&mut self, id: &str, available: bool) -> Result<(), DispatchError> {
        let driver = self
            .drivers
            .iter_mut()
            .find(|driver| driver.id == id)
            .ok_or_else(|| DispatchError::DriverNotFound(id.to_string()))?;
        driver.available = available;
        Ok(())
    }

    /// Moves every driver by an independent uniform offset in
    /// `[-max_offset, +max_offset]` degrees on each axis.
    ///
    /// Offsets that are not finite, not positive or above
    /// [`MAX_JITTER_DEGREES`] leave every driver where it is.
    pub fn apply_jitter<R: Rng + ?Sized>(&mut self, max_offset: f64, rng: &mut R) {
        if !max_offset.is_finite() || max_offset <= 0.0 || max_offset > MAX_JITTER_DEGREES {
            return;
        }
        for driver in &mut self.drivers {
            driver.lat += rng.gen_range(-max_offset..=max_offset);
            driver.lon += rng.gen_range(-max_offset..=max_offset);
        }
    }
}
