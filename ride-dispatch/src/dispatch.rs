//! Match-and-reserve coordination over the driver registry and ride ledger.

use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    driver::{Driver, DriverRegistry},
    error::DispatchError,
    matching::find_nearest,
    ride::{Completion, Ride, RideLedger},
};

/// Owns the roster and the ledger.
///
/// Both live behind one mutex: a ride request scans for the nearest driver,
/// records the ride and marks the driver busy without releasing the lock, so
/// two concurrent requests can never claim the same driver. Completions and
/// location jitter take the same lock.
pub struct Dispatcher {
    state: Mutex<DispatchState>,
}

struct DispatchState {
    registry: DriverRegistry,
    ledger: RideLedger,
}

impl Dispatcher {
    pub fn new(registry: DriverRegistry) -> Self {
        Self {
            state: Mutex::new(DispatchState {
                registry,
                ledger: RideLedger::new(),
            }),
        }
    }

    /// Assigns the nearest available driver to a rider at the given pickup.
    pub async fn request_ride(&self, rider_lat: f64, rider_lon: f64) -> Result<Ride, DispatchError> {
        let mut state = self.state.lock().await;
        let DispatchState { registry, ledger } = &mut *state;

        let matched = find_nearest(registry.drivers(), rider_lat, rider_lon)
            .ok_or(DispatchError::NoDriversAvailable)?;
        registry.set_availability(&matched.driver.id, false)?;
        let ride = ledger.create_ride(rider_lat, rider_lon, matched);

        info!(
            ride_id = %ride.id,
            driver_id = %ride.driver_id(),
            distance_km = ride.driver.distance,
            "ride assigned"
        );
        Ok(ride)
    }

    pub async fn available_drivers(&self) -> Vec<Driver> {
        self.state.lock().await.registry.list_available()
    }

    /// Full roster, busy drivers included.
    pub async fn drivers(&self) -> Vec<Driver> {
        self.state.lock().await.registry.drivers().to_vec()
    }

    pub async fn ride(&self, ride_id: &str) -> Option<Ride> {
        self.state.lock().await.ledger.get_ride(ride_id).cloned()
    }

    /// Completes a ride and frees its driver.
    ///
    /// Completing a ride twice returns the ride again without touching the
    /// driver, who may already be on another trip.
    pub async fn complete_ride(&self, ride_id: &str) -> Result<Ride, DispatchError> {
        let mut state = self.state.lock().await;
        let DispatchState { registry, ledger } = &mut *state;

        let completion = ledger.complete_ride(ride_id)?;
        match &completion {
            Completion::Completed(ride) => {
                registry.set_availability(ride.driver_id(), true)?;
                info!(ride_id = %ride.id, driver_id = %ride.driver_id(), "ride completed");
            }
            Completion::AlreadyCompleted(ride) => {
                debug!(ride_id = %ride.id, "ride already completed");
            }
        }
        Ok(completion.into_ride())
    }

    /// Nudges every driver by up to `max_offset` degrees on each axis.
    pub async fn apply_jitter(&self, max_offset: f64) {
        let mut state = self.state.lock().await;
        state.registry.apply_jitter(max_offset, &mut rand::thread_rng());
        debug!(drivers = state.registry.drivers().len(), max_offset, "driver locations refreshed");
    }

    pub async fn apply_jitter_with<R: Rng + Send + ?Sized>(&self, max_offset: f64, rng: &mut R) {
        let mut state = self.state.lock().await;
        state.registry.apply_jitter(max_offset, rng);
        debug!(drivers = state.registry.drivers().len(), max_offset, "driver locations refreshed");
    }
}
