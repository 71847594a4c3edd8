//! Ride records and the append-only ledger that tracks their lifecycle.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{error::DispatchError, matching::MatchedDriver};

pub type RideId = String;

/// Lifecycle of a ride. The only transition is `Assigned -> Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Assigned,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ride {
    pub id: RideId,
    pub rider_lat: f64,
    pub rider_lon: f64,
    pub driver: MatchedDriver,
    pub status: RideStatus,
}

impl Ride {
    pub fn driver_id(&self) -> &str {
        &self.driver.driver.id
    }
}

/// Outcome of a completion request.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The ride moved from `Assigned` to `Completed`; its driver must be freed.
    Completed(Ride),
    /// The ride was already completed and nothing changed.
    AlreadyCompleted(Ride),
}

impl Completion {
    pub fn into_ride(self) -> Ride {
        match self {
            Self::Completed(ride) | Self::AlreadyCompleted(ride) => ride,
        }
    }
}

/// Every ride created during the process lifetime, keyed by id.
#[derive(Debug, Default)]
pub struct RideLedger {
    rides: HashMap<RideId, Ride>,
}

impl RideLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new assigned ride under a fresh id.
    ///
    /// Reserving the driver is the caller's job and must happen under the
    /// same lock as the match that produced `driver`.
    pub fn create_ride(&mut self, rider_lat: f64, rider_lon: f64, driver: MatchedDriver) -> Ride {
        let id = self.fresh_id();
        let ride = Ride {
            id: id.clone(),
            rider_lat,
            rider_lon,
            driver,
            status: RideStatus::Assigned,
        };
        self.rides.insert(id, ride.clone());
        ride
    }

    pub fn get_ride(&self, id: &str) -> Option<&Ride> {
        self.rides.get(id)
    }

    pub fn complete_ride(&mut self, id: &str) -> Result<Completion, DispatchError> {
        let ride = self.rides.get_mut(id).ok_or(DispatchError::RideNotFound)?;
        if ride.status == RideStatus::Completed {
            return Ok(Completion::AlreadyCompleted(ride.clone()));
        }
        ride.status = RideStatus::Completed;
        Ok(Completion::Completed(ride.clone()))
    }

    fn fresh_id(&self) -> RideId {
        loop {
            let id = nanoid::nanoid!();
            if !self.rides.contains_key(&id) {
                return id;
            }
        }
    }
}
