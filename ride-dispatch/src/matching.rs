//! Nearest-available-driver selection.

use serde::{Deserialize, Serialize};

use crate::{
    driver::Driver,
    geo::{haversine_km, round_km},
};

/// Copy of a driver taken at match time, plus the pickup distance in km.
///
/// The snapshot is independent of the registry: later moves or availability
/// changes do not touch it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedDriver {
    #[serde(flatten)]
    pub driver: Driver,
    pub distance: f64,
}

/// Returns the closest available driver to the rider, or `None` when every
/// driver is busy.
///
/// Ties go to the driver that comes first in `drivers`.
pub fn find_nearest(drivers: &[Driver], rider_lat: f64, rider_lon: f64) -> Option<MatchedDriver> {
    let mut nearest: Option<(&Driver, f64)> = None;

    for driver in drivers.iter().filter(|driver| driver.available) {
        let distance = haversine_km(rider_lat, rider_lon, driver.lat, driver.lon);
        let closer = match nearest {
            Some((_, best)) => distance < best,
            None => true,
        };
        if closer {
            nearest = Some((driver, distance));
        }
    }

    nearest.map(|(driver, distance)| MatchedDriver {
        driver: driver.clone(),
        distance: round_km(distance),
    })
}
