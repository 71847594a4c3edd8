//! Best-effort clients for the external geocoding and routing services.
//!
//! Neither client retries. Any transport, status or decoding failure is
//! logged here and reported to the caller as `None`.

use anyhow::{Context, Result};
use reqwest::{header::USER_AGENT, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Driving route summary: meters, seconds and a GeoJSON line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub distance: f64,
    pub duration: f64,
    pub geometry: serde_json::Value,
}

/// Nominatim-style address search.
#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Client,
    base_url: String,
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

impl Geocoder {
    pub fn new(client: Client, base_url: &str, user_agent: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    /// Coordinates of the best match for `address`, if the service found one.
    pub async fn geocode(&self, address: &str) -> Option<GeoPoint> {
        match self.search(address).await {
            Ok(found) => found,
            Err(err) => {
                warn!(address, error = ?err, "geocoding request failed");
                None
            }
        }
    }

    async fn search(&self, address: &str) -> Result<Option<GeoPoint>> {
        let places: Vec<Place> = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        first_place(places)
    }
}

fn first_place(places: Vec<Place>) -> Result<Option<GeoPoint>> {
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let lat = place
        .lat
        .parse()
        .with_context(|| format!("bad latitude '{}'", place.lat))?;
    let lon = place
        .lon
        .parse()
        .with_context(|| format!("bad longitude '{}'", place.lon))?;
    Ok(Some(GeoPoint { lat, lon }))
}

/// OSRM-style driving directions.
#[derive(Debug, Clone)]
pub struct RouteProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

impl RouteProvider {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn route(&self, from: GeoPoint, to: GeoPoint) -> Option<Route> {
        match self.fetch(from, to).await {
            Ok(route) => route,
            Err(err) => {
                warn!(?from, ?to, error = ?err, "routing request failed");
                None
            }
        }
    }

    async fn fetch(&self, from: GeoPoint, to: GeoPoint) -> Result<Option<Route>> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url, from.lon, from.lat, to.lon, to.lat
        );
        let response: RouteResponse = self
            .client
            .get(url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(first_route(response))
    }
}

fn first_route(response: RouteResponse) -> Option<Route> {
    if response.code != "Ok" {
        debug!(code = %response.code, "router returned no route");
        return None;
    }
    response.routes.into_iter().next()
}
