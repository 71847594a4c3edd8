//! HTTP routes for the dispatch service.
//!
//! Every failure is answered with `{"error": "..."}` and the status code
//! chosen by [`DispatchError::status`].

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{
    dispatch::Dispatcher,
    driver::Driver,
    error::DispatchError,
    matching::MatchedDriver,
    providers::{GeoPoint, Geocoder, Route, RouteProvider},
    ride::{Ride, RideId, RideStatus},
};

/// Shared handles given to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub geocoder: Geocoder,
    pub routes: RouteProvider,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, geocoder: Geocoder, routes: RouteProvider) -> Self {
        Self {
            dispatcher,
            geocoder,
            routes,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/request-ride", post(request_ride))
        .route("/drivers", get(available_drivers))
        .route("/ride-status/:ride_id", get(ride_status))
        .route("/complete-ride/:ride_id", post(complete_ride))
        .route("/ride-route/:ride_id", get(ride_route))
        .route("/geocode", get(geocode))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RideAssigned {
    pub ride_id: RideId,
    pub driver: MatchedDriver,
    pub status: RideStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RideCompleted {
    pub message: String,
    pub ride: Ride,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub address: Option<String>,
}

async fn home() -> Json<Value> {
    Json(json!({ "message": "Welcome to the Ride-Hailing API!" }))
}

async fn request_ride(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<RideAssigned>), DispatchError> {
    let Json(body) = payload.map_err(reject_body)?;
    let (lat, lon) = pickup(&body).ok_or_else(DispatchError::missing_coordinates)?;

    let ride = state.dispatcher.request_ride(lat, lon).await?;
    let assigned = RideAssigned {
        ride_id: ride.id,
        driver: ride.driver,
        status: ride.status,
    };
    Ok((StatusCode::CREATED, Json(assigned)))
}

/// Pickup coordinates of a `POST /request-ride` body. Only a JSON object with
/// numeric `lat` and `lon` members qualifies; arrays and scalars do not.
fn pickup(body: &Value) -> Option<(f64, f64)> {
    let body = body.as_object()?;
    Some((body.get("lat")?.as_f64()?, body.get("lon")?.as_f64()?))
}

fn reject_body(rejection: JsonRejection) -> DispatchError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => DispatchError::UnsupportedMediaType,
        other => {
            debug!(error = %other, "rejected ride request body");
            DispatchError::Validation(other.body_text())
        }
    }
}

async fn available_drivers(State(state): State<AppState>) -> Json<Vec<Driver>> {
    Json(state.dispatcher.available_drivers().await)
}

async fn ride_status(
    State(state): State<AppState>,
    Path(ride_id): Path<RideId>,
) -> Result<Json<Ride>, DispatchError> {
    state
        .dispatcher
        .ride(&ride_id)
        .await
        .map(Json)
        .ok_or(DispatchError::RideNotFound)
}

async fn complete_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<RideId>,
) -> Result<Json<RideCompleted>, DispatchError> {
    let ride = state.dispatcher.complete_ride(&ride_id).await?;
    Ok(Json(RideCompleted {
        message: "Ride completed".to_string(),
        ride,
    }))
}

/// Driving route from where the driver was at match time to the pickup.
async fn ride_route(
    State(state): State<AppState>,
    Path(ride_id): Path<RideId>,
) -> Result<Json<Route>, DispatchError> {
    let ride = state
        .dispatcher
        .ride(&ride_id)
        .await
        .ok_or(DispatchError::RideNotFound)?;

    let from = GeoPoint {
        lat: ride.driver.driver.lat,
        lon: ride.driver.driver.lon,
    };
    let to = GeoPoint {
        lat: ride.rider_lat,
        lon: ride.rider_lon,
    };
    state
        .routes
        .route(from, to)
        .await
        .map(Json)
        .ok_or(DispatchError::RouteUnavailable)
}

async fn geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> Result<Json<GeoPoint>, DispatchError> {
    let address = query
        .address
        .as_deref()
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .ok_or_else(|| DispatchError::Validation("Missing address".to_string()))?;

    state
        .geocoder
        .geocode(address)
        .await
        .map(Json)
        .ok_or(DispatchError::AddressNotFound)
}
