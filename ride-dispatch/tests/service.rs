use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use futures_util::future::join_all;
use reqwest::Client;
use ride_dispatch::{
    api::AppState,
    dispatch::Dispatcher,
    driver::{Driver, DriverRegistry},
    providers::{Geocoder, RouteProvider},
    server::Server,
};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

const USER_AGENT: &str = "RideSharingApp/1.0";

/// A dispatch server on an ephemeral port, stopped by `shutdown`.
struct TestService {
    base: String,
    http: Client,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<()>,
}

impl TestService {
    async fn start(registry: DriverRegistry, upstream: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let client = Client::new();
        let upstream = format!("http://{upstream}");
        let state = AppState::new(
            Arc::new(Dispatcher::new(registry)),
            Geocoder::new(client.clone(), &upstream, USER_AGENT),
            RouteProvider::new(client.clone(), &upstream),
        );
        let server = Server::new(listener, state);
        let addr = server.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            let shutdown = async move {
                let _ = shutdown_rx.await;
            };
            let _ = server.run_until(shutdown).await;
        });

        Ok(Self {
            base: format!("http://{addr}"),
            http: client,
            shutdown_tx,
            server,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn request_ride(&self, lat: f64, lon: f64) -> Result<(StatusCode, Value)> {
        let response = self
            .http
            .post(self.url("/request-ride"))
            .json(&json!({ "lat": lat, "lon": lon }))
            .send()
            .await?;
        Ok((response.status(), response.json().await?))
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        let response = self.http.get(self.url(path)).send().await?;
        Ok((response.status(), response.json().await?))
    }

    async fn post(&self, path: &str) -> Result<(StatusCode, Value)> {
        let response = self.http.post(self.url(path)).send().await?;
        Ok((response.status(), response.json().await?))
    }

    async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.server.await;
    }
}

/// Minimal geocoding and routing upstream with canned answers.
async fn spawn_upstream() -> Result<(SocketAddr, oneshot::Sender<()>)> {
    async fn search(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        if headers.get(header::USER_AGENT).and_then(|ua| ua.to_str().ok()) != Some(USER_AGENT) {
            return (StatusCode::FORBIDDEN, Json(json!({ "error": "user agent required" })));
        }
        match params.get("q").map(String::as_str) {
            Some("New York") => (
                StatusCode::OK,
                Json(json!([{ "lat": "40.7128", "lon": "-74.0060", "display_name": "New York" }])),
            ),
            _ => (StatusCode::OK, Json(json!([]))),
        }
    }

    async fn route(Path(coords): Path<String>) -> Json<Value> {
        let points: Vec<Vec<f64>> = coords
            .split(';')
            .map(|pair| pair.split(',').filter_map(|part| part.parse().ok()).collect())
            .collect();
        Json(json!({
            "code": "Ok",
            "routes": [{
                "distance": 1234.5,
                "duration": 321.0,
                "geometry": { "type": "LineString", "coordinates": points },
            }],
        }))
    }

    let app = Router::new()
        .route("/search", get(search))
        .route("/route/v1/driving/:coords", get(route));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });
    Ok((addr, shutdown_tx))
}

#[tokio::test]
async fn ride_lifecycle_over_http() -> Result<()> {
    let (upstream, upstream_tx) = spawn_upstream().await?;
    let service = TestService::start(DriverRegistry::demo(), upstream).await?;

    let (status, assigned) = service.request_ride(40.7200, -74.0050).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(assigned["status"], "assigned");
    assert_eq!(assigned["driver"]["id"], "d1");
    assert_eq!(assigned["driver"]["name"], "John");
    assert!(assigned["driver"]["distance"].as_f64().expect("distance") >= 0.0);
    let ride_id = assigned["ride_id"].as_str().expect("ride id").to_string();

    let (status, drivers) = service.get("/drivers").await?;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = drivers
        .as_array()
        .expect("driver list")
        .iter()
        .map(|driver| driver["id"].as_str().expect("id").to_string())
        .collect();
    assert_eq!(ids, vec!["d2", "d3"]);

    let (status, ride) = service.get(&format!("/ride-status/{ride_id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ride["id"], ride_id.as_str());
    assert_eq!(ride["rider_lat"], 40.72);
    assert_eq!(ride["rider_lon"], -74.005);
    assert_eq!(ride["status"], "assigned");
    assert_eq!(ride["driver"], assigned["driver"]);

    let (status, completed) = service.post(&format!("/complete-ride/{ride_id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["message"], "Ride completed");
    assert_eq!(completed["ride"]["status"], "completed");

    let (_, drivers) = service.get("/drivers").await?;
    assert_eq!(drivers.as_array().map(Vec::len), Some(3));

    // A second completion answers the same way and changes nothing.
    let (status, again) = service.post(&format!("/complete-ride/{ride_id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["ride"]["status"], "completed");

    service.shutdown().await;
    let _ = upstream_tx.send(());
    Ok(())
}

#[tokio::test]
async fn no_drivers_left_is_not_found() -> Result<()> {
    let (upstream, upstream_tx) = spawn_upstream().await?;
    let service = TestService::start(DriverRegistry::demo(), upstream).await?;

    for _ in 0..3 {
        let (status, _) = service.request_ride(40.7200, -74.0050).await?;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = service.request_ride(40.7200, -74.0050).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No drivers available");

    let (_, drivers) = service.get("/drivers").await?;
    assert_eq!(drivers, json!([]));

    service.shutdown().await;
    let _ = upstream_tx.send(());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_last_driver() -> Result<()> {
    let (upstream, upstream_tx) = spawn_upstream().await?;
    let registry = DriverRegistry::new(vec![Driver::new("last", "Last", 40.7128, -74.0060)])?;
    let service = TestService::start(registry, upstream).await?;

    let attempts = (0..8).map(|_| service.request_ride(40.7200, -74.0050));
    let results = join_all(attempts).await;

    let mut winners = Vec::new();
    let mut refused = 0;
    for result in results {
        let (status, body) = result?;
        match status {
            StatusCode::CREATED => winners.push(body["driver"]["id"].clone()),
            StatusCode::NOT_FOUND => {
                assert_eq!(body["error"], "No drivers available");
                refused += 1;
            }
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(winners, vec![json!("last")]);
    assert_eq!(refused, 7);

    service.shutdown().await;
    let _ = upstream_tx.send(());
    Ok(())
}

#[tokio::test]
async fn geocoding_and_routing_go_through_providers() -> Result<()> {
    let (upstream, upstream_tx) = spawn_upstream().await?;
    let service = TestService::start(DriverRegistry::demo(), upstream).await?;

    let (status, point) = service.get("/geocode?address=New%20York").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(point, json!({ "lat": 40.7128, "lon": -74.006 }));

    let (status, body) = service.get("/geocode?address=Atlantis").await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Address not found");

    let (_, assigned) = service.request_ride(40.7200, -74.0050).await?;
    let ride_id = assigned["ride_id"].as_str().expect("ride id").to_string();
    let (status, route) = service.get(&format!("/ride-route/{ride_id}")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(route["distance"], 1234.5);
    assert_eq!(route["duration"], 321.0);
    // Driver snapshot first, then the pickup, as lon/lat pairs.
    assert_eq!(
        route["geometry"]["coordinates"],
        json!([[-74.006, 40.7128], [-74.005, 40.72]])
    );

    service.shutdown().await;
    let _ = upstream_tx.send(());
    Ok(())
}

#[tokio::test]
async fn geocoder_sends_its_user_agent() -> Result<()> {
    let (upstream, upstream_tx) = spawn_upstream().await?;
    let client = Client::new();
    let base = format!("http://{upstream}");

    let polite = Geocoder::new(client.clone(), &base, USER_AGENT);
    assert!(polite.geocode("New York").await.is_some());

    let anonymous = Geocoder::new(client, &base, "someone-else");
    assert!(anonymous.geocode("New York").await.is_none());

    let _ = upstream_tx.send(());
    Ok(())
}
