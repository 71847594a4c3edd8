//! Ride dispatch service that matches riders with the nearest free driver.
//!
//! A rider posts a pickup coordinate, the service picks the closest available
//! driver, records the ride as assigned, and later marks it completed. Each
//! module focuses on a concrete responsibility:
//!
//! - [`geo`] computes great-circle distances.
//! - [`driver`] owns the driver roster and its availability flags.
//! - [`matching`] scans the roster for the nearest available driver.
//! - [`ride`] keeps the ledger of rides and their lifecycle.
//! - [`dispatch`] puts the roster and the ledger behind one lock so that
//!   matching and reserving a driver happen as a single step.
//! - [`refresher`] periodically nudges driver positions to simulate movement.
//! - [`providers`] talks to the external geocoding and routing services.
//! - [`api`] exposes the HTTP routes, and [`server`] runs them.
//! - [`cli`] parses command-line and environment configuration.
//! - [`error`] defines the error taxonomy and its HTTP mapping.
//!
//! Integration tests use this crate directly to exercise the dispatcher and
//! the HTTP contract.

pub mod api;
pub mod cli;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod geo;
pub mod matching;
pub mod providers;
pub mod refresher;
pub mod ride;
pub mod server;
