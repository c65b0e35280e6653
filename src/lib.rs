//! Voyage Physics - narrative trajectory checker
//!
//! Library crate for checking the physics of fictional interplanetary
//! voyages: two-body orbits, torch-ship brachistochrone transits,
//! mean-element planetary ephemeris and special-relativistic corrections,
//! plus the supporting checks a voyage narrative leans on: out-of-plane
//! geometry, planetary flybys, ship mass over time and light-time delays.
//! Every numerical routine can be exported as cross-validation cases for an
//! independent reference implementation.

pub mod comms;
pub mod crossval;
pub mod elements;
pub mod ephemeris;
pub mod error;
pub mod flyby;
pub mod kepler;
pub mod mass_timeline;
pub mod propagation;
pub mod relativistic;
pub mod scenario;
pub mod state;
pub mod time;
pub mod transfer;
pub mod types;
pub mod units;
pub mod vector;

pub use error::{PhysicsError, PhysicsResult};

#[cfg(test)]
pub mod test_utils;
