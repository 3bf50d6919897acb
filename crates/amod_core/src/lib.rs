//! # AMoD Dispatch Core
//!
//! The dispatch-and-scheduling engine for an on-demand, ride-pooling
//! autonomous mobility-on-demand fleet.
//!
//! ## Overview
//!
//! This crate provides the per-epoch core of the simulator, including:
//!
//! - **Routing**: a read-only oracle over precomputed shortest-path tables
//! - **Schedule building**: insertion-based schedule construction, validation,
//!   cost and score computation
//! - **Trip enumeration**: per-vehicle feasible (trip, schedule) search with
//!   sub-trip pruning
//! - **Assignment**: maximum-weight matching between vehicles and trips
//! - **Dispatch orchestration**: single-request batch (SBA) and optimal
//!   schedule pool (OSP) strategies
//! - **Rebalancing**: nearest-pending-order (NPO) idle-vehicle repositioning
//! - **Vehicle advancement**: realizing committed schedules over a time step
//! - **Platform**: the epoch loop tying all of the above together
//!
//! ## Example
//!
//! ```rust,no_run
//! use amod_core::scenario::{build_scenario, ScenarioParams};
//!
//! let params = ScenarioParams::default().with_fleet_size(10);
//! let mut scenario = build_scenario(params).unwrap();
//! scenario.platform.run(scenario.total_epochs());
//! ```

pub mod advancer;
pub mod assigner;
pub mod data;
pub mod dispatcher;
pub mod enumerator;
pub mod error;
pub mod order;
pub mod platform;
pub mod rebalancer;
pub mod request;
pub mod router;
pub mod schedule;
pub mod scenario;
pub mod types;
pub mod vehicle;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;
