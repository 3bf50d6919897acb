//! Vehicles: capacitated agents that execute schedules of waypoints.

use crate::order::OrderId;
use crate::types::{DistMm, Pos, Step, TimeMs, VehicleId, Waypoint};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    Idle,
    Working,
    Rebalancing,
}

/// Cumulative travel statistics, split by the three load regimes the
/// advancer charges distance/time to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelStats {
    pub loaded_distance_mm: DistMm,
    pub loaded_time_ms: TimeMs,
    pub empty_distance_mm: DistMm,
    pub empty_time_ms: TimeMs,
    pub rebalancing_distance_mm: DistMm,
    pub rebalancing_time_ms: TimeMs,
}

/// A vehicle in the fleet. `id` is this vehicle's stable index in
/// `Platform::vehicles`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub pos: Pos,
    pub status: VehicleStatus,
    /// Partial progress on the link the vehicle currently sits on. A step
    /// with identical endpoints (or empty route) means no partial progress.
    pub step_to_pos: Step,
    pub capacity: usize,
    pub load: usize,
    pub schedule: Vec<Waypoint>,
    pub onboard_order_ids: Vec<OrderId>,
    pub stats: TravelStats,
    /// Reset to false at the start of every epoch; set by `commit`. Used by
    /// the OSP "orders-removed" pass to find vehicles nobody rewrote.
    pub schedule_has_been_updated_at_current_epoch: bool,
}

impl Vehicle {
    pub fn new(id: VehicleId, pos: Pos, capacity: usize) -> Self {
        Vehicle {
            id,
            pos,
            status: VehicleStatus::Idle,
            step_to_pos: Step::zero_at(pos),
            capacity,
            load: 0,
            schedule: Vec::new(),
            onboard_order_ids: Vec::new(),
            stats: TravelStats::default(),
            schedule_has_been_updated_at_current_epoch: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.status, VehicleStatus::Idle)
    }

    pub fn is_rebalancing(&self) -> bool {
        matches!(self.status, VehicleStatus::Rebalancing)
    }

    pub fn is_working(&self) -> bool {
        matches!(self.status, VehicleStatus::Working)
    }
}
