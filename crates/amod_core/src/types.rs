//! Core value types shared across the dispatch engine: positions, road
//! segments, routes and waypoints.

use serde::{Deserialize, Serialize};

/// Milliseconds, kept as an integer to avoid float drift across long runs.
pub type TimeMs = i64;

/// Millimeters.
pub type DistMm = i64;

/// Stable index of an order in `Platform::orders`. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub usize);

impl From<usize> for OrderId {
    fn from(v: usize) -> Self {
        OrderId(v)
    }
}

impl From<OrderId> for usize {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Stable index of a vehicle in `Platform::vehicles`. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub usize);

impl From<usize> for VehicleId {
    fn from(v: usize) -> Self {
        VehicleId(v)
    }
}

impl From<VehicleId> for usize {
    fn from(id: VehicleId) -> Self {
        id.0
    }
}

/// A point on the road network. `node_id == 0` is never valid: ids are
/// 1-based into the Router's node table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pos {
    pub node_id: usize,
    pub lon: f64,
    pub lat: f64,
}

impl Pos {
    pub fn is_valid(&self) -> bool {
        self.node_id != 0
    }
}

/// A single road segment traversed as part of a `Route`.
///
/// `poses[0].node_id == poses[1].node_id` marks a step that represents
/// partial progress on an outgoing link from that node (used for
/// `Vehicle::step_to_pos` and as the FULL_ROUTE terminal sentinel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub distance_mm: DistMm,
    pub duration_ms: TimeMs,
    pub poses: [Pos; 2],
}

impl Step {
    /// A step with both endpoints equal and zero length: used as the
    /// sentinel terminal step of a FULL_ROUTE and as the "no partial
    /// progress" value of `step_to_pos`.
    pub fn zero_at(pos: Pos) -> Self {
        Step {
            distance_mm: 0,
            duration_ms: 0,
            poses: [pos, pos],
        }
    }
}

/// An aggregate route between two positions, either a coarse TIME_ONLY
/// estimate (`steps` empty) or an expanded FULL_ROUTE (`steps` populated
/// with a terminal zero-length sentinel).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub distance_mm: DistMm,
    pub duration_ms: TimeMs,
    pub steps: Vec<Step>,
}

/// Which kind of query the Router should answer: an aggregate-only estimate,
/// or a fully expanded step-by-step path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingType {
    TimeOnly,
    FullRoute,
}

/// What a waypoint does when the vehicle reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaypointOp {
    Pickup,
    Dropoff,
    /// No passenger semantics; `order_id` references the pending order
    /// whose origin seeded this reposition target.
    Reposition,
}

/// One stop on a vehicle's schedule: where to go, what to do there, which
/// order it concerns, and the route from the previous waypoint (or from
/// the vehicle's current position, for the first waypoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub pos: Pos,
    pub op: WaypointOp,
    pub order_id: OrderId,
    pub route: Route,
}
