//! Orders: a request that has entered the dispatch pipeline, plus its
//! deadlines and lifecycle status.

use crate::types::{OrderId, Pos, TimeMs};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order. Monotone except re-optimization, which may
/// transiently push a PICKING order back to PENDING before re-assigning it
/// within the same epoch (invariant 7 of the testable properties).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Picking,
    Onboard,
    Complete,
    Walkaway,
}

/// An order's deadline configuration, carried alongside `ScenarioParams` so
/// `Order::new` doesn't need five positional arguments.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineConfig {
    /// W: configured max wait, in ms.
    pub max_wait_ms: TimeMs,
    /// D: max onboard detour factor, 1 <= D < 2.
    pub max_detour: f64,
}

/// A request admitted into the dispatch pipeline. `id` is this order's index
/// in `Platform::orders` and never changes once assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub origin: Pos,
    pub destination: Pos,
    pub request_time_ms: TimeMs,
    pub shortest_travel_time_ms: TimeMs,
    pub max_pickup_time_ms: TimeMs,
    pub max_dropoff_time_ms: TimeMs,
    pub pickup_time_ms: Option<TimeMs>,
    pub dropoff_time_ms: Option<TimeMs>,
    pub status: OrderStatus,
}

impl Order {
    /// Builds a new PENDING order and computes its two deadlines per the
    /// data model:
    ///
    /// ```text
    /// max_pickup_time_ms  = request_time_ms + min(W, T*.(2-D))
    /// max_dropoff_time_ms = request_time_ms + T* + min(2W, (max_pickup_time_ms - request_time_ms) + T*.(D-1))
    /// ```
    pub fn new(
        id: OrderId,
        origin: Pos,
        destination: Pos,
        request_time_ms: TimeMs,
        shortest_travel_time_ms: TimeMs,
        deadlines: DeadlineConfig,
    ) -> Self {
        let w = deadlines.max_wait_ms;
        let t_star = shortest_travel_time_ms;
        let d = deadlines.max_detour;

        let detour_budget_ms = (t_star as f64 * (2.0 - d)).round() as TimeMs;
        let pickup_window_ms = w.min(detour_budget_ms);
        let max_pickup_time_ms = request_time_ms + pickup_window_ms;

        let detour_extra_ms = (pickup_window_ms as f64 + t_star as f64 * (d - 1.0)).round() as TimeMs;
        let dropoff_window_ms = (2 * w).min(detour_extra_ms);
        let max_dropoff_time_ms = request_time_ms + t_star + dropoff_window_ms;

        Order {
            id,
            origin,
            destination,
            request_time_ms,
            shortest_travel_time_ms,
            max_pickup_time_ms,
            max_dropoff_time_ms,
            pickup_time_ms: None,
            dropoff_time_ms: None,
            status: OrderStatus::Pending,
        }
    }

    /// Walkaway rule: a PENDING order becomes WALKAWAY at the first epoch
    /// with `system_time_ms >= min(request_time_ms + 150_000, max_pickup_time_ms)`.
    pub fn should_walk_away(&self, system_time_ms: TimeMs) -> bool {
        if self.status != OrderStatus::Pending {
            return false;
        }
        let deadline = (self.request_time_ms + 150_000).min(self.max_pickup_time_ms);
        system_time_ms >= deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(node_id: usize) -> Pos {
        Pos {
            node_id,
            lon: 0.0,
            lat: 0.0,
        }
    }

    #[test]
    fn deadlines_match_scenario_s1() {
        // S1: request_time 0, T*=300s, W=300s, D=1.3.
        let order = Order::new(
            OrderId(0),
            pos(1),
            pos(2),
            0,
            300_000,
            DeadlineConfig {
                max_wait_ms: 300_000,
                max_detour: 1.3,
            },
        );
        assert_eq!(order.max_pickup_time_ms, 210_000);
        assert_eq!(order.max_dropoff_time_ms, 600_000);
    }

    #[test]
    fn walkaway_s5() {
        let mut order = Order::new(
            OrderId(0),
            pos(1),
            pos(2),
            0,
            10_000,
            DeadlineConfig {
                max_wait_ms: 60_000,
                max_detour: 1.0,
            },
        );
        assert_eq!(order.max_pickup_time_ms, 60_000);
        assert!(!order.should_walk_away(59_999));
        assert!(order.should_walk_away(60_000));
        order.status = OrderStatus::Picking;
        assert!(!order.should_walk_away(60_000));
    }
}
