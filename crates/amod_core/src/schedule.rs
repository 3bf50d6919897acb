//! L4: insertion-based schedule construction, validation, cost and score.
//!
//! A VT-pair (vehicle, trip, best feasible schedule, score) is the unit of
//! currency the assigner optimizes over; everything in this module exists to
//! produce and rank them.

use crate::order::Order;
use crate::router::Router;
use crate::types::{OrderId, RoutingType, TimeMs, VehicleId, Waypoint, WaypointOp};
use crate::vehicle::Vehicle;

/// A (vehicle, trip, best feasible schedule) candidate for the assigner.
/// `trip_ids` is kept sorted so union and "already seen" tests during
/// enumeration are canonical.
#[derive(Debug, Clone)]
pub struct VtPair {
    pub vehicle_id: VehicleId,
    pub trip_ids: Vec<OrderId>,
    pub feasible_schedules: Vec<Vec<Waypoint>>,
    pub best_schedule_idx: usize,
    /// Marginal delay relative to the vehicle's current schedule at the time
    /// this pair was built (i.e. already rebased, see `rebase_cost`).
    pub best_schedule_cost_ms: TimeMs,
    pub score: f64,
}

impl VtPair {
    pub fn best_schedule(&self) -> &[Waypoint] {
        &self.feasible_schedules[self.best_schedule_idx]
    }

    /// A VT-pair with no trip: "leave this vehicle's schedule unchanged".
    pub fn null_option(vehicle_id: VehicleId, schedule: Vec<Waypoint>) -> Self {
        VtPair {
            vehicle_id,
            trip_ids: Vec::new(),
            feasible_schedules: vec![schedule],
            best_schedule_idx: 0,
            best_schedule_cost_ms: 0,
            score: 0.0,
        }
    }

    pub fn rebase_cost(&mut self, vehicle_current_schedule_cost_ms: TimeMs) {
        self.best_schedule_cost_ms -= vehicle_current_schedule_cost_ms;
    }
}

/// Why an (pickup_idx, dropoff_idx) insertion attempt was rejected; these
/// drive the pruning of the caller's (i, j) search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infeasibility {
    /// Code 0: this particular insertion fails; keep trying other (i, j).
    RetryInsertion,
    /// Code 1: no later dropoff position at this pickup index can work either.
    RetryDropoff,
    /// Code 2: abandon this pickup index and every later one.
    AbandonPickup,
}

/// Builds the candidate schedule for inserting `order`'s PICKUP at
/// `pickup_idx` and DROPOFF at `dropoff_idx` into `sub_schedule`, re-routing
/// every leg TIME_ONLY from the vehicle's current position.
fn schedule_with_insertion(
    order: &Order,
    vehicle: &Vehicle,
    sub_schedule: &[Waypoint],
    pickup_idx: usize,
    dropoff_idx: usize,
    router: &Router,
) -> Vec<Waypoint> {
    let mut schedule = Vec::with_capacity(sub_schedule.len() + 2);
    let mut pre_pos = vehicle.pos;
    let mut idx = 0;
    loop {
        if idx == pickup_idx {
            let route = router.route(pre_pos, order.origin, RoutingType::TimeOnly);
            schedule.push(Waypoint {
                pos: order.origin,
                op: WaypointOp::Pickup,
                order_id: order.id,
                route,
            });
            pre_pos = order.origin;
        }
        if idx == dropoff_idx {
            let route = router.route(pre_pos, order.destination, RoutingType::TimeOnly);
            schedule.push(Waypoint {
                pos: order.destination,
                op: WaypointOp::Dropoff,
                order_id: order.id,
                route,
            });
            pre_pos = order.destination;
        }
        if idx >= sub_schedule.len() {
            debug_assert!(!schedule.is_empty());
            return schedule;
        }
        let wp = &sub_schedule[idx];
        let route = router.route(pre_pos, wp.pos, RoutingType::TimeOnly);
        schedule.push(Waypoint {
            pos: wp.pos,
            op: wp.op,
            order_id: wp.order_id,
            route,
        });
        pre_pos = wp.pos;
        idx += 1;
    }
}

/// Walks `schedule` accumulating time from `system_time_ms +
/// vehicle.step_to_pos.duration_ms`, checking pickup/dropoff deadlines from
/// `pickup_idx` onward and capacity throughout.
pub fn validate_schedule(
    schedule: &[Waypoint],
    pickup_idx: usize,
    dropoff_idx: usize,
    order: &Order,
    orders: &[Order],
    vehicle: &Vehicle,
    system_time_ms: TimeMs,
    router: &Router,
) -> Result<(), Infeasibility> {
    let mut load = vehicle.load;
    let mut accumulated_time_ms = system_time_ms + vehicle.step_to_pos.duration_ms;

    for (idx, wp) in schedule.iter().enumerate() {
        accumulated_time_ms += wp.route.duration_ms;

        if idx >= pickup_idx {
            match wp.op {
                WaypointOp::Pickup => {
                    if accumulated_time_ms > orders[wp.order_id.0].max_pickup_time_ms {
                        if wp.order_id == order.id {
                            return Err(Infeasibility::AbandonPickup);
                        }
                        if idx <= dropoff_idx {
                            return Err(Infeasibility::RetryDropoff);
                        }
                        return Err(Infeasibility::RetryInsertion);
                    }
                }
                WaypointOp::Dropoff => {
                    if accumulated_time_ms > orders[wp.order_id.0].max_dropoff_time_ms {
                        if idx <= dropoff_idx || wp.order_id == order.id {
                            return Err(Infeasibility::RetryDropoff);
                        }
                        return Err(Infeasibility::RetryInsertion);
                    }
                }
                WaypointOp::Reposition => {
                    let direct_time_ms = router.route(vehicle.pos, wp.pos, RoutingType::TimeOnly).duration_ms
                        + vehicle.step_to_pos.duration_ms;
                    if accumulated_time_ms > direct_time_ms * 2 {
                        return Err(Infeasibility::RetryInsertion);
                    }
                }
            }
        }

        match wp.op {
            WaypointOp::Pickup => {
                load += 1;
                if load > vehicle.capacity {
                    return Err(Infeasibility::RetryInsertion);
                }
            }
            WaypointOp::Dropoff => load -= 1,
            WaypointOp::Reposition => {}
        }
    }

    Ok(())
}

/// Total end-to-end delay: the sum over DROPOFF waypoints of `system_time +
/// accumulated_time - (request_time + shortest_travel_time)`. Pickup delay
/// is not folded in here; nothing downstream needs it.
pub fn schedule_cost(schedule: &[Waypoint], orders: &[Order], vehicle: &Vehicle, system_time_ms: TimeMs) -> TimeMs {
    if schedule.is_empty() {
        return 0;
    }

    let mut accumulated_time_ms = vehicle.step_to_pos.duration_ms;
    let first_route = &schedule[0].route;
    if !first_route.steps.is_empty() && accumulated_time_ms != 0 {
        // The first leg is a FULL_ROUTE that already folds in step_to_pos as
        // its own leading step (post-commit schedules); don't double count.
        accumulated_time_ms = 0;
    }

    let mut total_delay_ms = 0;
    for wp in schedule {
        accumulated_time_ms += wp.route.duration_ms;
        if wp.op == WaypointOp::Dropoff {
            let order = &orders[wp.order_id.0];
            total_delay_ms += system_time_ms + accumulated_time_ms - (order.request_time_ms + order.shortest_travel_time_ms);
        }
    }
    total_delay_ms
}

/// Tries every (pickup_idx, dropoff_idx) insertion of `order` into each of
/// `sub_schedules`, returning the VT-pair with the least-cost feasible
/// schedule (and every feasible schedule found), or `None` if `order` cannot
/// be inserted into any of them.
pub fn insert_order(
    order: &Order,
    orders: &[Order],
    vehicle: &Vehicle,
    sub_schedules: &[Vec<Waypoint>],
    system_time_ms: TimeMs,
    router: &Router,
) -> Option<VtPair> {
    let mut feasible_schedules = Vec::new();
    let mut best_schedule_idx = 0;
    let mut best_cost_ms = TimeMs::MAX;

    for sub_schedule in sub_schedules {
        let num_wps = sub_schedule.len();
        let mut abandon_pickup = false;

        for pickup_idx in 0..=num_wps {
            let mut last_violation: Option<Infeasibility> = None;

            for dropoff_idx in pickup_idx..=num_wps {
                let candidate = schedule_with_insertion(order, vehicle, sub_schedule, pickup_idx, dropoff_idx, router);
                match validate_schedule(&candidate, pickup_idx, dropoff_idx, order, orders, vehicle, system_time_ms, router) {
                    Ok(()) => {
                        last_violation = None;
                        let cost_ms = schedule_cost(&candidate, orders, vehicle, system_time_ms);
                        if cost_ms < best_cost_ms {
                            best_cost_ms = cost_ms;
                            best_schedule_idx = feasible_schedules.len();
                        }
                        feasible_schedules.push(candidate);
                    }
                    Err(code) => last_violation = Some(code),
                }

                if matches!(
                    last_violation,
                    Some(Infeasibility::RetryDropoff) | Some(Infeasibility::AbandonPickup)
                ) {
                    break;
                }
            }

            if last_violation == Some(Infeasibility::AbandonPickup) {
                abandon_pickup = true;
            }
            if abandon_pickup {
                break;
            }
        }
    }

    if feasible_schedules.is_empty() {
        return None;
    }
    Some(VtPair {
        vehicle_id: vehicle.id,
        trip_ids: Vec::new(),
        feasible_schedules,
        best_schedule_idx,
        best_schedule_cost_ms: best_cost_ms,
        score: 0.0,
    })
}

/// `quick_check`: a cheap O(1) prune before the insertion search — can the
/// vehicle even reach `order`'s origin before its pickup deadline, ignoring
/// every other waypoint?
pub fn quick_check(order: &Order, vehicle: &Vehicle, system_time_ms: TimeMs, router: &Router) -> bool {
    let direct_time_ms = router.route(vehicle.pos, order.origin, RoutingType::TimeOnly).duration_ms;
    direct_time_ms + vehicle.step_to_pos.duration_ms + system_time_ms <= order.max_pickup_time_ms
}

/// Scores every VT-pair in place: `reward * |trip| - rebased_cost / 1000`,
/// where `reward = 10^ceil(log10(max |rebased_cost|))` makes trip size
/// strictly dominate delay (§4.2). Every `best_schedule_cost_ms` here is
/// assumed already rebased (marginal delay relative to the vehicle's
/// current schedule), so this one formula serves both dispatchers.
pub fn score_vt_pairs(vt_pairs: &mut [VtPair]) {
    let max_abs_cost = vt_pairs
        .iter()
        .map(|vt| vt.best_schedule_cost_ms.unsigned_abs())
        .max()
        .unwrap_or(0)
        .max(1);

    let mut remaining = max_abs_cost;
    let mut num_digits = 0u32;
    while remaining > 0 {
        remaining /= 10;
        num_digits += 1;
    }
    let reward = 10f64.powi(num_digits as i32);

    for vt in vt_pairs.iter_mut() {
        vt.score = reward * vt.trip_ids.len() as f64 - vt.best_schedule_cost_ms as f64 / 1000.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::DeadlineConfig;
    use crate::test_helpers::line_router_tables;
    use crate::types::{OrderId, Pos, VehicleId};

    fn pos(node_id: usize) -> Pos {
        Pos {
            node_id,
            lon: 0.0,
            lat: 0.0,
        }
    }

    fn make_order(router: &Router, id: usize, origin: usize, destination: usize, request_time_ms: TimeMs) -> Order {
        let t_star = router.route(pos(origin), pos(destination), RoutingType::TimeOnly).duration_ms;
        Order::new(
            OrderId(id),
            pos(origin),
            pos(destination),
            request_time_ms,
            t_star,
            DeadlineConfig {
                max_wait_ms: 300_000,
                max_detour: 1.3,
            },
        )
    }

    #[test]
    fn s1_single_idle_vehicle_single_request_feasible() {
        let router = Router::new(crate::test_helpers::two_node_router_tables(300.0, 3000.0)).unwrap();
        let vehicle = Vehicle::new(VehicleId(0), pos(1), 4);
        let orders = vec![make_order(&router, 0, 1, 2, 0)];
        assert_eq!(orders[0].max_pickup_time_ms, 210_000);
        assert_eq!(orders[0].max_dropoff_time_ms, 600_000);

        let vt = insert_order(&orders[0], &orders, &vehicle, &[vec![]], 0, &router).unwrap();
        let best = vt.best_schedule();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].op, WaypointOp::Pickup);
        assert_eq!(best[1].op, WaypointOp::Dropoff);
    }

    #[test]
    fn s2_capacity_enforcement_rejects_third_order() {
        let router = Router::new(line_router_tables(4, 60.0, 600.0)).unwrap();
        let mut vehicle = Vehicle::new(VehicleId(0), pos(1), 2);
        vehicle.load = 2;

        let mut orders = vec![
            make_order(&router, 0, 2, 3, 0),
            make_order(&router, 1, 3, 4, 0),
            make_order(&router, 2, 1, 4, 0),
        ];
        orders[0].status = crate::order::OrderStatus::Onboard;
        orders[1].status = crate::order::OrderStatus::Onboard;
        vehicle.onboard_order_ids = vec![OrderId(0), OrderId(1)];

        let basic_schedule = vec![
            Waypoint {
                pos: pos(3),
                op: WaypointOp::Dropoff,
                order_id: OrderId(0),
                route: router.route(pos(1), pos(3), RoutingType::TimeOnly),
            },
            Waypoint {
                pos: pos(4),
                op: WaypointOp::Dropoff,
                order_id: OrderId(1),
                route: router.route(pos(3), pos(4), RoutingType::TimeOnly),
            },
        ];

        let result = insert_order(&orders[2], &orders, &vehicle, &[basic_schedule], 0, &router);
        assert!(result.is_none(), "a third order must never fit a capacity-2 vehicle already at load 2");
    }

    #[test]
    fn s3_deadline_prune_returns_abandon_pickup_code() {
        let router = Router::new(line_router_tables(3, 1000.0, 10_000.0)).unwrap();
        let vehicle = Vehicle::new(VehicleId(0), pos(1), 4);
        // Pickup deadline of 1s can never be met: the direct trip alone takes 1000s.
        let mut order = make_order(&router, 0, 2, 3, 0);
        order.max_pickup_time_ms = 1_000;

        let orders = vec![order];
        let result = insert_order(&orders[0], &orders, &vehicle, &[vec![]], 0, &router);
        assert!(result.is_none());
    }

    #[test]
    fn score_reward_dominates_delay() {
        let mut pairs = vec![
            VtPair {
                vehicle_id: VehicleId(0),
                trip_ids: vec![OrderId(0)],
                feasible_schedules: vec![vec![]],
                best_schedule_idx: 0,
                best_schedule_cost_ms: 500,
                score: 0.0,
            },
            VtPair {
                vehicle_id: VehicleId(1),
                trip_ids: vec![],
                feasible_schedules: vec![vec![]],
                best_schedule_idx: 0,
                best_schedule_cost_ms: 0,
                score: 0.0,
            },
        ];
        score_vt_pairs(&mut pairs);
        assert!(pairs[0].score > pairs[1].score);
    }
}
