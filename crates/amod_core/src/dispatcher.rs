//! L7: dispatch orchestration. Two strategies share the same assigner and
//! commit step but differ in how widely they search: SBA inserts only new
//! orders into vehicles' current schedules; OSP re-enumerates every
//! PENDING/PICKING order against every vehicle's full trip space.

use std::collections::HashMap;

use crate::assigner::assign;
use crate::enumerator::{feasible_vehicle_trip_pairs, onboard_only_schedule};
use crate::order::{Order, OrderStatus};
use crate::router::Router;
use crate::schedule::{insert_order, quick_check, schedule_cost, score_vt_pairs, VtPair};
use crate::types::{OrderId, RoutingType, TimeMs, VehicleId, Waypoint, WaypointOp};
use crate::vehicle::{Vehicle, VehicleStatus};

/// Which orchestration a scenario is configured to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatcher {
    /// Single-request batch: only newly-received orders are considered.
    Sba,
    /// Optimal schedule pool: every PENDING/PICKING order is re-enumerated.
    Osp,
}

/// Runs the configured dispatcher for this epoch, then commits every
/// selected VT-pair's schedule into its vehicle and marks the covered
/// orders PICKING.
pub fn dispatch(
    dispatcher: Dispatcher,
    new_received_order_ids: &[OrderId],
    orders: &mut [Order],
    vehicles: &mut [Vehicle],
    system_time_ms: TimeMs,
    router: &Router,
) {
    match dispatcher {
        Dispatcher::Sba => dispatch_sba(new_received_order_ids, orders, vehicles, system_time_ms, router),
        Dispatcher::Osp => dispatch_osp(orders, vehicles, system_time_ms, router),
    }
}

/// Maps every currently-PICKING order to the vehicle holding its PICKUP
/// waypoint at the start of this epoch, before this dispatch commits
/// anything. The assigner's picking-order repair pass uses this as the one
/// safe vehicle to fall back to for each order.
fn picking_order_owners(orders: &[Order], vehicles: &[Vehicle]) -> HashMap<OrderId, VehicleId> {
    let mut owners = HashMap::new();
    for vehicle in vehicles {
        for wp in &vehicle.schedule {
            if wp.op == WaypointOp::Pickup && orders[wp.order_id.0].status == OrderStatus::Picking {
                owners.insert(wp.order_id, vehicle.id);
            }
        }
    }
    owners
}

fn commit_selection(vt_pairs: &[VtPair], selected: &[usize], orders: &mut [Order], vehicles: &mut [Vehicle], router: &Router) {
    for &idx in selected {
        let vt = &vt_pairs[idx];
        for &order_id in &vt.trip_ids {
            orders[order_id.0].status = OrderStatus::Picking;
        }
        commit(&mut vehicles[vt.vehicle_id.0], vt.best_schedule().to_vec(), router);
    }
}

fn dispatch_sba(
    new_received_order_ids: &[OrderId],
    orders: &mut [Order],
    vehicles: &mut [Vehicle],
    system_time_ms: TimeMs,
    router: &Router,
) {
    let mut vt_pairs = Vec::new();

    for &order_id in new_received_order_ids {
        let order = &orders[order_id.0];
        for vehicle in vehicles.iter() {
            if !quick_check(order, vehicle, system_time_ms, router) {
                continue;
            }
            if let Some(mut vt) = insert_order(order, orders, vehicle, std::slice::from_ref(&vehicle.schedule), system_time_ms, router) {
                vt.trip_ids = vec![order_id];
                vt_pairs.push(vt);
            }
        }
    }

    for vehicle in vehicles.iter() {
        let cost_ms = schedule_cost(&vehicle.schedule, orders, vehicle, system_time_ms);
        vt_pairs.push(VtPair {
            vehicle_id: vehicle.id,
            trip_ids: Vec::new(),
            feasible_schedules: vec![vehicle.schedule.clone()],
            best_schedule_idx: 0,
            best_schedule_cost_ms: cost_ms,
            score: 0.0,
        });
    }

    // SBA never rebases anywhere in the reference dispatcher, but
    // score_vt_pairs expects a marginal (post-rebase) cost; rebase here so
    // the one scoring formula works for both dispatchers (see schedule.rs).
    for vt in vt_pairs.iter_mut() {
        let vehicle = &vehicles[vt.vehicle_id.0];
        let vehicle_cost_ms = schedule_cost(&vehicle.schedule, orders, vehicle, system_time_ms);
        vt.rebase_cost(vehicle_cost_ms);
    }
    score_vt_pairs(&mut vt_pairs);

    let picking = picking_order_owners(orders, vehicles);
    let selected = assign(&vt_pairs, &picking);
    commit_selection(&vt_pairs, &selected, orders, vehicles, router);
}

fn dispatch_osp(orders: &mut [Order], vehicles: &mut [Vehicle], system_time_ms: TimeMs, router: &Router) {
    let enable_reoptimization = true;

    let considered_order_ids: Vec<OrderId> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Pending || o.status == OrderStatus::Picking)
        .map(|o| o.id)
        .collect();

    let mut vt_pairs = feasible_vehicle_trip_pairs(&considered_order_ids, orders, vehicles, system_time_ms, router, enable_reoptimization);
    score_vt_pairs(&mut vt_pairs);

    let picking = picking_order_owners(orders, vehicles);
    let selected = assign(&vt_pairs, &picking);
    commit_selection(&vt_pairs, &selected, orders, vehicles, router);

    if enable_reoptimization {
        update_vehicles_having_orders_removed(vehicles, router);
    }
}

/// After OSP's commit pass, any WORKING vehicle nobody rewrote this epoch
/// but whose schedule still carries waypoints beyond its onboard drop-offs
/// (i.e. a PICKING order that got reassigned elsewhere) must have its
/// schedule rebuilt to contain only what it's still actually carrying.
fn update_vehicles_having_orders_removed(vehicles: &mut [Vehicle], router: &Router) {
    for vehicle in vehicles.iter_mut() {
        if !vehicle.schedule_has_been_updated_at_current_epoch && vehicle.is_working() && vehicle.schedule.len() != vehicle.load {
            let basic_schedule = onboard_only_schedule(vehicle, router).expect("onboard-only schedule is always computable for a working vehicle");
            commit(vehicle, basic_schedule, router);
        }
    }
}

/// `commit`: rewrites `vehicle`'s schedule with `schedule`, expanding every
/// leg to FULL_ROUTE and updating status. See §4.7.
pub fn commit(vehicle: &mut Vehicle, mut schedule: Vec<Waypoint>, router: &Router) {
    if vehicle.is_rebalancing() && schedule.len() > 1 {
        debug_assert_eq!(vehicle.schedule.len(), 1);
        if let Some(pos) = schedule.iter().position(|wp| wp.op == WaypointOp::Reposition) {
            schedule.remove(pos);
        }
        debug_assert_eq!(schedule.len() % 2, 0);
    }

    let mut pre_pos = vehicle.pos;
    for wp in schedule.iter_mut() {
        wp.route = router.route(pre_pos, wp.pos, RoutingType::FullRoute);
        pre_pos = wp.pos;
    }

    vehicle.schedule = schedule;
    vehicle.schedule_has_been_updated_at_current_epoch = true;

    if vehicle.schedule.is_empty() {
        vehicle.status = VehicleStatus::Idle;
        return;
    }

    match vehicle.schedule[0].op {
        WaypointOp::Pickup | WaypointOp::Dropoff => vehicle.status = VehicleStatus::Working,
        WaypointOp::Reposition => {
            debug_assert_eq!(vehicle.schedule.len(), 1);
            vehicle.status = VehicleStatus::Rebalancing;
        }
    }

    if vehicle.step_to_pos.duration_ms > 0 {
        let first_route = &mut vehicle.schedule[0].route;
        first_route.duration_ms += vehicle.step_to_pos.duration_ms;
        first_route.distance_mm += vehicle.step_to_pos.distance_mm;
        first_route.steps.insert(0, vehicle.step_to_pos.clone());
        debug_assert_eq!(first_route.steps[0].poses[0].node_id, first_route.steps[0].poses[1].node_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::DeadlineConfig;
    use crate::test_helpers::two_node_router_tables;
    use crate::types::{OrderId, VehicleId};

    #[test]
    fn s1_sba_assigns_the_only_feasible_pair() {
        let router = Router::new(two_node_router_tables(300.0, 3000.0)).unwrap();
        let mut vehicles = vec![Vehicle::new(VehicleId(0), router.node_pos(1), 4)];
        let t_star = router.route(router.node_pos(1), router.node_pos(2), RoutingType::TimeOnly).duration_ms;
        let mut orders = vec![Order::new(
            OrderId(0),
            router.node_pos(1),
            router.node_pos(2),
            0,
            t_star,
            DeadlineConfig {
                max_wait_ms: 300_000,
                max_detour: 1.3,
            },
        )];

        dispatch(Dispatcher::Sba, &[OrderId(0)], &mut orders, &mut vehicles, 0, &router);

        assert_eq!(orders[0].status, OrderStatus::Picking);
        assert_eq!(vehicles[0].status, VehicleStatus::Working);
        assert_eq!(vehicles[0].schedule.len(), 2);
        assert_eq!(vehicles[0].schedule[0].op, WaypointOp::Pickup);
        assert_eq!(vehicles[0].schedule[1].op, WaypointOp::Dropoff);
    }

    #[test]
    fn commit_on_rebalancing_vehicle_drops_its_reposition_waypoint() {
        let router = Router::new(two_node_router_tables(300.0, 3000.0)).unwrap();
        let mut vehicle = Vehicle::new(VehicleId(0), router.node_pos(1), 4);
        vehicle.status = VehicleStatus::Rebalancing;
        vehicle.schedule = vec![Waypoint {
            pos: router.node_pos(2),
            op: WaypointOp::Reposition,
            order_id: OrderId(0),
            route: router.route(router.node_pos(1), router.node_pos(2), RoutingType::TimeOnly),
        }];

        let new_schedule = vec![
            Waypoint {
                pos: router.node_pos(2),
                op: WaypointOp::Reposition,
                order_id: OrderId(0),
                route: router.route(router.node_pos(1), router.node_pos(2), RoutingType::TimeOnly),
            },
            Waypoint {
                pos: router.node_pos(2),
                op: WaypointOp::Pickup,
                order_id: OrderId(1),
                route: router.route(router.node_pos(1), router.node_pos(2), RoutingType::TimeOnly),
            },
            Waypoint {
                pos: router.node_pos(1),
                op: WaypointOp::Dropoff,
                order_id: OrderId(1),
                route: router.route(router.node_pos(2), router.node_pos(1), RoutingType::TimeOnly),
            },
        ];
        commit(&mut vehicle, new_schedule, &router);

        assert_eq!(vehicle.schedule.len(), 2);
        assert!(vehicle.schedule.iter().all(|wp| wp.op != WaypointOp::Reposition));
        assert_eq!(vehicle.status, VehicleStatus::Working);
    }
}
