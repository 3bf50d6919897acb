//! Checks the testable invariants of the design hold after every epoch of a
//! multi-vehicle, multi-order run: load/onboard-list consistency, waypoint
//! bookkeeping, and the order-status partition.

use std::collections::HashSet;

use amod_core::data::RequestSource;
use amod_core::dispatcher::Dispatcher;
use amod_core::order::{Order, OrderStatus};
use amod_core::platform::Platform;
use amod_core::rebalancer::Rebalancer;
use amod_core::request::Request;
use amod_core::router::Router;
use amod_core::test_helpers::grid_router_tables;
use amod_core::types::{VehicleId, WaypointOp};
use amod_core::vehicle::Vehicle;

fn assert_vehicle_invariants(vehicles: &[Vehicle]) {
    for vehicle in vehicles {
        // Invariant 1: load matches the onboard multiset's size.
        assert_eq!(vehicle.load, vehicle.onboard_order_ids.len(), "vehicle {:?} load/onboard mismatch", vehicle.id);

        // Invariant 4: #PICKUP waypoints + #onboard orders == #DROPOFF waypoints.
        let num_pickup = vehicle.schedule.iter().filter(|wp| wp.op == WaypointOp::Pickup).count();
        let num_dropoff = vehicle.schedule.iter().filter(|wp| wp.op == WaypointOp::Dropoff).count();
        assert_eq!(num_pickup + vehicle.onboard_order_ids.len(), num_dropoff, "vehicle {:?}: pickups + onboard must equal dropoffs", vehicle.id);

        // Every onboard order has exactly one dropoff waypoint in this vehicle's schedule.
        for &order_id in &vehicle.onboard_order_ids {
            let count = vehicle.schedule.iter().filter(|wp| wp.op == WaypointOp::Dropoff && wp.order_id == order_id).count();
            assert_eq!(count, 1, "onboard order {:?} needs exactly one dropoff waypoint", order_id);
        }
    }
}

fn assert_order_partition(orders: &[Order]) {
    // Invariant 5: statuses partition the order set exactly once each.
    let mut seen: HashSet<usize> = HashSet::new();
    for order in orders {
        assert!(seen.insert(order.id.0), "duplicate order id {:?}", order.id);
    }
    let total = orders.len();
    let pending = orders.iter().filter(|o| o.status == OrderStatus::Pending).count();
    let picking = orders.iter().filter(|o| o.status == OrderStatus::Picking).count();
    let onboard = orders.iter().filter(|o| o.status == OrderStatus::Onboard).count();
    let complete = orders.iter().filter(|o| o.status == OrderStatus::Complete).count();
    let walkaway = orders.iter().filter(|o| o.status == OrderStatus::Walkaway).count();
    assert_eq!(total, pending + picking + onboard + complete + walkaway);
}

fn assert_picking_orders_appear_exactly_once(orders: &[Order], vehicles: &[Vehicle]) {
    // Invariant 2: every PICKING order appears as exactly one PICKUP
    // waypoint in exactly one vehicle's schedule.
    for order in orders.iter().filter(|o| o.status == OrderStatus::Picking) {
        let count: usize = vehicles
            .iter()
            .map(|v| v.schedule.iter().filter(|wp| wp.op == WaypointOp::Pickup && wp.order_id == order.id).count())
            .sum();
        assert_eq!(count, 1, "PICKING order {:?} must have exactly one PICKUP waypoint across the fleet", order.id);
    }
}

fn assert_onboard_orders_appear_exactly_once(orders: &[Order], vehicles: &[Vehicle]) {
    // Invariant 3: every ONBOARD order appears in exactly one vehicle's
    // onboard list and exactly one DROPOFF waypoint.
    for order in orders.iter().filter(|o| o.status == OrderStatus::Onboard) {
        let onboard_count = vehicles.iter().filter(|v| v.onboard_order_ids.contains(&order.id)).count();
        assert_eq!(onboard_count, 1, "ONBOARD order {:?} must be onboard exactly one vehicle", order.id);
        let dropoff_count: usize = vehicles
            .iter()
            .map(|v| v.schedule.iter().filter(|wp| wp.op == WaypointOp::Dropoff && wp.order_id == order.id).count())
            .sum();
        assert_eq!(dropoff_count, 1, "ONBOARD order {:?} must have exactly one DROPOFF waypoint", order.id);
    }
}

fn req(origin: usize, destination: usize, request_time_ms: i64) -> Request {
    Request {
        origin_node_id: origin,
        destination_node_id: destination,
        request_time_ms,
        request_time_date: "t".to_string(),
    }
}

#[test]
fn invariants_hold_after_every_epoch_of_a_busy_multi_vehicle_run() {
    let router = Router::new(grid_router_tables(4)).unwrap();
    let vehicles: Vec<Vehicle> = (0..4).map(|i| Vehicle::new(VehicleId(i), router.node_pos(1 + i), 3)).collect();

    let requests: Vec<Request> = (0..24).map(|i| req(1 + (i % 15) as usize, 1 + ((i * 3 + 2) % 15) as usize, i * 20_000)).collect();
    let source = RequestSource::new(requests, 0, 1.0);

    let mut platform = Platform::new(
        router,
        source,
        vehicles,
        Dispatcher::Osp,
        Rebalancer::Npo,
        30_000,
        0,
        900_000,
        900_000,
        300_000,
        1.3,
        false,
    );

    for _ in 0..30 {
        platform.step();
        assert_vehicle_invariants(&platform.vehicles);
        assert_order_partition(&platform.orders);
        assert_picking_orders_appear_exactly_once(&platform.orders, &platform.vehicles);
        assert_onboard_orders_appear_exactly_once(&platform.orders, &platform.vehicles);
    }
}
