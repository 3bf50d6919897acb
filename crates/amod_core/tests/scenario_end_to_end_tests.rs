//! End-to-end scenarios run through `Platform::step`, exercising the full
//! epoch loop (advance -> ingest -> dispatch -> rebalance) rather than any
//! single component in isolation. Mirrors the literal scenarios of the
//! design (S1/S5/S6).

use amod_core::data::RequestSource;
use amod_core::dispatcher::Dispatcher;
use amod_core::order::OrderStatus;
use amod_core::platform::Platform;
use amod_core::rebalancer::Rebalancer;
use amod_core::request::Request;
use amod_core::router::Router;
use amod_core::test_helpers::line_router_tables;
use amod_core::types::VehicleId;
use amod_core::vehicle::{Vehicle, VehicleStatus};

fn req(origin: usize, destination: usize, request_time_ms: i64) -> Request {
    Request {
        origin_node_id: origin,
        destination_node_id: destination,
        request_time_ms,
        request_time_date: "t".to_string(),
    }
}

#[test]
fn single_idle_vehicle_single_request_is_picked_up_and_dropped_off() {
    let router = Router::new(line_router_tables(3, 100.0, 1000.0)).unwrap();
    let vehicles = vec![Vehicle::new(VehicleId(0), router.node_pos(1), 4)];
    let source = RequestSource::new(vec![req(1, 3, 0)], 0, 1.0);
    let mut platform = Platform::new(
        router,
        source,
        vehicles,
        Dispatcher::Sba,
        Rebalancer::None,
        30_000,
        0,
        3_600_000,
        3_600_000,
        300_000,
        1.3,
        false,
    );

    platform.step();
    assert_eq!(platform.orders.len(), 1);
    assert_eq!(platform.orders[0].status, OrderStatus::Picking);
    assert_eq!(platform.vehicles[0].status, VehicleStatus::Working);

    // Enough epochs for the vehicle to traverse both hops (100s each) and
    // complete the trip.
    for _ in 0..20 {
        platform.step();
    }

    assert_eq!(platform.orders[0].status, OrderStatus::Complete);
    assert!(platform.vehicles[0].is_idle());
    assert_eq!(platform.vehicles[0].load, 0);
}

#[test]
fn unpicked_order_walks_away_after_its_deadline() {
    let router = Router::new(line_router_tables(5, 1000.0, 10_000.0)).unwrap();
    // The only vehicle sits many hops away from the request's origin, and
    // the pickup window is too tight (1 ms) for it to ever reach it, so the
    // order is never assigned and must eventually walk away.
    let vehicles = vec![Vehicle::new(VehicleId(0), router.node_pos(5), 4)];

    let source = RequestSource::new(vec![req(2, 3, 0)], 0, 1.0);
    let mut platform = Platform::new(
        router,
        source,
        vehicles,
        Dispatcher::Sba,
        Rebalancer::None,
        60_000,
        0,
        3_600_000,
        3_600_000,
        1,
        1.0,
        false,
    );

    // max_wait is 1ms here so the walkaway clock (min(150s, max_pickup)) is
    // driven entirely by the pickup deadline; the busy vehicle can never
    // make it in time. The order is ingested on the first epoch (after that
    // epoch's walkaway sweep already ran), so a second epoch is needed for
    // its sweep to observe the now-expired deadline.
    platform.step();
    platform.step();
    let walked_away = platform.orders.iter().any(|o| o.status == OrderStatus::Walkaway);
    assert!(walked_away, "order should have walked away once its pickup deadline passed unserved");
}

#[test]
fn nearer_idle_vehicle_is_chosen_for_rebalancing_over_a_farther_one() {
    let router = Router::new(line_router_tables(5, 60.0, 600.0)).unwrap();
    let vehicles = vec![
        Vehicle::new(VehicleId(0), router.node_pos(1), 4),
        Vehicle::new(VehicleId(1), router.node_pos(5), 4),
    ];
    let source = RequestSource::new(vec![req(2, 4, 0)], 0, 1.0);
    let mut platform = Platform::new(
        router,
        source,
        vehicles,
        Dispatcher::Sba,
        Rebalancer::Npo,
        30_000,
        0,
        3_600_000,
        3_600_000,
        1,
        1.0,
        false,
    );

    // Deadlines are so tight (max_wait_ms = 1) that SBA can't pick the
    // order up this epoch; only the rebalance pass acts on it.
    platform.step();

    assert_eq!(platform.vehicles[0].status, VehicleStatus::Rebalancing);
    assert_eq!(platform.vehicles[0].schedule[0].pos.node_id, 2);
    assert!(platform.vehicles[1].is_idle());
}

#[test]
fn running_many_epochs_never_panics_and_preserves_order_count() {
    let router = Router::new(line_router_tables(6, 60.0, 600.0)).unwrap();
    let vehicles = vec![
        Vehicle::new(VehicleId(0), router.node_pos(1), 2),
        Vehicle::new(VehicleId(1), router.node_pos(6), 2),
    ];
    let requests: Vec<Request> = (0..8).map(|i| req(1 + (i % 5) as usize, 1 + ((i + 2) % 5) as usize, i * 30_000)).collect();
    let source = RequestSource::new(requests, 0, 1.0);
    let mut platform = Platform::new(
        router,
        source,
        vehicles,
        Dispatcher::Osp,
        Rebalancer::Npo,
        30_000,
        0,
        600_000,
        600_000,
        300_000,
        1.3,
        false,
    );

    platform.run(20);

    assert_eq!(platform.orders.len(), 8);
    for vehicle in &platform.vehicles {
        assert_eq!(vehicle.load, vehicle.onboard_order_ids.len());
    }
}
