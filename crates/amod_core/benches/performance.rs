//! Performance benchmarks for amod_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use amod_core::enumerator::feasible_vehicle_trip_pairs;
use amod_core::order::{DeadlineConfig, Order};
use amod_core::router::Router;
use amod_core::scenario::{build_scenario, ScenarioParams};
use amod_core::test_helpers::grid_router_tables;
use amod_core::types::{OrderId, RoutingType};
use amod_core::vehicle::Vehicle;

fn bench_epoch_loop(c: &mut Criterion) {
    let scenarios = vec![("small", 20, 60), ("medium", 80, 300), ("large", 200, 1000)];

    let mut group = c.benchmark_group("epoch_loop");
    for (name, fleet_size, request_count) in scenarios {
        group.bench_with_input(BenchmarkId::from_parameter(name), &(fleet_size, request_count), |b, &(fleet_size, request_count)| {
            b.iter(|| {
                let router_tables = grid_router_tables(20);
                let num_nodes = 400;
                let requests: Vec<amod_core::request::Request> = (0..request_count)
                    .map(|i| amod_core::request::Request {
                        origin_node_id: 1 + (i * 7) % num_nodes,
                        destination_node_id: 1 + (i * 13 + 3) % num_nodes,
                        request_time_ms: (i as i64) * 10_000,
                        request_time_date: "bench".to_string(),
                    })
                    .collect();

                let params = ScenarioParams::default()
                    .with_router_tables(router_tables)
                    .with_requests(requests)
                    .with_fleet_size(fleet_size)
                    .with_veh_capacity(4)
                    .with_warmup_duration_min(0.0)
                    .with_simulation_duration_min(10.0)
                    .with_winddown_duration_min(0.0);

                let mut scenario = build_scenario(params).unwrap();
                let epochs = scenario.total_epochs();
                black_box(scenario.platform.run(epochs));
            });
        });
    }
    group.finish();
}

fn bench_trip_enumeration(c: &mut Criterion) {
    let router = Router::new(grid_router_tables(10)).unwrap();

    let mut group = c.benchmark_group("trip_enumeration");
    for &pool_size in &[10usize, 30, 60] {
        group.bench_with_input(BenchmarkId::from_parameter(pool_size), &pool_size, |b, &pool_size| {
            let vehicles: Vec<Vehicle> = (0..10).map(|i| Vehicle::new(amod_core::types::VehicleId(i), router.node_pos(1 + i), 4)).collect();
            let orders: Vec<Order> = (0..pool_size)
                .map(|i| {
                    let origin = router.node_pos(1 + (i * 7) % 100);
                    let destination = router.node_pos(1 + (i * 13 + 3) % 100);
                    let t_star = router.route(origin, destination, RoutingType::TimeOnly).duration_ms;
                    Order::new(
                        OrderId(i),
                        origin,
                        destination,
                        0,
                        t_star,
                        DeadlineConfig {
                            max_wait_ms: 600_000,
                            max_detour: 1.5,
                        },
                    )
                })
                .collect();
            let considered: Vec<OrderId> = orders.iter().map(|o| o.id).collect();

            b.iter(|| {
                black_box(feasible_vehicle_trip_pairs(&considered, &orders, &vehicles, 0, &router, true));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_epoch_loop, bench_trip_enumeration);
criterion_main!(benches);
