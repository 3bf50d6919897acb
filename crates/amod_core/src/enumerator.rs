//! L5: per-vehicle feasible trip search.
//!
//! For every vehicle, grows trips from size 1 up by extending size-(k-1)
//! trips with one more order, pruning any candidate with an infeasible
//! sub-trip (the downward-closure property: a trip can only be feasible if
//! every (k-1)-subset of it is too).

use std::collections::HashSet;
use std::time::Instant;

use rayon::prelude::*;

use crate::error::Result;
use crate::order::Order;
use crate::router::Router;
use crate::schedule::{insert_order, quick_check, schedule_cost, validate_schedule, VtPair};
use crate::types::{OrderId, RoutingType, TimeMs, Waypoint, WaypointOp};
use crate::vehicle::{Vehicle, VehicleStatus};

/// Per-vehicle budget for size-k trip growth; a defense against pathological
/// instances where the search would otherwise run away.
const SIZE_K_SEARCH_CUTOFF_MS: u64 = 10_000;

/// The "do nothing new" option(s) for a vehicle: REBALANCING and IDLE
/// vehicles just keep their current schedule; a WORKING vehicle's basic
/// schedule drops every not-yet-picked-up waypoint and tries every
/// permutation of the remaining onboard drop-offs, so later insertion search
/// isn't locked into one arbitrary drop-off order.
pub fn basic_schedules_of_vehicle(
    orders: &[Order],
    vehicle: &Vehicle,
    system_time_ms: TimeMs,
    router: &Router,
    enable_reoptimization: bool,
) -> Vec<Vec<Waypoint>> {
    if !enable_reoptimization || vehicle.is_rebalancing() || vehicle.is_idle() {
        return vec![vehicle.schedule.clone()];
    }
    debug_assert!(vehicle.is_working());

    let mut basic_schedule = Vec::with_capacity(vehicle.load);
    let mut pre_pos = vehicle.pos;
    for wp in &vehicle.schedule {
        if vehicle.onboard_order_ids.contains(&wp.order_id) {
            debug_assert_eq!(wp.op, WaypointOp::Dropoff);
            let route = router.route(pre_pos, wp.pos, RoutingType::TimeOnly);
            basic_schedule.push(Waypoint {
                pos: wp.pos,
                op: wp.op,
                order_id: wp.order_id,
                route,
            });
            pre_pos = wp.pos;
        }
    }
    debug_assert_eq!(basic_schedule.len(), vehicle.load);

    let mut schedules = vec![basic_schedule.clone()];
    for perm in permutations_except_identity(basic_schedule.len()) {
        let mut candidate = Vec::with_capacity(perm.len());
        let mut pre_pos = vehicle.pos;
        for &idx in &perm {
            let wp = &basic_schedule[idx];
            let route = router.route(pre_pos, wp.pos, RoutingType::TimeOnly);
            candidate.push(Waypoint {
                pos: wp.pos,
                op: wp.op,
                order_id: wp.order_id,
                route,
            });
            pre_pos = wp.pos;
        }
        // pickup_idx/dropoff_idx (0, 0) and the order are meaningless here:
        // every waypoint is a drop-off already committed to, so the deadline
        // checks below (which run for idx >= pickup_idx, i.e. all of them)
        // are exactly what we want regardless of which order is passed.
        if validate_schedule(&candidate, 0, 0, &orders[0], orders, vehicle, system_time_ms, router).is_ok() {
            schedules.push(candidate);
        }
    }
    schedules
}

/// Every non-identity permutation of `0..n`, via Heap's algorithm.
fn permutations_except_identity(n: usize) -> Vec<Vec<usize>> {
    let identity: Vec<usize> = (0..n).collect();
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut items = identity.clone();
    fn heap(k: usize, items: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if k == 1 {
            out.push(items.clone());
            return;
        }
        for i in 0..k {
            heap(k - 1, items, out);
            if k % 2 == 0 {
                items.swap(i, k - 1);
            } else {
                items.swap(0, k - 1);
            }
        }
    }
    heap(n, &mut items, &mut out);
    out.retain(|p| p != &identity);
    out
}

fn size_1_trips(
    considered_order_ids: &[OrderId],
    orders: &[Order],
    vehicle: &Vehicle,
    basic_schedules: &[Vec<Waypoint>],
    system_time_ms: TimeMs,
    router: &Router,
) -> Vec<VtPair> {
    let mut trips = Vec::new();
    for &order_id in considered_order_ids {
        let order = &orders[order_id.0];
        if !quick_check(order, vehicle, system_time_ms, router) {
            continue;
        }
        if let Some(mut vt) = insert_order(order, orders, vehicle, basic_schedules, system_time_ms, router) {
            vt.trip_ids = vec![order_id];
            trips.push(vt);
        }
    }
    trips
}

fn size_k_trips(
    trips_k_minus_1: &[VtPair],
    orders: &[Order],
    vehicle: &Vehicle,
    system_time_ms: TimeMs,
    router: &Router,
) -> Vec<VtPair> {
    if trips_k_minus_1.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let k = trips_k_minus_1[0].trip_ids.len() + 1;
    let start = Instant::now();
    let mut searched: HashSet<Vec<OrderId>> = HashSet::new();
    let feasible_k_minus_1: HashSet<Vec<OrderId>> = trips_k_minus_1.iter().map(|vt| vt.trip_ids.clone()).collect();

    'outer: for i in 0..trips_k_minus_1.len() {
        let trip1_ids = &trips_k_minus_1[i].trip_ids;
        for j in (i + 1)..trips_k_minus_1.len() {
            let trip2_ids = &trips_k_minus_1[j].trip_ids;
            debug_assert!(trip1_ids != trip2_ids);

            let mut union: Vec<OrderId> = trip1_ids.iter().chain(trip2_ids.iter()).copied().collect();
            union.sort_unstable();
            union.dedup();

            if k > 2 {
                if union.len() != k {
                    continue;
                }
                if searched.contains(&union) {
                    continue;
                }
                let mut any_subtrip_infeasible = false;
                for skip in 0..union.len() {
                    let sub_trip: Vec<OrderId> = union
                        .iter()
                        .enumerate()
                        .filter(|(idx, _)| *idx != skip)
                        .map(|(_, id)| *id)
                        .collect();
                    if !feasible_k_minus_1.contains(&sub_trip) {
                        any_subtrip_infeasible = true;
                        break;
                    }
                }
                if any_subtrip_infeasible {
                    continue;
                }
            }

            let new_order_ids: Vec<OrderId> = union.iter().filter(|id| !trip1_ids.contains(id)).copied().collect();
            debug_assert_eq!(new_order_ids.len(), 1);
            let insertion_order = &orders[new_order_ids[0].0];

            if let Some(mut vt) = insert_order(
                insertion_order,
                orders,
                vehicle,
                &trips_k_minus_1[i].feasible_schedules,
                system_time_ms,
                router,
            ) {
                vt.trip_ids = union.clone();
                out.push(vt);
                searched.insert(union);
            }

            if start.elapsed().as_millis() as u64 > SIZE_K_SEARCH_CUTOFF_MS / 10 {
                break;
            }
        }
        if start.elapsed().as_millis() as u64 > SIZE_K_SEARCH_CUTOFF_MS {
            break 'outer;
        }
    }

    out
}

/// Every feasible (trip, schedule) pair for one vehicle: size-1 trips, then
/// size-k trips grown until a round finds nothing new, then the "no new
/// trip" options (the basic schedule, and — when re-optimizing — the
/// vehicle's literal current schedule, carried along so it always survives
/// as a candidate for the assigner even if nothing else does).
pub fn feasible_trips_for_vehicle(
    considered_order_ids: &[OrderId],
    orders: &[Order],
    vehicle: &Vehicle,
    system_time_ms: TimeMs,
    router: &Router,
    enable_reoptimization: bool,
) -> Vec<VtPair> {
    let basic_schedules = basic_schedules_of_vehicle(orders, vehicle, system_time_ms, router, enable_reoptimization);

    let mut trips = size_1_trips(considered_order_ids, orders, vehicle, &basic_schedules, system_time_ms, router);

    let mut previous_size = trips.clone();
    while !previous_size.is_empty() {
        let next_size = size_k_trips(&previous_size, orders, vehicle, system_time_ms, router);
        trips.extend(next_size.clone());
        previous_size = next_size;
    }

    let vehicle_current_schedule_cost_ms = schedule_cost(&vehicle.schedule, orders, vehicle, system_time_ms);
    for vt in trips.iter_mut() {
        vt.rebase_cost(vehicle_current_schedule_cost_ms);
        if !enable_reoptimization {
            debug_assert!(vt.best_schedule_cost_ms >= 0);
        }
    }

    let mut basic_vt = VtPair {
        vehicle_id: vehicle.id,
        trip_ids: Vec::new(),
        feasible_schedules: basic_schedules,
        best_schedule_idx: 0,
        best_schedule_cost_ms: 0,
        score: 0.0,
    };
    if enable_reoptimization {
        let basic_cost_ms = schedule_cost(&basic_vt.feasible_schedules[0], orders, vehicle, system_time_ms);
        basic_vt.best_schedule_cost_ms = basic_cost_ms - vehicle_current_schedule_cost_ms;
    }
    trips.push(basic_vt);

    if enable_reoptimization {
        let trip_ids: Vec<OrderId> = vehicle
            .schedule
            .iter()
            .filter(|wp| wp.op == WaypointOp::Pickup)
            .map(|wp| wp.order_id)
            .collect();
        trips.push(VtPair {
            vehicle_id: vehicle.id,
            trip_ids,
            feasible_schedules: vec![vehicle.schedule.clone()],
            best_schedule_idx: 0,
            best_schedule_cost_ms: 0,
            score: 0.0,
        });
    }

    trips
}

/// Fans the per-vehicle search out over `rayon`'s global pool and joins
/// before the assigner runs (no benefit pipelining this any finer: each
/// vehicle's search is independent and the assigner needs every result).
pub fn feasible_vehicle_trip_pairs(
    considered_order_ids: &[OrderId],
    orders: &[Order],
    vehicles: &[Vehicle],
    system_time_ms: TimeMs,
    router: &Router,
    enable_reoptimization: bool,
) -> Vec<VtPair> {
    vehicles
        .par_iter()
        .flat_map(|vehicle| {
            feasible_trips_for_vehicle(considered_order_ids, orders, vehicle, system_time_ms, router, enable_reoptimization)
        })
        .collect()
}

/// A WORKING vehicle's basic schedule (onboard drop-offs only, re-routed
/// from the vehicle's current position): used both by the enumerator above
/// and by the dispatcher's "orders removed" pass to rebuild a schedule for
/// a vehicle whose picking orders were reassigned elsewhere.
pub fn onboard_only_schedule(vehicle: &Vehicle, router: &Router) -> Result<Vec<Waypoint>> {
    let mut schedule = Vec::with_capacity(vehicle.load);
    let mut pre_pos = vehicle.pos;
    for wp in &vehicle.schedule {
        if vehicle.onboard_order_ids.contains(&wp.order_id) {
            let route = router.route(pre_pos, wp.pos, RoutingType::TimeOnly);
            schedule.push(Waypoint {
                pos: wp.pos,
                op: wp.op,
                order_id: wp.order_id,
                route,
            });
            pre_pos = wp.pos;
        }
    }
    Ok(schedule)
}
