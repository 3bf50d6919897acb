//! L2: advances a vehicle's position by a fixed time slice, executing any
//! pickups/dropoffs it reaches along the way and charging travel stats to
//! the loaded/empty/rebalancing bins.

use crate::order::{Order, OrderStatus};
use crate::types::{OrderId, Route, Step, TimeMs};
use crate::vehicle::{Vehicle, VehicleStatus};

/// Shrinks `step` by `time_ms` of travel, moving its start position forward
/// by linear interpolation. `time_ms` must be strictly less than the step's
/// current duration (a step this call would fully consume is instead
/// dropped by the caller, not truncated).
fn truncate_step_by_time(step: &mut Step, time_ms: TimeMs) {
    debug_assert!(step.distance_mm > 0);
    debug_assert!(step.duration_ms > 0);
    debug_assert!(time_ms >= 0);
    debug_assert!(time_ms < step.duration_ms);

    if time_ms == 0 {
        return;
    }

    let ratio = time_ms as f64 / step.duration_ms as f64;
    let start = step.poses[0];
    let end = step.poses[1];
    let new_start = crate::types::Pos {
        node_id: end.node_id,
        lon: start.lon + ratio * (end.lon - start.lon),
        lat: start.lat + ratio * (end.lat - start.lat),
    };
    step.poses[0] = new_start;
    step.distance_mm = (step.distance_mm as f64 * (1.0 - ratio)).round() as i64;
    // Subtract the raw time rather than scale by (1 - ratio): scaling can
    // leave a nonzero remainder when time_ms is within rounding error of
    // duration_ms (e.g. 11119 / 11120 == 1.0).
    step.duration_ms -= time_ms;

    debug_assert!(step.distance_mm >= 0);
    debug_assert!(step.duration_ms > 0);
}

/// Drops whole steps `route` can finish within `time_ms`, then truncates the
/// first step it can't finish. `time_ms` must be strictly less than the
/// route's current duration.
fn truncate_route_by_time(route: &mut Route, time_ms: TimeMs) {
    debug_assert!(route.steps.len() >= 2);
    debug_assert!(route.distance_mm > 0);
    debug_assert!(route.duration_ms > 0);
    debug_assert!(time_ms >= 0);
    debug_assert!(time_ms < route.duration_ms);

    if time_ms == 0 {
        return;
    }

    let mut remaining = time_ms;
    for i in 0..route.steps.len() {
        if route.steps[i].duration_ms <= remaining {
            remaining -= route.steps[i].duration_ms;
            continue;
        }
        truncate_step_by_time(&mut route.steps[i], remaining);
        route.steps.drain(0..i);
        break;
    }

    route.distance_mm = route.steps.iter().map(|s| s.distance_mm).sum();
    route.duration_ms = route.steps.iter().map(|s| s.duration_ms).sum();

    debug_assert!(route.steps.len() >= 2);
    debug_assert!(route.distance_mm >= 0);
    debug_assert!(route.duration_ms > 0);
}

/// Advances `vehicle` by `time_ms`, executing every pickup/dropoff its
/// schedule reaches within that slice and charging stats. Returns the order
/// ids picked up and dropped off during this slice, in schedule order.
pub fn advance_vehicle(vehicle: &mut Vehicle, orders: &mut [Order], system_time_ms: TimeMs, time_ms: TimeMs) -> (Vec<OrderId>, Vec<OrderId>) {
    let mut new_picked_order_ids = Vec::new();
    let mut new_dropped_order_ids = Vec::new();

    if time_ms == 0 {
        return (new_picked_order_ids, new_dropped_order_ids);
    }

    // A vehicle whose assigned orders all got reassigned elsewhere this
    // epoch goes IDLE with an empty schedule but may still be mid-link; walk
    // that off before returning.
    if vehicle.is_idle() {
        if vehicle.step_to_pos.duration_ms == 0 {
            return (new_picked_order_ids, new_dropped_order_ids);
        }
        if vehicle.step_to_pos.duration_ms <= time_ms {
            vehicle.stats.empty_distance_mm += vehicle.step_to_pos.distance_mm;
            vehicle.stats.empty_time_ms += vehicle.step_to_pos.duration_ms;
            vehicle.step_to_pos = Step::zero_at(vehicle.pos);
        } else {
            let origin_distance_mm = vehicle.step_to_pos.distance_mm;
            truncate_step_by_time(&mut vehicle.step_to_pos, time_ms);
            let dist_traveled_mm = origin_distance_mm - vehicle.step_to_pos.distance_mm;
            vehicle.stats.empty_distance_mm += dist_traveled_mm;
            vehicle.stats.empty_time_ms += time_ms;
        }
        return (new_picked_order_ids, new_dropped_order_ids);
    }

    vehicle.step_to_pos = Step::zero_at(vehicle.pos);

    let mut system_time_ms = system_time_ms;
    let mut remaining = time_ms;
    for i in 0..vehicle.schedule.len() {
        let wp_duration_ms = vehicle.schedule[i].route.duration_ms;

        if wp_duration_ms <= remaining {
            system_time_ms += wp_duration_ms;
            remaining -= wp_duration_ms;

            let wp = vehicle.schedule[i].clone();
            vehicle.pos = wp.pos;

            vehicle.stats.loaded_distance_mm += wp.route.distance_mm * vehicle.load as i64;
            vehicle.stats.loaded_time_ms += wp.route.duration_ms * vehicle.load as i64;
            if vehicle.status == VehicleStatus::Working && vehicle.load == 0 {
                vehicle.stats.empty_distance_mm += wp.route.distance_mm;
                vehicle.stats.empty_time_ms += wp.route.duration_ms;
            }
            if vehicle.status == VehicleStatus::Rebalancing {
                vehicle.stats.rebalancing_distance_mm += wp.route.distance_mm;
                vehicle.stats.rebalancing_time_ms += wp.route.duration_ms;
            }

            match wp.op {
                crate::types::WaypointOp::Pickup => {
                    debug_assert!(vehicle.load < vehicle.capacity);
                    debug_assert_eq!(orders[wp.order_id.0].status, OrderStatus::Picking);
                    orders[wp.order_id.0].pickup_time_ms = Some(system_time_ms);
                    orders[wp.order_id.0].status = OrderStatus::Onboard;
                    vehicle.load += 1;
                    vehicle.onboard_order_ids.push(wp.order_id);
                    new_picked_order_ids.push(wp.order_id);
                }
                crate::types::WaypointOp::Dropoff => {
                    debug_assert!(vehicle.load > 0);
                    debug_assert_eq!(orders[wp.order_id.0].status, OrderStatus::Onboard);
                    orders[wp.order_id.0].dropoff_time_ms = Some(system_time_ms);
                    orders[wp.order_id.0].status = OrderStatus::Complete;
                    vehicle.load -= 1;
                    vehicle.onboard_order_ids.retain(|&id| id != wp.order_id);
                    new_dropped_order_ids.push(wp.order_id);
                }
                crate::types::WaypointOp::Reposition => {}
            }
            debug_assert_eq!(vehicle.load, vehicle.onboard_order_ids.len());
            continue;
        }

        // Can't finish this waypoint's route; truncate it and stop here.
        let original_distance_mm = vehicle.schedule[i].route.distance_mm;
        let original_duration_ms = vehicle.schedule[i].route.duration_ms;

        truncate_route_by_time(&mut vehicle.schedule[i].route, remaining);
        vehicle.pos = vehicle.schedule[i].route.steps[0].poses[0];

        let dist_traveled_mm = original_distance_mm - vehicle.schedule[i].route.distance_mm;
        let time_traveled_ms = original_duration_ms - vehicle.schedule[i].route.duration_ms;
        vehicle.stats.loaded_distance_mm += dist_traveled_mm * vehicle.load as i64;
        vehicle.stats.loaded_time_ms += time_traveled_ms * vehicle.load as i64;
        if vehicle.status == VehicleStatus::Working && vehicle.load == 0 {
            vehicle.stats.empty_distance_mm += dist_traveled_mm;
            vehicle.stats.empty_time_ms += time_traveled_ms;
        }
        if vehicle.status == VehicleStatus::Rebalancing {
            vehicle.stats.rebalancing_distance_mm += dist_traveled_mm;
            vehicle.stats.rebalancing_time_ms += time_traveled_ms;
        }

        vehicle.schedule.drain(0..i);

        let first_step = &vehicle.schedule[0].route.steps[0];
        if first_step.poses[0].node_id == first_step.poses[1].node_id {
            vehicle.step_to_pos = first_step.clone();
            debug_assert!(vehicle.step_to_pos.duration_ms != 0);
            debug_assert_eq!(vehicle.pos.node_id, vehicle.step_to_pos.poses[0].node_id);
        }

        return (new_picked_order_ids, new_dropped_order_ids);
    }

    // Finished the whole schedule within this slice.
    vehicle.schedule.clear();
    vehicle.status = VehicleStatus::Idle;
    (new_picked_order_ids, new_dropped_order_ids)
}
