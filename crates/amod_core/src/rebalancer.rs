//! L8: nearest-pending-order rebalancing. The only strategy implemented;
//! `Rebalancer::None` turns the pass into a no-op for scenarios that don't
//! want idle vehicles repositioned at all.

use crate::dispatcher::commit;
use crate::order::{Order, OrderStatus};
use crate::router::Router;
use crate::types::{OrderId, RoutingType, VehicleId, Waypoint, WaypointOp};
use crate::vehicle::Vehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rebalancer {
    None,
    Npo,
}

/// Sends each idle vehicle toward the nearest still-unclaimed pending
/// order's origin, greedily by ascending travel time: cheap (route, not
/// full insertion search) since a rebalancing trip carries no passenger.
pub fn rebalance(rebalancer: Rebalancer, orders: &[Order], vehicles: &mut [Vehicle], router: &Router) {
    if rebalancer == Rebalancer::None {
        return;
    }

    let pending_order_ids: Vec<OrderId> = orders.iter().filter(|o| o.status == OrderStatus::Pending).map(|o| o.id).collect();

    let mut candidates: Vec<(VehicleId, OrderId, Waypoint)> = Vec::new();
    for &order_id in &pending_order_ids {
        let order = &orders[order_id.0];
        for vehicle in vehicles.iter() {
            if !vehicle.is_idle() {
                continue;
            }
            let route = router.route(vehicle.pos, order.origin, RoutingType::TimeOnly);
            let waypoint = Waypoint {
                pos: order.origin,
                op: WaypointOp::Reposition,
                order_id,
                route,
            };
            candidates.push((vehicle.id, order_id, waypoint));
        }
    }

    candidates.sort_by_key(|(_, _, wp)| wp.route.duration_ms);

    let mut claimed_vehicles = std::collections::HashSet::new();
    let mut claimed_orders = std::collections::HashSet::new();
    for (vehicle_id, order_id, waypoint) in candidates {
        if claimed_vehicles.contains(&vehicle_id) || claimed_orders.contains(&order_id) {
            continue;
        }
        claimed_vehicles.insert(vehicle_id);
        claimed_orders.insert(order_id);
        commit(&mut vehicles[vehicle_id.0], vec![waypoint], router);
    }
}
