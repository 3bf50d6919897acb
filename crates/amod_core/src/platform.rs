//! L9: the epoch loop tying every other component together.

use crate::advancer::advance_vehicle;
use crate::data::RequestSource;
use crate::dispatcher::{dispatch, Dispatcher};
use crate::order::{Order, OrderStatus};
use crate::rebalancer::{rebalance, Rebalancer};
use crate::router::Router;
use crate::types::{OrderId, RoutingType, TimeMs};
use crate::vehicle::Vehicle;

/// Which phase of the run the current epoch belongs to. Only `MainSim`
/// epochs are folded into the final report; `Warmup`/`Winddown` still
/// advance vehicles and dispatch orders so the main phase starts from a
/// realistic fleet distribution rather than a cold, empty-street one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Warmup,
    MainSim,
    Winddown,
}

/// Owns simulation state and drives it forward one cycle at a time.
pub struct Platform {
    pub system_time_ms: TimeMs,
    pub orders: Vec<Order>,
    pub vehicles: Vec<Vehicle>,
    pub router: Router,
    pub request_source: RequestSource,
    pub dispatcher: Dispatcher,
    pub rebalancer: Rebalancer,
    pub cycle_ms: TimeMs,
    pub main_sim_start_ms: TimeMs,
    pub main_sim_end_ms: TimeMs,
    pub system_shutdown_ms: TimeMs,
    pub max_pickup_wait_time_ms: TimeMs,
    pub max_onboard_detour: f64,
    pub debug_print: bool,
}

impl Platform {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        router: Router,
        request_source: RequestSource,
        vehicles: Vec<Vehicle>,
        dispatcher: Dispatcher,
        rebalancer: Rebalancer,
        cycle_ms: TimeMs,
        main_sim_start_ms: TimeMs,
        main_sim_end_ms: TimeMs,
        system_shutdown_ms: TimeMs,
        max_pickup_wait_time_ms: TimeMs,
        max_onboard_detour: f64,
        debug_print: bool,
    ) -> Self {
        Platform {
            system_time_ms: 0,
            orders: Vec::new(),
            vehicles,
            router,
            request_source,
            dispatcher,
            rebalancer,
            cycle_ms,
            main_sim_start_ms,
            main_sim_end_ms,
            system_shutdown_ms,
            max_pickup_wait_time_ms,
            max_onboard_detour,
            debug_print,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.system_time_ms < self.main_sim_start_ms {
            Phase::Warmup
        } else if self.system_time_ms <= self.main_sim_end_ms {
            Phase::MainSim
        } else {
            Phase::Winddown
        }
    }

    pub fn total_epochs(&self) -> usize {
        (self.system_shutdown_ms / self.cycle_ms) as usize
    }

    /// Runs `total_epochs` cycles from the current state.
    pub fn run(&mut self, total_epochs: usize) {
        for _ in 0..total_epochs {
            self.step();
        }
    }

    /// Advances the simulation by one epoch: advance vehicles, ingest
    /// demand, sweep walkaways, dispatch, rebalance, bookkeep. See §4.10/§5
    /// for the ordering guarantee this follows exactly.
    pub fn step(&mut self) {
        let epoch_start_ms = self.system_time_ms;
        let count_stats = self.main_sim_start_ms < epoch_start_ms && epoch_start_ms <= self.main_sim_end_ms;
        self.advance_vehicles(self.cycle_ms, count_stats);

        for order in self.orders.iter_mut() {
            if order.status == OrderStatus::Pending && order.should_walk_away(self.system_time_ms) {
                order.status = OrderStatus::Walkaway;
            }
        }

        let new_received_order_ids = self.ingest_demand();

        for vehicle in self.vehicles.iter_mut() {
            vehicle.schedule_has_been_updated_at_current_epoch = false;
        }

        // Outside the main simulation window, SBA is used regardless of the
        // configured dispatcher: the fleet is still settling in (warmup) or
        // draining out (winddown), and OSP's heavier re-optimization isn't
        // worth its cost for orders that won't be scored anyway.
        let active_dispatcher = if self.phase() == Phase::MainSim { self.dispatcher } else { Dispatcher::Sba };
        dispatch(active_dispatcher, &new_received_order_ids, &mut self.orders, &mut self.vehicles, self.system_time_ms, &self.router);

        rebalance(self.rebalancer, &self.orders, &mut self.vehicles, &self.router);

        if self.debug_print {
            self.print_epoch_debug_line(epoch_start_ms);
        }
    }

    fn advance_vehicles(&mut self, time_ms: TimeMs, count_stats: bool) {
        let system_time_ms = self.system_time_ms;
        for vehicle in self.vehicles.iter_mut() {
            if count_stats {
                advance_vehicle(vehicle, &mut self.orders, system_time_ms, time_ms);
            } else {
                // Still move the vehicle and execute pickups/dropoffs, but
                // discard the resulting stats: warmup/winddown epochs are
                // never reported, so charging them would skew the averages.
                let stats_before = vehicle.stats;
                advance_vehicle(vehicle, &mut self.orders, system_time_ms, time_ms);
                vehicle.stats = stats_before;
            }
        }
        self.system_time_ms += time_ms;
    }

    fn ingest_demand(&mut self) -> Vec<OrderId> {
        let requests = self.request_source.requests_due_by(self.system_time_ms);
        let mut new_ids = Vec::with_capacity(requests.len());
        for request in requests {
            let id = OrderId(self.orders.len());
            let origin = self.router.node_pos(request.origin_node_id);
            let destination = self.router.node_pos(request.destination_node_id);
            let shortest_travel_time_ms = self.router.route(origin, destination, RoutingType::TimeOnly).duration_ms;
            let deadlines = crate::order::DeadlineConfig {
                max_wait_ms: self.max_pickup_wait_time_ms,
                max_detour: self.max_onboard_detour,
            };
            let order = Order::new(id, origin, destination, request.request_time_ms, shortest_travel_time_ms, deadlines);
            self.orders.push(order);
            new_ids.push(id);
        }
        new_ids
    }

    fn print_epoch_debug_line(&self, epoch_start_ms: TimeMs) {
        println!(
            "[DEBUG] T = {}s: epoch starting at {epoch_start_ms}ms, phase = {:?}, orders = {}, vehicles = {}",
            self.system_time_ms / 1000,
            self.phase(),
            self.orders.len(),
            self.vehicles.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RequestSource;
    use crate::request::Request;
    use crate::test_helpers::line_router_tables;

    fn build_platform(requests: Vec<Request>) -> Platform {
        let router = Router::new(line_router_tables(4, 60.0, 600.0)).unwrap();
        let source = RequestSource::new(requests, 0, 1.0);
        let vehicles = vec![Vehicle::new(crate::types::VehicleId(0), router.node_pos(1), 4)];
        Platform::new(
            router,
            source,
            vehicles,
            Dispatcher::Sba,
            Rebalancer::None,
            30_000,
            0,
            600_000,
            600_000,
            300_000,
            1.3,
            false,
        )
    }

    #[test]
    fn step_ingests_a_due_request_and_dispatches_it() {
        let mut platform = build_platform(vec![Request {
            origin_node_id: 1,
            destination_node_id: 2,
            request_time_ms: 0,
            request_time_date: "t".to_string(),
        }]);

        platform.step();

        assert_eq!(platform.orders.len(), 1);
        assert_ne!(platform.orders[0].status, OrderStatus::Pending);
        assert_eq!(platform.system_time_ms, 30_000);
    }

    #[test]
    fn run_advances_exactly_total_epochs_cycles() {
        let mut platform = build_platform(Vec::new());
        let epochs = platform.total_epochs();
        platform.run(epochs);
        assert_eq!(platform.system_time_ms, 600_000);
    }
}
