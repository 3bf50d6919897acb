//! Configuration plumbing: `ScenarioParams` (builder-style, defaults mirror
//! the reference source's `config.py`) and `build_scenario`, which wires a
//! ready-to-run `Platform`.

use crate::data::RequestSource;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::platform::Platform;
use crate::rebalancer::Rebalancer;
use crate::request::Request;
use crate::router::{Router, RouterTables};
use crate::types::{TimeMs, VehicleId};
use crate::vehicle::Vehicle;

/// Builder-style scenario configuration. Every row of the configuration
/// table has a `with_*` fluent setter; `Default` mirrors the reference
/// source's out-of-the-box peak-hour Manhattan scenario, except for
/// `router_tables`/`requests`, which have no sensible non-empty default and
/// must be supplied before `build_scenario` will produce a usable platform.
#[derive(Debug, Clone)]
pub struct ScenarioParams {
    pub router_tables: RouterTables,
    pub requests: Vec<Request>,
    pub dispatcher: Dispatcher,
    pub rebalancer: Rebalancer,
    pub fleet_size: usize,
    pub veh_capacity: usize,
    pub request_density: f64,
    pub max_pickup_wait_time_min: f64,
    pub max_onboard_detour: f64,
    pub simulation_start_of_day_ms: TimeMs,
    pub cycle_s: f64,
    pub warmup_duration_min: f64,
    pub simulation_duration_min: f64,
    pub winddown_duration_min: f64,
    pub debug_print: bool,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        ScenarioParams {
            router_tables: RouterTables::default(),
            requests: Vec::new(),
            dispatcher: Dispatcher::Sba,
            rebalancer: Rebalancer::Npo,
            fleet_size: 1000,
            veh_capacity: 8,
            request_density: 1.0,
            max_pickup_wait_time_min: 5.0,
            max_onboard_detour: 1.3,
            simulation_start_of_day_ms: 0,
            cycle_s: 30.0,
            warmup_duration_min: 30.0,
            simulation_duration_min: 60.0,
            winddown_duration_min: 39.0,
            debug_print: false,
        }
    }
}

impl ScenarioParams {
    pub fn with_router_tables(mut self, router_tables: RouterTables) -> Self {
        self.router_tables = router_tables;
        self
    }

    pub fn with_requests(mut self, requests: Vec<Request>) -> Self {
        self.requests = requests;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_rebalancer(mut self, rebalancer: Rebalancer) -> Self {
        self.rebalancer = rebalancer;
        self
    }

    pub fn with_fleet_size(mut self, fleet_size: usize) -> Self {
        self.fleet_size = fleet_size;
        self
    }

    pub fn with_veh_capacity(mut self, veh_capacity: usize) -> Self {
        self.veh_capacity = veh_capacity;
        self
    }

    pub fn with_request_density(mut self, request_density: f64) -> Self {
        self.request_density = request_density;
        self
    }

    pub fn with_max_pickup_wait_time_min(mut self, minutes: f64) -> Self {
        self.max_pickup_wait_time_min = minutes;
        self
    }

    pub fn with_max_onboard_detour(mut self, detour: f64) -> Self {
        self.max_onboard_detour = detour;
        self
    }

    pub fn with_simulation_start_of_day_ms(mut self, ms: TimeMs) -> Self {
        self.simulation_start_of_day_ms = ms;
        self
    }

    pub fn with_cycle_s(mut self, cycle_s: f64) -> Self {
        self.cycle_s = cycle_s;
        self
    }

    pub fn with_warmup_duration_min(mut self, minutes: f64) -> Self {
        self.warmup_duration_min = minutes;
        self
    }

    pub fn with_simulation_duration_min(mut self, minutes: f64) -> Self {
        self.simulation_duration_min = minutes;
        self
    }

    pub fn with_winddown_duration_min(mut self, minutes: f64) -> Self {
        self.winddown_duration_min = minutes;
        self
    }

    pub fn with_debug_print(mut self, debug_print: bool) -> Self {
        self.debug_print = debug_print;
        self
    }
}

/// A fully-wired scenario, ready to `run`.
pub struct Scenario {
    pub platform: Platform,
}

impl Scenario {
    pub fn total_epochs(&self) -> usize {
        self.platform.total_epochs()
    }
}

/// Builds a `Platform` from `params`: validates the router tables, places
/// `fleet_size` vehicles at evenly-spaced stations (index `⌊i·S/F⌋`, S =
/// station count), and wires the demand source and dispatch/rebalance
/// strategies. Fails with `SimError::User` if the router tables are
/// malformed (e.g. the zero-value `Default`).
pub fn build_scenario(params: ScenarioParams) -> Result<Scenario> {
    let router = Router::new(params.router_tables)?;

    let num_stations = router.num_stations().max(1);
    let vehicles: Vec<Vehicle> = (0..params.fleet_size)
        .map(|i| {
            let station_idx = i * num_stations / params.fleet_size.max(1);
            let node_id = router.station_node_id(station_idx);
            Vehicle::new(VehicleId(i), router.node_pos(node_id), params.veh_capacity)
        })
        .collect();

    let request_source = RequestSource::new(params.requests, params.simulation_start_of_day_ms, params.request_density);

    let cycle_ms = (params.cycle_s * 1000.0).round() as TimeMs;
    let main_sim_start_ms = (params.warmup_duration_min * 60_000.0).round() as TimeMs;
    let main_sim_end_ms = main_sim_start_ms + (params.simulation_duration_min * 60_000.0).round() as TimeMs;
    let system_shutdown_ms = main_sim_end_ms + (params.winddown_duration_min * 60_000.0).round() as TimeMs;
    let max_pickup_wait_time_ms = (params.max_pickup_wait_time_min * 60_000.0).round() as TimeMs;

    let platform = Platform::new(
        router,
        request_source,
        vehicles,
        params.dispatcher,
        params.rebalancer,
        cycle_ms,
        main_sim_start_ms,
        main_sim_end_ms,
        system_shutdown_ms,
        max_pickup_wait_time_ms,
        params.max_onboard_detour,
        params.debug_print,
    );

    Ok(Scenario { platform })
}
