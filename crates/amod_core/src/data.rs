//! External-collaborator seams: the in-memory stand-ins for the out-of-scope
//! request trace reader and the end-of-run text report.

use crate::order::{Order, OrderStatus};
use crate::request::Request;
use crate::types::TimeMs;
use crate::vehicle::Vehicle;

/// Stands in for the reference source's `DemandGenerator`: hands out
/// requests already due by a given system time, rebased so that
/// `simulation_start_of_day_ms` becomes system time 0, and thinned by
/// `request_density`.
#[derive(Debug, Clone)]
pub struct RequestSource {
    requests: Vec<Request>,
    simulation_start_of_day_ms: TimeMs,
    request_density: f64,
    init_request_idx: usize,
    current_request_count: usize,
}

impl RequestSource {
    /// `requests` must be sorted by `request_time_ms` ascending, matching the
    /// trace file's natural order.
    pub fn new(requests: Vec<Request>, simulation_start_of_day_ms: TimeMs, request_density: f64) -> Self {
        let init_request_idx = requests.iter().position(|r| r.request_time_ms >= simulation_start_of_day_ms).unwrap_or(requests.len());
        RequestSource {
            requests,
            simulation_start_of_day_ms,
            request_density,
            init_request_idx,
            current_request_count: 0,
        }
    }

    /// Pops every request due by `target_system_time_ms` (already rebased to
    /// simulation-clock-zero) and thins the stream by `request_density`:
    /// only every `1/request_density`-th request in arrival order is ever
    /// returned, matching the reference generator's `current_request_count /
    /// request_density` stride.
    pub fn requests_due_by(&mut self, target_system_time_ms: TimeMs) -> Vec<Request> {
        let mut due = Vec::new();
        loop {
            let idx = self.init_request_idx + (self.current_request_count as f64 / self.request_density) as usize;
            let Some(candidate) = self.requests.get(idx) else {
                break;
            };
            if candidate.request_time_ms >= target_system_time_ms + self.simulation_start_of_day_ms {
                break;
            }
            let mut request = candidate.clone();
            request.request_time_ms -= self.simulation_start_of_day_ms;
            due.push(request);
            self.current_request_count += 1;
        }
        due
    }
}

/// End-of-run text summary: order service levels and per-vehicle travel
/// distance/time split across loaded/empty/rebalancing. Descriptive, not
/// bit-exact; mirrors the reference source's own `create_report`.
#[derive(Debug, Clone)]
pub struct Report {
    pub fleet_size: usize,
    pub veh_capacity: usize,
    pub cycle_s: f64,
    pub main_sim_epochs: usize,
    pub order_count: usize,
    pub complete_count: usize,
    pub onboard_count: usize,
    pub picking_count: usize,
    pub pending_count: usize,
    pub walkaway_count: usize,
    pub avg_shortest_travel_s: f64,
    pub avg_wait_s: f64,
    pub avg_delay_s: f64,
    pub total_dist_km: f64,
    pub avg_dist_km: f64,
    pub avg_empty_dist_km: f64,
    pub avg_rebl_dist_km: f64,
    pub avg_time_s: f64,
    pub avg_empty_time_s: f64,
    pub avg_rebl_time_s: f64,
    pub average_load_dist: f64,
    pub average_load_time: f64,
}

impl Report {
    /// Builds the report from the final order/vehicle state. Only orders
    /// requested strictly after `main_sim_start_ms` and at or before
    /// `main_sim_end_ms` are counted, matching the main-simulation-phase
    /// filter of the reference source (WARMUP/WINDDOWN orders are dispatched
    /// but excluded from the report).
    pub fn finalize(
        orders: &[Order],
        vehicles: &[Vehicle],
        fleet_size: usize,
        veh_capacity: usize,
        cycle_s: f64,
        main_sim_epochs: usize,
        main_sim_start_ms: TimeMs,
        main_sim_end_ms: TimeMs,
    ) -> Self {
        let considered: Vec<&Order> = orders
            .iter()
            .filter(|o| o.request_time_ms > main_sim_start_ms && o.request_time_ms <= main_sim_end_ms)
            .collect();

        let order_count = considered.len();
        let mut complete_count = 0;
        let mut onboard_count = 0;
        let mut picking_count = 0;
        let mut pending_count = 0;
        let mut walkaway_count = 0;
        let mut total_wait_ms: i64 = 0;
        let mut total_delay_ms: i64 = 0;
        let mut total_shortest_travel_ms: i64 = 0;

        for order in &considered {
            match order.status {
                OrderStatus::Walkaway => walkaway_count += 1,
                OrderStatus::Complete => {
                    complete_count += 1;
                    let pickup = order.pickup_time_ms.expect("complete order always has a pickup time");
                    let dropoff = order.dropoff_time_ms.expect("complete order always has a dropoff time");
                    total_wait_ms += pickup - order.request_time_ms;
                    total_delay_ms += dropoff - (order.request_time_ms + order.shortest_travel_time_ms);
                    total_shortest_travel_ms += order.shortest_travel_time_ms;
                }
                OrderStatus::Onboard => onboard_count += 1,
                OrderStatus::Picking => picking_count += 1,
                OrderStatus::Pending => pending_count += 1,
            }
        }

        let (avg_shortest_travel_s, avg_wait_s, avg_delay_s) = if complete_count > 0 {
            (
                total_shortest_travel_ms as f64 / 1000.0 / complete_count as f64,
                total_wait_ms as f64 / 1000.0 / complete_count as f64,
                total_delay_ms as f64 / 1000.0 / complete_count as f64,
            )
        } else {
            (0.0, 0.0, 0.0)
        };

        let n = vehicles.len().max(1) as f64;
        let total_dist_mm: i64 = vehicles
            .iter()
            .map(|v| v.stats.loaded_distance_mm + v.stats.empty_distance_mm + v.stats.rebalancing_distance_mm)
            .sum();
        let total_empty_dist_mm: i64 = vehicles.iter().map(|v| v.stats.empty_distance_mm).sum();
        let total_rebl_dist_mm: i64 = vehicles.iter().map(|v| v.stats.rebalancing_distance_mm).sum();
        let total_loaded_dist_mm: i64 = vehicles.iter().map(|v| v.stats.loaded_distance_mm).sum();
        let total_time_ms: i64 = vehicles
            .iter()
            .map(|v| v.stats.loaded_time_ms + v.stats.empty_time_ms + v.stats.rebalancing_time_ms)
            .sum();
        let total_empty_time_ms: i64 = vehicles.iter().map(|v| v.stats.empty_time_ms).sum();
        let total_rebl_time_ms: i64 = vehicles.iter().map(|v| v.stats.rebalancing_time_ms).sum();
        let total_loaded_time_ms: i64 = vehicles.iter().map(|v| v.stats.loaded_time_ms).sum();

        let total_dist_km = total_dist_mm as f64 / 1_000_000.0;
        let avg_dist_km = total_dist_km / n;
        let avg_empty_dist_km = total_empty_dist_mm as f64 / 1_000_000.0 / n;
        let avg_rebl_dist_km = total_rebl_dist_mm as f64 / 1_000_000.0 / n;
        let avg_time_s = total_time_ms as f64 / 1000.0 / n;
        let avg_empty_time_s = total_empty_time_ms as f64 / 1000.0 / n;
        let avg_rebl_time_s = total_rebl_time_ms as f64 / 1000.0 / n;
        let average_load_dist = if total_dist_mm > 0 { total_loaded_dist_mm as f64 / total_dist_mm as f64 } else { 0.0 };
        let average_load_time = if total_time_ms > 0 { total_loaded_time_ms as f64 / total_time_ms as f64 } else { 0.0 };

        Report {
            fleet_size,
            veh_capacity,
            cycle_s,
            main_sim_epochs,
            order_count,
            complete_count,
            onboard_count,
            picking_count,
            pending_count,
            walkaway_count,
            avg_shortest_travel_s,
            avg_wait_s,
            avg_delay_s,
            total_dist_km,
            avg_dist_km,
            avg_empty_dist_km,
            avg_rebl_dist_km,
            avg_time_s,
            avg_empty_time_s,
            avg_rebl_time_s,
            average_load_dist,
            average_load_time,
        }
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# System Configuration")?;
        writeln!(f, "  - Fleet: size = {}, capacity = {}. ({} main epochs, {} s/epoch).", self.fleet_size, self.veh_capacity, self.main_sim_epochs, self.cycle_s)?;
        if self.order_count == 0 {
            return writeln!(f, "# Orders (0/0)");
        }
        let serviced = self.complete_count + self.onboard_count;
        writeln!(
            f,
            "# Orders ({}/{})",
            self.order_count - self.walkaway_count,
            self.order_count
        )?;
        writeln!(
            f,
            "  - complete = {} ({:.2}%), onboard = {} ({:.2}%), total_service = {} ({:.2}%).",
            self.complete_count,
            100.0 * self.complete_count as f64 / self.order_count as f64,
            self.onboard_count,
            100.0 * self.onboard_count as f64 / self.order_count as f64,
            serviced,
            100.0 * serviced as f64 / self.order_count as f64,
        )?;
        if self.complete_count > 0 {
            writeln!(
                f,
                "  - avg_shortest_travel = {:.2} s, avg_wait = {:.2} s, avg_delay = {:.2} s.",
                self.avg_shortest_travel_s, self.avg_wait_s, self.avg_delay_s
            )?;
        }
        writeln!(f, "# Vehicles")?;
        writeln!(f, "  - total_dist = {:.2} km, avg_dist = {:.2} km.", self.total_dist_km, self.avg_dist_km)?;
        writeln!(f, "  - avg_time = {:.2} s.", self.avg_time_s)?;
        writeln!(f, "  - avg_empty_time = {:.2} s, avg_empty_dist = {:.2} km.", self.avg_empty_time_s, self.avg_empty_dist_km)?;
        writeln!(f, "  - avg_rebl_time = {:.2} s, avg_rebl_dist = {:.2} km.", self.avg_rebl_time_s, self.avg_rebl_dist_km)?;
        writeln!(f, "  - average_load_dist = {:.2}, average_load_time = {:.2}.", self.average_load_dist, self.average_load_time)
    }
}
