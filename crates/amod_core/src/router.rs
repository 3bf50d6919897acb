//! L1: the read-only routing oracle.
//!
//! Initialized once from five node-indexed tables and never mutated
//! afterward, so it can be shared (`&Router`) across the parallel
//! per-vehicle trip enumeration of section 5.1.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::error::{Result, SimError};
use crate::types::{DistMm, Pos, Route, RoutingType, Step, TimeMs};

/// The five precomputed tables a Router is built from. Decoding these from
/// disk (CSV/pickle in the reference source) is out of scope; this struct
/// is the in-memory shape the out-of-scope loader hands to `Router::new`.
#[derive(Debug, Clone, Default)]
pub struct RouterTables {
    /// 1-indexed: `nodes[0]` corresponds to node_id 1.
    pub nodes: Vec<Pos>,
    /// Node ids used to seed initial vehicle placement.
    pub stations: Vec<usize>,
    /// `shortest_path_pred[u][v]` = predecessor of `v` on the shortest path
    /// from `u`, 1-indexed by node id minus one; `0` means "v is u itself,
    /// or unreachable".
    pub shortest_path_pred: Vec<Vec<usize>>,
    /// Seconds between node pairs, 0-indexed by node id minus one.
    pub mean_travel_time_s: Vec<Vec<f64>>,
    /// Meters between node pairs, 0-indexed by node id minus one.
    pub travel_distance_m: Vec<Vec<f64>>,
}

impl RouterTables {
    fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn validate(&self) -> Result<()> {
        let n = self.num_nodes();
        if n == 0 {
            return Err(SimError::User("RouterTables: nodes table is empty".into()));
        }
        let square = |name: &str, rows: usize| -> Result<()> {
            if rows != n {
                return Err(SimError::User(format!(
                    "RouterTables: {name} has {rows} rows, expected {n}"
                )));
            }
            Ok(())
        };
        square("shortest_path_pred", self.shortest_path_pred.len())?;
        square("mean_travel_time_s", self.mean_travel_time_s.len())?;
        square("travel_distance_m", self.travel_distance_m.len())?;
        for row in &self.shortest_path_pred {
            if row.len() != n {
                return Err(SimError::User(
                    "RouterTables: shortest_path_pred row has wrong width".into(),
                ));
            }
        }
        for row in &self.mean_travel_time_s {
            if row.len() != n {
                return Err(SimError::User(
                    "RouterTables: mean_travel_time_s row has wrong width".into(),
                ));
            }
        }
        for row in &self.travel_distance_m {
            if row.len() != n {
                return Err(SimError::User(
                    "RouterTables: travel_distance_m row has wrong width".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Read-only routing oracle. Node ids passed to any operation must be
/// 1-based and within range; out-of-range ids are a programmer error and
/// panic rather than return a `Result` (taxonomy: invariant errors abort).
pub struct Router {
    tables: RouterTables,
    full_route_cache: Mutex<LruCache<(usize, usize), Route>>,
}

const FULL_ROUTE_CACHE_SIZE: usize = 4096;

impl Router {
    /// Validates table shapes once at construction; mismatches are a
    /// `SimError::User` (fatal at startup), per the error handling design.
    pub fn new(tables: RouterTables) -> Result<Self> {
        tables.validate()?;
        Ok(Router {
            tables,
            full_route_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(FULL_ROUTE_CACHE_SIZE).expect("cache size must be non-zero"),
            )),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.tables.num_nodes()
    }

    fn assert_valid_node(&self, node_id: usize) {
        assert!(
            node_id >= 1 && node_id <= self.num_nodes(),
            "router: node id {node_id} out of range [1, {}]",
            self.num_nodes()
        );
    }

    pub fn node_pos(&self, node_id: usize) -> Pos {
        self.assert_valid_node(node_id);
        self.tables.nodes[node_id - 1]
    }

    pub fn station_node_id(&self, index: usize) -> usize {
        self.tables.stations[index]
    }

    pub fn num_stations(&self) -> usize {
        self.tables.stations.len()
    }

    /// `route(origin, destination, routing_type)`. TIME_ONLY sets only the
    /// aggregate distance/duration; FULL_ROUTE additionally reconstructs
    /// `steps` by walking the predecessor table backward and appends the
    /// zero-length terminal sentinel step.
    pub fn route(&self, origin: Pos, destination: Pos, routing_type: RoutingType) -> Route {
        self.assert_valid_node(origin.node_id);
        self.assert_valid_node(destination.node_id);
        let onid = origin.node_id;
        let dnid = destination.node_id;

        let distance_mm = self.distance_mm(onid, dnid);
        let duration_ms = self.duration_ms(onid, dnid);

        match routing_type {
            RoutingType::TimeOnly => Route {
                distance_mm,
                duration_ms,
                steps: Vec::new(),
            },
            RoutingType::FullRoute => {
                if let Some(cached) = self.full_route_cache.lock().unwrap().get(&(onid, dnid)) {
                    return cached.clone();
                }
                let route = self.build_full_route(onid, dnid, distance_mm, duration_ms);
                self.full_route_cache
                    .lock()
                    .unwrap()
                    .put((onid, dnid), route.clone());
                route
            }
        }
    }

    fn distance_mm(&self, onid: usize, dnid: usize) -> DistMm {
        (self.tables.travel_distance_m[onid - 1][dnid - 1] * 1000.0).round() as DistMm
    }

    fn duration_ms(&self, onid: usize, dnid: usize) -> TimeMs {
        (self.tables.mean_travel_time_s[onid - 1][dnid - 1] * 1000.0).round() as TimeMs
    }

    fn build_full_route(
        &self,
        onid: usize,
        dnid: usize,
        expected_distance_mm: DistMm,
        expected_duration_ms: TimeMs,
    ) -> Route {
        // Walk the predecessor table backward from destination to origin.
        let mut path = vec![dnid];
        let mut pred = self.tables.shortest_path_pred[onid - 1][dnid - 1];
        while pred > 0 {
            path.push(pred);
            pred = self.tables.shortest_path_pred[onid - 1][pred - 1];
        }
        path.reverse();

        let mut route = Route::default();
        for pair in path.windows(2) {
            let (u, v) = (pair[0], pair[1]);
            let step = Step {
                distance_mm: self.distance_mm(u, v),
                duration_ms: self.duration_ms(u, v),
                poses: [self.node_pos(u), self.node_pos(v)],
            };
            route.distance_mm += step.distance_mm;
            route.duration_ms += step.duration_ms;
            route.steps.push(step);
        }
        route.steps.push(Step::zero_at(self.node_pos(dnid)));

        const TOLERANCE: i64 = 5;
        debug_assert!(
            (route.duration_ms - expected_duration_ms).abs() <= TOLERANCE,
            "full route duration {} deviates from table duration {} beyond tolerance",
            route.duration_ms,
            expected_duration_ms
        );
        debug_assert!(
            (route.distance_mm - expected_distance_mm).abs() <= TOLERANCE,
            "full route distance {} deviates from table distance {} beyond tolerance",
            route.distance_mm,
            expected_distance_mm
        );
        route
    }
}
