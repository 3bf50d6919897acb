//! In-memory fixtures for exercising the dispatch engine without the
//! out-of-scope file loaders. Gated behind the `test-helpers` feature (on by
//! default) so integration tests in `tests/` can use it too.

use crate::router::RouterTables;
use crate::types::Pos;

/// Builds `RouterTables` for an undirected weighted graph by running
/// single-source Dijkstra from every node. `edges` are `(u, v, distance_m,
/// duration_s)` with 1-based node ids; both endpoints get a reciprocal arc.
/// Distance and duration accumulate along the same shortest-duration path,
/// matching a table precomputed once from one routing backend.
pub fn router_tables_from_edges(
    node_positions: &[(f64, f64)],
    edges: &[(usize, usize, f64, f64)],
    stations: Vec<usize>,
) -> RouterTables {
    let n = node_positions.len();
    let nodes: Vec<Pos> = node_positions
        .iter()
        .enumerate()
        .map(|(i, (lon, lat))| Pos {
            node_id: i + 1,
            lon: *lon,
            lat: *lat,
        })
        .collect();

    let mut adj: Vec<Vec<(usize, f64, f64)>> = vec![Vec::new(); n];
    for &(u, v, dist_m, dur_s) in edges {
        adj[u - 1].push((v - 1, dist_m, dur_s));
        adj[v - 1].push((u - 1, dist_m, dur_s));
    }

    let mut shortest_path_pred = vec![vec![0usize; n]; n];
    let mut mean_travel_time_s = vec![vec![0.0f64; n]; n];
    let mut travel_distance_m = vec![vec![0.0f64; n]; n];

    for src in 0..n {
        let mut dist = vec![f64::INFINITY; n];
        let mut dist_m = vec![0.0f64; n];
        let mut pred = vec![0usize; n];
        let mut visited = vec![false; n];
        dist[src] = 0.0;

        for _ in 0..n {
            let u = (0..n)
                .filter(|&i| !visited[i])
                .min_by(|&a, &b| dist[a].partial_cmp(&dist[b]).unwrap())
                .unwrap();
            if !dist[u].is_finite() {
                break;
            }
            visited[u] = true;
            for &(v, edge_dist_m, edge_dur_s) in &adj[u] {
                let cand = dist[u] + edge_dur_s;
                if cand < dist[v] {
                    dist[v] = cand;
                    dist_m[v] = dist_m[u] + edge_dist_m;
                    pred[v] = u + 1;
                }
            }
        }

        for dst in 0..n {
            mean_travel_time_s[src][dst] = if dst == src { 0.0 } else { dist[dst] };
            travel_distance_m[src][dst] = if dst == src { 0.0 } else { dist_m[dst] };
            shortest_path_pred[src][dst] = if dst == src { 0 } else { pred[dst] };
        }
    }

    RouterTables {
        nodes,
        stations,
        shortest_path_pred,
        mean_travel_time_s,
        travel_distance_m,
    }
}

/// Two nodes joined by a single direct edge: the simplest fixture for
/// scenarios that need an exact, hand-computed travel time (e.g. S1).
pub fn two_node_router_tables(duration_s: f64, distance_m: f64) -> RouterTables {
    router_tables_from_edges(
        &[(0.0, 0.0), (1.0, 1.0)],
        &[(1, 2, distance_m, duration_s)],
        vec![1],
    )
}

/// A chain of `node_count` nodes, each hop taking `hop_duration_s` /
/// `hop_distance_m`. Useful for schedules with several distinct stops.
pub fn line_router_tables(node_count: usize, hop_duration_s: f64, hop_distance_m: f64) -> RouterTables {
    let positions: Vec<(f64, f64)> = (0..node_count).map(|i| (i as f64, 0.0)).collect();
    let edges: Vec<(usize, usize, f64, f64)> = (1..node_count)
        .map(|i| (i, i + 1, hop_distance_m, hop_duration_s))
        .collect();
    router_tables_from_edges(&positions, &edges, vec![1])
}

/// An `n x n` 4-connected grid, 100 m / 10 s per hop. Stations are seeded
/// along the first row.
pub fn grid_router_tables(n: usize) -> RouterTables {
    let mut positions = Vec::with_capacity(n * n);
    for row in 0..n {
        for col in 0..n {
            positions.push((col as f64 * 0.001, row as f64 * 0.001));
        }
    }
    let id = |row: usize, col: usize| row * n + col + 1;
    let mut edges = Vec::new();
    for row in 0..n {
        for col in 0..n {
            if col + 1 < n {
                edges.push((id(row, col), id(row, col + 1), 100.0, 10.0));
            }
            if row + 1 < n {
                edges.push((id(row, col), id(row + 1, col), 100.0, 10.0));
            }
        }
    }
    let stations = (0..n).map(|col| id(0, col)).collect();
    router_tables_from_edges(&positions, &edges, stations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use crate::types::RoutingType;

    #[test]
    fn two_node_table_gives_exact_direct_time() {
        let router = Router::new(two_node_router_tables(300.0, 3000.0)).unwrap();
        let a = router.node_pos(1);
        let b = router.node_pos(2);
        let route = router.route(a, b, RoutingType::TimeOnly);
        assert_eq!(route.duration_ms, 300_000);
        assert_eq!(route.distance_mm, 3_000_000);
    }

    #[test]
    fn line_table_accumulates_hops() {
        let router = Router::new(line_router_tables(4, 10.0, 100.0)).unwrap();
        let a = router.node_pos(1);
        let d = router.node_pos(4);
        let route = router.route(a, d, RoutingType::TimeOnly);
        assert_eq!(route.duration_ms, 30_000);
        assert_eq!(route.distance_mm, 300_000);
    }
}
