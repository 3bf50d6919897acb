//! L6: matches vehicles to VT-pairs by maximum-weight bipartite matching.
//!
//! The exact formulation (an ILP: one binary variable per VT-pair plus a
//! per-order "leave unserved" slack) doesn't reduce cleanly to bipartite
//! matching once trips overlap in orders, so this is a deliberate
//! redesign: Kuhn-Munkres over a vehicle × trip-group matrix, a disjointness
//! repair pass to restore the order-coverage constraint the matrix can't
//! express on its own, then a picking-order repair pass for preserve_picking.
//! Small batches skip straight to the greedy heuristic, which already
//! enforces disjointness by construction.

use std::collections::{HashMap, HashSet};

use pathfinding::kuhn_munkres::{kuhn_munkres, Weights};

use crate::schedule::VtPair;
use crate::types::{OrderId, VehicleId};

/// Below this many candidate pairs, Kuhn-Munkres's O(n^3) cost isn't worth
/// it; greedy selection is fast and, for small batches, close enough.
const GREEDY_THRESHOLD_PAIRS: usize = 200;

/// Scales a float score into the fixed-point weight Kuhn-Munkres sums.
const SCALE: f64 = 1_000_000.0;

/// Sentinel for a vehicle × trip-group cell with no matching VT-pair.
/// Feasible scores are bounded well above this; see `score_vt_pairs`.
const INFEASIBLE: i64 = -1_000_000_000_000_i64;

struct I64Weights(Vec<Vec<i64>>);

impl Weights<i64> for I64Weights {
    fn rows(&self) -> usize {
        self.0.len()
    }

    fn columns(&self) -> usize {
        self.0.first().map_or(0, |r| r.len())
    }

    fn at(&self, row: usize, col: usize) -> i64 {
        self.0[row][col]
    }

    fn neg(&self) -> Self {
        I64Weights(self.0.iter().map(|r| r.iter().map(|&x| x.saturating_neg()).collect()).collect())
    }
}

fn score_to_weight(score: f64) -> i64 {
    let w = score * SCALE;
    if w >= i64::MAX as f64 {
        i64::MAX
    } else if w <= i64::MIN as f64 {
        i64::MIN
    } else {
        w as i64
    }
}

/// Selects, for `vt_pairs` (assumed already scored), the indices of the
/// subset to commit: one per vehicle, covering every order at most once,
/// and never leaving a currently-PICKING order uncovered.
///
/// `picking_order_owner` maps every currently-PICKING order to the vehicle
/// that holds its PICKUP waypoint at the start of this epoch (before this
/// dispatch's commits), so the repair pass below has a safe, single vehicle
/// to fall back to for each order instead of searching globally.
pub fn assign(vt_pairs: &[VtPair], picking_order_owner: &HashMap<OrderId, VehicleId>) -> Vec<usize> {
    if vt_pairs.is_empty() {
        return Vec::new();
    }

    // Below the threshold, greedy is cheap and used directly. Above it, a
    // solver failure degrades to "leave vehicles unchanged" (an empty
    // selection) rather than to greedy, since greedy re-derives its own
    // disjointness guarantees from scratch and could reassign a picking
    // order unsafely if the matrix build itself is what failed.
    let mut selected = if vt_pairs.len() < GREEDY_THRESHOLD_PAIRS {
        greedy_assignment(vt_pairs)
    } else {
        hungarian_assignment(vt_pairs).unwrap_or_else(|| {
            eprintln!("assigner: solver found no feasible matching over {} VT-pairs; leaving vehicles unchanged this epoch", vt_pairs.len());
            Vec::new()
        })
    };

    repair_picking_orders(vt_pairs, picking_order_owner, &mut selected);
    selected
}

/// Mirrors the reference greedy assignment: sort candidates by (fewest
/// orders covered is worst, cheapest marginal cost is best), then take
/// pairs in that order as long as neither their vehicle nor any of their
/// orders has already been claimed.
fn greedy_assignment(vt_pairs: &[VtPair]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..vt_pairs.len()).collect();
    order.sort_by(|&a, &b| {
        let by_trip_size = vt_pairs[b].trip_ids.len().cmp(&vt_pairs[a].trip_ids.len());
        by_trip_size.then(vt_pairs[a].best_schedule_cost_ms.cmp(&vt_pairs[b].best_schedule_cost_ms))
    });

    let mut selected_vehicles = HashSet::new();
    let mut selected_orders = HashSet::new();
    let mut selected = Vec::new();
    for idx in order {
        let vt = &vt_pairs[idx];
        if selected_vehicles.contains(&vt.vehicle_id) {
            continue;
        }
        if vt.trip_ids.iter().any(|id| selected_orders.contains(id)) {
            continue;
        }
        selected_vehicles.insert(vt.vehicle_id);
        selected_orders.extend(vt.trip_ids.iter().copied());
        selected.push(idx);
    }
    selected
}

/// Builds the vehicle × trip-group matrix and solves it with Kuhn-Munkres.
/// Columns are the distinct non-empty trip-id sets across every vehicle's
/// candidates, plus one private column per vehicle holding its own
/// best zero-trip-ids-or-better fallback, which guarantees every vehicle has
/// at least one feasible column and `rows <= columns` always holds.
fn hungarian_assignment(vt_pairs: &[VtPair]) -> Option<Vec<usize>> {
    let mut vehicle_ids: Vec<VehicleId> = vt_pairs.iter().map(|vt| vt.vehicle_id).collect();
    vehicle_ids.sort_by_key(|v| v.0);
    vehicle_ids.dedup();
    if vehicle_ids.is_empty() {
        return None;
    }
    let row_of_vehicle: HashMap<VehicleId, usize> = vehicle_ids.iter().enumerate().map(|(r, &v)| (v, r)).collect();

    let mut trip_groups: Vec<Vec<OrderId>> = Vec::new();
    let mut col_of_trip: HashMap<Vec<OrderId>, usize> = HashMap::new();
    for vt in vt_pairs {
        if vt.trip_ids.is_empty() {
            continue;
        }
        col_of_trip.entry(vt.trip_ids.clone()).or_insert_with(|| {
            trip_groups.push(vt.trip_ids.clone());
            trip_groups.len() - 1
        });
    }
    let num_trip_cols = trip_groups.len();
    let num_cols = num_trip_cols + vehicle_ids.len();

    let mut matrix = vec![vec![INFEASIBLE; num_cols]; vehicle_ids.len()];
    // best_idx[row][col] tracks which vt_pairs entry produced the winning
    // score in that cell, so the selected columns can be mapped back.
    let mut best_idx = vec![vec![usize::MAX; num_cols]; vehicle_ids.len()];

    for (i, vt) in vt_pairs.iter().enumerate() {
        let row = row_of_vehicle[&vt.vehicle_id];
        let col = if vt.trip_ids.is_empty() {
            num_trip_cols + row
        } else {
            match col_of_trip.get(&vt.trip_ids) {
                Some(&c) => c,
                None => continue,
            }
        };
        let weight = score_to_weight(vt.score);
        if weight > matrix[row][col] {
            matrix[row][col] = weight;
            best_idx[row][col] = i;
        }
    }
    // A vehicle's private column must never be reachable by another
    // vehicle: clear any accidental fill (there shouldn't be any, since
    // empty trip_ids always map to the owning vehicle's own row).
    for row in 0..vehicle_ids.len() {
        for other_row in 0..vehicle_ids.len() {
            if other_row != row {
                matrix[other_row][num_trip_cols + row] = INFEASIBLE;
            }
        }
    }

    let weights = I64Weights(matrix);
    let has_feasible_row = (0..weights.rows()).all(|r| (0..weights.columns()).any(|c| weights.at(r, c) > INFEASIBLE));
    if !has_feasible_row {
        return None;
    }

    let (_total, assignment) = kuhn_munkres(&weights);
    let mut selected = Vec::with_capacity(assignment.len());
    for (row, &col) in assignment.iter().enumerate() {
        let idx = best_idx[row][col];
        if idx != usize::MAX {
            selected.push(idx);
        }
    }
    Some(selected)
}

/// Ensures every currently-PICKING order survives in the final selection.
/// Kuhn-Munkres's matrix can't express "order r appears in at most one of
/// these overlapping columns", so this both deduplicates any order claimed
/// by more than one selected pair and guarantees no PICKING order is
/// dropped, by reverting the responsible vehicle to its own best pair that
/// still contains that order (present by construction: every vehicle
/// carries forward a cost-0 candidate retaining its current trip).
///
/// `picking_order_owner` maps each PICKING order to the one vehicle that
/// held its PICKUP waypoint before this epoch's dispatch. The fallback
/// search below is restricted to that vehicle's own candidates: that
/// vehicle's self-pair (spec's null option (b)) is guaranteed to retain the
/// order, and searching only there means restoring one dropped order can
/// never evict a *different* PICKING order that another vehicle legitimately
/// won. Orders are processed in a fixed (sorted) order so the repair is
/// deterministic regardless of hash-map iteration order.
fn repair_picking_orders(vt_pairs: &[VtPair], picking_order_owner: &HashMap<OrderId, VehicleId>, selected: &mut Vec<usize>) {
    selected.sort_by(|&a, &b| vt_pairs[b].score.partial_cmp(&vt_pairs[a].score).unwrap());

    let mut claimed_orders: HashSet<OrderId> = HashSet::new();
    let mut claimed_vehicles: HashSet<VehicleId> = HashSet::new();
    let mut kept = Vec::with_capacity(selected.len());
    for &idx in selected.iter() {
        let vt = &vt_pairs[idx];
        if claimed_vehicles.contains(&vt.vehicle_id) {
            continue;
        }
        if vt.trip_ids.iter().any(|id| claimed_orders.contains(id)) {
            continue;
        }
        claimed_vehicles.insert(vt.vehicle_id);
        claimed_orders.extend(vt.trip_ids.iter().copied());
        kept.push(idx);
    }

    let mut picking_ids: Vec<OrderId> = picking_order_owner.keys().copied().collect();
    picking_ids.sort_unstable_by_key(|id| id.0);

    for picking_id in picking_ids {
        if claimed_orders.contains(&picking_id) {
            continue;
        }
        // This order's own vehicle didn't end up with a kept pair covering
        // it (e.g. its column lost out in the matrix, or got dropped above
        // for overlapping with a higher-score pair). Find the best pair on
        // that same owning vehicle that still retains the order and force
        // it in, evicting whatever that pair's vehicle and orders had
        // previously claimed.
        let owner_vehicle_id = picking_order_owner[&picking_id];
        let fallback = vt_pairs
            .iter()
            .enumerate()
            .filter(|(_, vt)| vt.vehicle_id == owner_vehicle_id && vt.trip_ids.contains(&picking_id))
            .max_by(|(_, a), (_, b)| a.score.partial_cmp(&b.score).unwrap());
        let Some((fallback_idx, fallback_vt)) = fallback else {
            continue;
        };

        kept.retain(|&idx| {
            let kept_vt = &vt_pairs[idx];
            kept_vt.vehicle_id != fallback_vt.vehicle_id
                && !kept_vt.trip_ids.iter().any(|id| fallback_vt.trip_ids.contains(id))
        });
        kept.push(fallback_idx);

        claimed_vehicles.clear();
        claimed_orders.clear();
        for &idx in &kept {
            claimed_vehicles.insert(vt_pairs[idx].vehicle_id);
            claimed_orders.extend(vt_pairs[idx].trip_ids.iter().copied());
        }
    }

    *selected = kept;
}
