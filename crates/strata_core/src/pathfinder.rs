//! Path finding over the hex grid.
//!
//! Best-first search (Dijkstra with an L1 lower-bound heuristic) over an
//! edge-weight closure, producing the full list of step coordinates from
//! source to target inclusive.  Ties between equal-cost expansions break
//! on the lexicographic coordinate order, so the resulting path is fully
//! deterministic.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap};

use crate::hex::HexCoord;
use crate::map::DistanceT;

/// Default bound on the number of expanded search nodes.
pub const DEFAULT_NODE_BUDGET: usize = 100_000;

/// Edge weights for path finding.
///
/// Returns the travel cost from one tile to a neighbouring tile, or
/// `None` when the step is impossible.
pub trait EdgeWeight {
    /// Cost of stepping from `from` onto `to`.
    fn weight(&self, from: HexCoord, to: HexCoord) -> Option<DistanceT>;
}

impl<F> EdgeWeight for F
where
    F: Fn(HexCoord, HexCoord) -> Option<DistanceT>,
{
    fn weight(&self, from: HexCoord, to: HexCoord) -> Option<DistanceT> {
        self(from, to)
    }
}

/// Find the cheapest path from `source` to `target`.
///
/// Returns the step list including both endpoints, or `None` when no
/// path exists within the node budget.
#[must_use]
pub fn find_path<E: EdgeWeight>(
    edges: &E,
    source: HexCoord,
    target: HexCoord,
    node_budget: usize,
) -> Option<Vec<HexCoord>> {
    if source == target {
        return Some(vec![source]);
    }

    // Every edge costs at least one movement point, so the plain L1
    // distance is an admissible lower bound.
    let heuristic = |c: HexCoord| HexCoord::distance_l1(c, target) as u64;

    let mut dist: BTreeMap<HexCoord, u64> = BTreeMap::new();
    let mut came_from: BTreeMap<HexCoord, HexCoord> = BTreeMap::new();
    // Min-heap on (f-score, coordinate); the coordinate doubles as the
    // deterministic tie-breaker.
    let mut open: BinaryHeap<Reverse<(u64, HexCoord)>> = BinaryHeap::new();

    dist.insert(source, 0);
    open.push(Reverse((heuristic(source), source)));

    let mut expanded = 0usize;
    while let Some(Reverse((f, current))) = open.pop() {
        let current_dist = dist[&current];
        if f > current_dist + heuristic(current) {
            // Stale queue entry.
            continue;
        }

        if current == target {
            let mut path = vec![current];
            let mut at = current;
            while let Some(&prev) = came_from.get(&at) {
                path.push(prev);
                at = prev;
            }
            path.reverse();
            return Some(path);
        }

        expanded += 1;
        if expanded > node_budget {
            tracing::debug!(%source, %target, "path search exceeded node budget");
            return None;
        }

        for next in current.neighbours() {
            let Some(w) = edges.weight(current, next) else {
                continue;
            };
            let tentative = current_dist + u64::from(w);
            if dist.get(&next).map_or(true, |&d| tentative < d) {
                dist.insert(next, tentative);
                came_from.insert(next, current);
                open.push(Reverse((tentative + heuristic(next), next)));
            }
        }
    }

    None
}
