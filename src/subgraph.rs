//! Shortest-path subgraph extraction between two vertices.
//!
//! Two phases: a forward level-synchronous BFS from the source until the
//! target's level is complete, then a reverse reconstruction from the
//! target that keeps exactly the edges sitting on some shortest path.
//! The result is an edge list oriented target-to-source in traversal
//! order. Edges lying on several shortest paths may appear more than
//! once; emission order follows the graph handle's neighbor order.

use std::collections::{HashSet, VecDeque};

use crate::graph::GraphView;

/// Collect every edge on a shortest path from `source` to `target`.
///
/// Returns an empty list when either endpoint has no out-edges, when the
/// target is unreachable, or when the endpoints coincide. The scratch
/// found bitmap is sized from the vertex count observed at entry, so
/// vertices added concurrently are treated as unreachable.
pub fn shortest_path_subgraph(
    graph: &dyn GraphView,
    source: i64,
    target: i64,
) -> Vec<(i64, i64)> {
    let nv = graph.vertex_count();
    if source < 0 || source >= nv || target < 0 || target >= nv {
        return Vec::new();
    }
    if graph.out_degree(source) == 0 || graph.out_degree(target) == 0 {
        return Vec::new();
    }

    let mut found = vec![false; nv as usize];
    found[source as usize] = true;

    let mut levels: Vec<HashSet<i64>> = Vec::new();
    levels.push(HashSet::from([source]));

    // Phase 1: expand level by level until the target is marked found or
    // the frontier goes empty.
    loop {
        if found[target as usize] {
            break;
        }
        let cur = match levels.last() {
            Some(level) if !level.is_empty() => level,
            _ => break,
        };
        let mut next = HashSet::new();
        for &v in cur {
            for d in graph.edges_from(v) {
                if d >= 0 && d < nv && !found[d as usize] {
                    found[d as usize] = true;
                    next.insert(d);
                }
            }
        }
        levels.push(next);
    }

    if !found[target as usize] {
        return Vec::new();
    }

    // Phase 2: walk the levels backwards. The last level contained the
    // target and is dropped; the target's neighbors in the level below
    // seed the frontier.
    let mut edges: Vec<(i64, i64)> = Vec::new();
    levels.pop();
    let cur = match levels.last() {
        Some(level) => level,
        None => return edges,
    };

    let mut frontier: VecDeque<i64> = VecDeque::new();
    for d in graph.edges_from(target) {
        if cur.contains(&d) {
            frontier.push_back(d);
            edges.push((target, d));
        }
    }
    levels.pop();

    while let Some(cur) = levels.pop() {
        let mut next_frontier = VecDeque::new();
        while let Some(v) = frontier.pop_front() {
            for d in graph.edges_from(v) {
                if cur.contains(&d) {
                    next_frontier.push_back(d);
                    edges.push((v, d));
                }
            }
        }
        frontier = next_frontier;
    }

    edges
}
