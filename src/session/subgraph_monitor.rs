//! Built-in session kind: watch the induced subgraph of a vertex set.
//!
//! Registration returns the edges currently present among the tracked
//! vertices; each later poll drains the edge insertions and deletions
//! that touched the set (both endpoints inside it) since the last poll.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, RpcError};
use crate::graph::{GraphView, UpdateBatch};
use crate::projection::name_or_empty;

use super::{Session, SessionCtx};

#[derive(Debug, Deserialize)]
struct MonitorParams {
    vertices: Vec<i64>,
}

/// Session state: the tracked set plus the not-yet-drained deltas.
#[derive(Debug, Default)]
pub struct SubgraphMonitor {
    vertices: HashSet<i64>,
    inserted: Vec<(i64, i64)>,
    removed: Vec<(i64, i64)>,
}

impl SubgraphMonitor {
    pub fn boxed() -> Box<dyn Session> {
        Box::new(SubgraphMonitor::default())
    }

    fn tracks(&self, src: i64, dst: i64) -> bool {
        self.vertices.contains(&src) && self.vertices.contains(&dst)
    }

    fn induced_edges(&self, graph: &dyn GraphView) -> Vec<(i64, i64)> {
        let mut sorted: Vec<i64> = self.vertices.iter().copied().collect();
        sorted.sort_unstable();
        let mut edges = Vec::new();
        for &v in &sorted {
            for d in graph.edges_from(v) {
                if self.vertices.contains(&d) {
                    edges.push((v, d));
                }
            }
        }
        edges
    }
}

fn edge_pairs(edges: &[(i64, i64)]) -> Value {
    json!(edges.iter().map(|&(s, d)| json!([s, d])).collect::<Vec<_>>())
}

fn edge_name_pairs(edges: &[(i64, i64)], graph: Option<&dyn GraphView>) -> Value {
    json!(edges
        .iter()
        .map(|&(s, d)| json!([name_or_empty(graph, s), name_or_empty(graph, d)]))
        .collect::<Vec<_>>())
}

impl Session for SubgraphMonitor {
    fn bind_params(&mut self, params: Option<&Value>) -> Result<()> {
        let params = params.ok_or_else(|| {
            RpcError::InvalidParams("missing session parameters".to_string())
        })?;
        let parsed: MonitorParams = serde_json::from_value(params.clone())
            .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
        if parsed.vertices.is_empty() {
            return Err(RpcError::InvalidParams("vertex set is empty".to_string()));
        }
        self.vertices = parsed.vertices.into_iter().collect();
        Ok(())
    }

    fn on_register(&mut self, ctx: &SessionCtx<'_>, out: &mut Map<String, Value>) {
        let edges = match ctx.graph {
            Some(graph) => self.induced_edges(graph),
            None => Vec::new(),
        };
        out.insert("subgraph".to_string(), edge_pairs(&edges));
        if ctx.strings {
            out.insert(
                "subgraph_str".to_string(),
                edge_name_pairs(&edges, ctx.graph),
            );
        }
    }

    fn on_request(&mut self, ctx: &SessionCtx<'_>, out: &mut Map<String, Value>) {
        out.insert("insertions".to_string(), edge_pairs(&self.inserted));
        out.insert("deletions".to_string(), edge_pairs(&self.removed));
        if ctx.strings {
            out.insert(
                "insertions_str".to_string(),
                edge_name_pairs(&self.inserted, ctx.graph),
            );
            out.insert(
                "deletions_str".to_string(),
                edge_name_pairs(&self.removed, ctx.graph),
            );
        }
        self.inserted.clear();
        self.removed.clear();
    }

    fn on_update(&mut self, batch: &UpdateBatch) {
        for &(src, dst) in &batch.insertions {
            if self.tracks(src, dst) {
                self.inserted.push((src, dst));
            }
        }
        for &(src, dst) in &batch.deletions {
            if self.tracks(src, dst) {
                self.removed.push((src, dst));
            }
        }
    }
}
