//! Graph column adapter: projections served straight from the graph.
//!
//! Five pseudo-columns are computed on demand from the graph handle
//! instead of an algorithm buffer. The sampling, sorting, set, and
//! log-scale behavior is identical to the buffer-backed engine; only the
//! per-vertex value source differs. The reserved algorithm name
//! `"stinger"` routes here.

use crate::error::{Result, RpcError};
use crate::graph::GraphView;
use crate::projection::{
    assemble, name_or_empty, resolve_walk, sort_permutation, AddressMode, ColumnValues,
    Projection, SampleOpts,
};

/// Reserved algorithm name served by this adapter.
pub const GRAPH_ALGORITHM_NAME: &str = "stinger";

/// The adapter's virtual schema, in its published order.
pub const GRAPH_COLUMN_NAMES: [&str; 5] = [
    "vertex_weight",
    "vertex_type_num",
    "vertex_type_name",
    "vertex_indegree",
    "vertex_outdegree",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GraphColumn {
    Weight,
    TypeNum,
    TypeName,
    InDegree,
    OutDegree,
}

impl GraphColumn {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "vertex_weight" => Some(GraphColumn::Weight),
            "vertex_type_num" => Some(GraphColumn::TypeNum),
            "vertex_type_name" => Some(GraphColumn::TypeName),
            "vertex_indegree" => Some(GraphColumn::InDegree),
            "vertex_outdegree" => Some(GraphColumn::OutDegree),
            _ => None,
        }
    }

    /// Numeric sort key. The type-name column orders by type number, the
    /// same key its numeric sibling uses.
    fn key(&self, graph: &dyn GraphView, v: i64) -> i64 {
        match self {
            GraphColumn::Weight => graph.weight(v),
            GraphColumn::TypeNum | GraphColumn::TypeName => graph.type_num(v),
            GraphColumn::InDegree => graph.in_degree(v),
            GraphColumn::OutDegree => graph.out_degree(v),
        }
    }
}

/// Project one pseudo-column of the graph itself.
pub fn project_graph_column(
    graph: &dyn GraphView,
    mode: AddressMode<'_>,
    column: &str,
    opts: SampleOpts,
    strings: bool,
) -> Result<Projection> {
    let nv = graph.vertex_count();
    let walk = resolve_walk(&mode, nv, opts, true, strings)?;

    let col = GraphColumn::parse(column)
        .ok_or_else(|| RpcError::ColumnUnknown(column.to_string()))?;

    let idx = match &mode {
        AddressMode::Sorted { order, .. } => Some(sort_permutation(nv, *order, |a, b| {
            col.key(graph, a).cmp(&col.key(graph, b))
        })),
        _ => None,
    };

    let empty = match col {
        GraphColumn::TypeName => ColumnValues::Text(Vec::new()),
        _ => ColumnValues::Int(Vec::new()),
    };

    Ok(assemble(
        &mode,
        &walk,
        idx,
        strings,
        empty,
        |vtx, out| match out {
            ColumnValues::Text(v) => {
                let name = graph.type_name(graph.type_num(vtx)).unwrap_or_default();
                v.push(name.to_string());
            }
            ColumnValues::Int(v) => v.push(col.key(graph, vtx)),
            ColumnValues::Float(_) => {}
        },
        |vtx| name_or_empty(Some(graph), vtx),
    ))
}
