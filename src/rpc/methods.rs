//! The RPC method handlers.
//!
//! Every handler fills the result object and returns `Ok(())`, or
//! returns the error that becomes the response envelope. Handlers
//! capture the graph read guard and the algorithm snapshot once and hold
//! them for the duration of the call.

use serde_json::{json, Map, Value};

use crate::error::{Result, RpcError};
use crate::graph::GraphView;
use crate::graph_columns::{project_graph_column, GRAPH_ALGORITHM_NAME, GRAPH_COLUMN_NAMES};
use crate::projection::{project, AddressMode, SampleOpts, SortOrder};
use crate::session::SessionCtx;
use crate::subgraph::shortest_path_subgraph;

use super::params::{
    parse, BfsParams, DataArrayParams, DataArrayRangeParams, DataArraySetParams,
    DataArraySortedParams, DescriptionParams, RegisterParams, RequestParams,
};
use super::ServerState;

fn graph_handle(
    state: &ServerState,
) -> Result<std::sync::Arc<std::sync::RwLock<crate::graph::MemGraph>>> {
    state
        .graph()
        .ok_or_else(|| RpcError::Internal("graph handle is not available".to_string()))
}

pub fn get_graph_stats(state: &ServerState, out: &mut Map<String, Value>) -> Result<()> {
    let graph = graph_handle(state)?;
    let graph = graph.read().unwrap();
    let nv = graph.vertex_count();
    out.insert("vertices".to_string(), json!(nv));
    out.insert("edges".to_string(), json!(graph.edge_count_up_to(nv)));
    Ok(())
}

pub fn breadth_first_search(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: BfsParams = parse(params)?;
    let graph = graph_handle(state)?;
    let graph = graph.read().unwrap();

    let source = p.source.resolve(&*graph)?;
    let target = p.target.resolve(&*graph)?;

    let edges = shortest_path_subgraph(&*graph, source, target);
    out.insert(
        "subgraph".to_string(),
        json!(edges.iter().map(|&(s, d)| json!([s, d])).collect::<Vec<_>>()),
    );
    if p.strings {
        let named: Vec<Value> = edges
            .iter()
            .map(|&(s, d)| {
                json!([
                    graph.name_of(s).unwrap_or_default(),
                    graph.name_of(d).unwrap_or_default()
                ])
            })
            .collect();
        out.insert("subgraph_str".to_string(), json!(named));
    }
    Ok(())
}

pub fn get_algorithms(state: &ServerState, out: &mut Map<String, Value>) -> Result<()> {
    let mut names = state.algorithm_names();
    names.push(GRAPH_ALGORITHM_NAME.to_string());
    out.insert("algorithms".to_string(), json!(names));
    Ok(())
}

pub fn get_data_description(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: DescriptionParams = parse(params)?;
    let names = if p.name == GRAPH_ALGORITHM_NAME {
        GRAPH_COLUMN_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        let alg = state
            .algorithm(&p.name)
            .ok_or_else(|| RpcError::AlgorithmNotRunning(p.name.clone()))?;
        alg.schema()?.names()
    };
    out.insert("alg_data".to_string(), json!(names));
    Ok(())
}

/// Addressing requested by one of the four data-array methods, before
/// vertex counts are known.
enum ModeSpec {
    Full,
    Range { offset: i64, count: i64 },
    Sorted { offset: i64, count: i64, order: SortOrder },
    Set(Vec<i64>),
}

impl ModeSpec {
    /// Bind the spec to a vertex count, producing the concrete mode and
    /// the sample count the stride conversion is based on.
    fn bind(&self, nv: i64) -> (AddressMode<'_>, i64) {
        match self {
            ModeSpec::Full => (AddressMode::Range { start: 0, end: nv }, nv),
            ModeSpec::Range { offset, count } => (
                AddressMode::Range {
                    start: *offset,
                    end: offset.saturating_add(*count),
                },
                *count,
            ),
            ModeSpec::Sorted {
                offset,
                count,
                order,
            } => (
                AddressMode::Sorted {
                    start: *offset,
                    end: offset.saturating_add(*count),
                    order: *order,
                },
                *count,
            ),
            ModeSpec::Set(vertices) => (AddressMode::Set { vertices }, 0),
        }
    }
}

/// Shared worker for the four data-array methods: route to the graph
/// column adapter or to an algorithm snapshot, convert a sample count to
/// a stride, project, and mount the projection under the column name.
fn run_projection(
    state: &ServerState,
    algorithm: &str,
    column: &str,
    spec: ModeSpec,
    strings: bool,
    stride: i64,
    samples: i64,
    log_scale: bool,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let projection = if algorithm == GRAPH_ALGORITHM_NAME {
        let graph = graph_handle(state)?;
        let graph = graph.read().unwrap();
        let (mode, count_basis) = spec.bind(graph.vertex_count());
        let stride = stride_for(stride, samples, count_basis);
        project_graph_column(
            &*graph,
            mode,
            column,
            SampleOpts { stride, log_scale },
            strings,
        )?
    } else {
        let alg = state
            .algorithm(algorithm)
            .ok_or_else(|| RpcError::AlgorithmNotRunning(algorithm.to_string()))?;
        let schema = alg.schema()?;
        let (mode, count_basis) = spec.bind(alg.vertex_count);
        let stride = stride_for(stride, samples, count_basis);

        let graph = state.graph();
        let guard = graph.as_ref().map(|g| g.read().unwrap());
        let graph_view: Option<&dyn GraphView> = guard.as_ref().map(|g| &**g as &dyn GraphView);

        project(
            &schema,
            &alg.data,
            alg.vertex_count,
            graph_view,
            mode,
            column,
            SampleOpts { stride, log_scale },
            strings,
        )?
    };

    let value = serde_json::to_value(&projection)
        .map_err(|e| RpcError::Internal(e.to_string()))?;
    out.insert(column.to_string(), value);
    Ok(())
}

/// A requested sample count overrides the stride: `ceil(count / samples)`.
fn stride_for(stride: i64, samples: i64, count: i64) -> i64 {
    if samples > 0 {
        (count + samples - 1) / samples
    } else {
        stride
    }
}

pub fn get_data_array(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: DataArrayParams = parse(params)?;
    run_projection(
        state,
        &p.name,
        &p.data,
        ModeSpec::Full,
        p.strings,
        p.stride,
        p.samples,
        p.log_scale,
        out,
    )
}

pub fn get_data_array_range(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: DataArrayRangeParams = parse(params)?;
    run_projection(
        state,
        &p.array.name,
        &p.array.data,
        ModeSpec::Range {
            offset: p.offset,
            count: p.count,
        },
        p.array.strings,
        p.array.stride,
        p.array.samples,
        p.array.log_scale,
        out,
    )
}

pub fn get_data_array_sorted_range(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: DataArraySortedParams = parse(params)?;
    let order = SortOrder::parse(&p.order)?;
    run_projection(
        state,
        &p.range.array.name,
        &p.range.array.data,
        ModeSpec::Sorted {
            offset: p.range.offset,
            count: p.range.count,
            order,
        },
        p.range.array.strings,
        p.range.array.stride,
        p.range.array.samples,
        p.range.array.log_scale,
        out,
    )
}

pub fn get_data_array_set(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: DataArraySetParams = parse(params)?;
    run_projection(
        state,
        &p.name,
        &p.data,
        ModeSpec::Set(p.set),
        p.strings,
        1,
        0,
        false,
        out,
    )
}

pub fn register(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: RegisterParams = parse(params.clone())?;

    let graph = state.graph();
    let guard = graph.as_ref().map(|g| g.read().unwrap());
    let graph_view: Option<&dyn GraphView> = guard.as_ref().map(|g| &**g as &dyn GraphView);
    let ctx = SessionCtx {
        graph: graph_view,
        strings: false,
    };

    state
        .sessions
        .register(&p.kind, params.as_ref(), &ctx, out)?;
    Ok(())
}

pub fn request(
    state: &ServerState,
    params: Option<Value>,
    out: &mut Map<String, Value>,
) -> Result<()> {
    let p: RequestParams = parse(params)?;

    let graph = state.graph();
    let guard = graph.as_ref().map(|g| g.read().unwrap());
    let graph_view: Option<&dyn GraphView> = guard.as_ref().map(|g| &**g as &dyn GraphView);
    let ctx = SessionCtx {
        graph: graph_view,
        strings: p.strings,
    };

    state.sessions.request(p.session_id, &ctx, out)
}
