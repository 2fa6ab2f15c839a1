//! End-to-end scenarios through the dispatch entry point.
//!
//! Each test drives the same `{method, params}` envelopes a client would
//! send and asserts on the serialized response shape.

use serde_json::{json, Value};

use sgdb::session::SubgraphMonitor;
use sgdb::{AlgorithmState, MemGraph, Request, ServerState};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn call(state: &ServerState, method: &str, params: Value) -> Value {
    let request = Request {
        method: method.to_string(),
        params: if params.is_null() { None } else { Some(params) },
    };
    let response = sgdb::dispatch(state, request);
    serde_json::to_value(&response).unwrap()
}

fn result(state: &ServerState, method: &str, params: Value) -> Value {
    let v = call(state, method, params);
    assert!(
        v.get("result").is_some(),
        "expected result, got {}",
        v
    );
    v["result"].clone()
}

fn error_code(state: &ServerState, method: &str, params: Value) -> i64 {
    let v = call(state, method, params);
    assert!(v.get("error").is_some(), "expected error, got {}", v);
    v["error"]["code"].as_i64().unwrap()
}

fn f32_buffer(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn as_f32s(value: &Value) -> Vec<f32> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_f64().unwrap() as f32)
        .collect()
}

/// Three vertices with a pagerank-style f32 column [0.1, 0.4, 0.5] and
/// out-degrees [3, 1, 2].
fn projection_state() -> ServerState {
    let mut g = MemGraph::new();
    for name in ["v0", "v1", "v2"] {
        g.add_named_vertex(name);
    }
    g.add_edge(0, 1);
    g.add_edge(0, 2);
    g.add_edge(0, 0);
    g.add_edge(1, 0);
    g.add_edge(2, 0);
    g.add_edge(2, 1);

    let state = ServerState::with_graph(g);
    state.publish_algorithm(AlgorithmState::new(
        "pr",
        "fmt pagerank",
        f32_buffer(&[0.1, 0.4, 0.5]),
        3,
    ));
    state
}

// ---------------------------------------------------------------------------
// Scenario 1: graph statistics
// ---------------------------------------------------------------------------

#[test]
fn stats_counts_vertices_and_edges() {
    let mut g = MemGraph::new();
    g.ensure_vertex(3);
    g.add_edge(0, 1);
    g.add_edge(0, 2);
    g.add_edge(1, 2);
    g.add_edge(2, 3);
    g.add_edge(3, 0);

    let state = ServerState::with_graph(g);
    let r = result(&state, "get_graph_stats", Value::Null);
    assert_eq!(r, json!({"vertices": 4, "edges": 5}));
}

#[test]
fn stats_without_graph_is_internal_error() {
    let state = ServerState::new();
    assert_eq!(error_code(&state, "get_graph_stats", Value::Null), -32603);
}

// ---------------------------------------------------------------------------
// Scenario 2: breadth-first search
// ---------------------------------------------------------------------------

#[test]
fn bfs_direct_predecessors_on_shortest_paths() {
    // Undirected triangle: the only shortest path 0..2 is the direct
    // edge, so the subgraph is the single reversed edge [2, 0].
    let mut g = MemGraph::new();
    for (a, b) in [(0, 1), (1, 2), (0, 2)] {
        g.add_edge(a, b);
        g.add_edge(b, a);
    }
    let state = ServerState::with_graph(g);

    let r = result(
        &state,
        "breadth_first_search",
        json!({"source": 0, "target": 2}),
    );
    assert_eq!(r["subgraph"], json!([[2, 0]]));
    assert!(r.get("subgraph_str").is_none());
}

#[test]
fn bfs_directed_triangle_has_no_back_edges() {
    // With only forward edges the target's out-edges never reach the
    // previous level, so reconstruction finds nothing.
    let mut g = MemGraph::new();
    g.add_edge(0, 1);
    g.add_edge(1, 2);
    g.add_edge(0, 2);
    // target needs an out-edge at all to get past the degenerate check
    g.add_edge(2, 2);
    let state = ServerState::with_graph(g);

    let r = result(
        &state,
        "breadth_first_search",
        json!({"source": 0, "target": 2}),
    );
    assert_eq!(r["subgraph"], json!([]));
}

#[test]
fn bfs_zero_outdegree_returns_empty_success() {
    let mut g = MemGraph::new();
    g.add_edge(0, 1);
    let state = ServerState::with_graph(g);

    let r = result(
        &state,
        "breadth_first_search",
        json!({"source": 0, "target": 1}),
    );
    assert_eq!(r["subgraph"], json!([]));
}

#[test]
fn bfs_resolves_vertex_names_and_returns_strings() {
    let mut g = MemGraph::new();
    let a = g.add_named_vertex("a");
    let b = g.add_named_vertex("b");
    let c = g.add_named_vertex("c");
    for (s, d) in [(a, b), (b, c)] {
        g.add_edge(s, d);
        g.add_edge(d, s);
    }
    let state = ServerState::with_graph(g);

    let r = result(
        &state,
        "breadth_first_search",
        json!({"source": "a", "target": "c", "strings": true}),
    );
    assert_eq!(r["subgraph"], json!([[c, b], [b, a]]));
    assert_eq!(r["subgraph_str"], json!([["c", "b"], ["b", "a"]]));
}

#[test]
fn bfs_unknown_name_is_param_error() {
    let mut g = MemGraph::new();
    g.add_edge(0, 1);
    let state = ServerState::with_graph(g);
    assert_eq!(
        error_code(
            &state,
            "breadth_first_search",
            json!({"source": "ghost", "target": 1}),
        ),
        -32602
    );
}

// ---------------------------------------------------------------------------
// Introspection
// ---------------------------------------------------------------------------

#[test]
fn algorithms_list_ends_with_stinger() {
    let state = projection_state();
    let r = result(&state, "get_algorithms", Value::Null);
    assert_eq!(r["algorithms"], json!(["pr", "stinger"]));
}

#[test]
fn data_description_lists_columns() {
    let state = projection_state();
    let r = result(&state, "get_data_description", json!({"name": "pr"}));
    assert_eq!(r["alg_data"], json!(["pagerank"]));

    let r = result(&state, "get_data_description", json!({"name": "stinger"}));
    assert_eq!(
        r["alg_data"],
        json!([
            "vertex_weight",
            "vertex_type_num",
            "vertex_type_name",
            "vertex_indegree",
            "vertex_outdegree"
        ])
    );

    assert_eq!(
        error_code(&state, "get_data_description", json!({"name": "nope"})),
        -32003
    );
}

// ---------------------------------------------------------------------------
// Scenario 3: range projection
// ---------------------------------------------------------------------------

#[test]
fn range_projection_returns_values_in_vertex_order() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array_range",
        json!({"name": "pr", "data": "pagerank", "offset": 0, "count": 3}),
    );
    let p = &r["pagerank"];
    assert_eq!(p["vertex_id"], json!([0, 1, 2]));
    assert_eq!(as_f32s(&p["value"]), vec![0.1, 0.4, 0.5]);
    assert_eq!(p["offset"], json!(0));
    assert_eq!(p["count"], json!(3));
    assert!(p.get("order").is_none());
}

// ---------------------------------------------------------------------------
// Scenario 4: sorted projection
// ---------------------------------------------------------------------------

#[test]
fn sorted_projection_descending() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "pr", "data": "pagerank", "offset": 0, "count": 3, "order": "DESC"}),
    );
    let p = &r["pagerank"];
    assert_eq!(p["vertex_id"], json!([2, 1, 0]));
    assert_eq!(as_f32s(&p["value"]), vec![0.5, 0.4, 0.1]);
    assert_eq!(p["order"], json!("DESC"));
}

#[test]
fn sorted_projection_defaults_to_descending() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "pr", "data": "pagerank", "offset": 0, "count": 3}),
    );
    assert_eq!(r["pagerank"]["order"], json!("DESC"));
}

#[test]
fn sorted_projection_bad_order_is_internal_error() {
    let state = projection_state();
    assert_eq!(
        error_code(
            &state,
            "get_data_array_sorted_range",
            json!({"name": "pr", "data": "pagerank", "offset": 0, "count": 3, "order": "SIDEWAYS"}),
        ),
        -32603
    );
}

// ---------------------------------------------------------------------------
// Scenario 5: set projection
// ---------------------------------------------------------------------------

#[test]
fn set_projection_echoes_the_set() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array_set",
        json!({"name": "pr", "data": "pagerank", "set": [2, 0]}),
    );
    let p = &r["pagerank"];
    assert_eq!(p["vertex_id"], json!([2, 0]));
    assert_eq!(as_f32s(&p["value"]), vec![0.5, 0.1]);
    assert!(p.get("offset").is_none());
    assert!(p.get("count").is_none());
}

#[test]
fn set_projection_empty_set_is_param_error() {
    let state = projection_state();
    assert_eq!(
        error_code(
            &state,
            "get_data_array_set",
            json!({"name": "pr", "data": "pagerank", "set": []}),
        ),
        -32602
    );
}

// ---------------------------------------------------------------------------
// Scenario 6: graph pseudo-columns
// ---------------------------------------------------------------------------

#[test]
fn stinger_outdegree_projection() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array",
        json!({"name": "stinger", "data": "vertex_outdegree"}),
    );
    let p = &r["vertex_outdegree"];
    assert_eq!(p["vertex_id"], json!([0, 1, 2]));
    assert_eq!(p["value"], json!([3, 1, 2]));
}

#[test]
fn stinger_strings_resolve_external_names() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array",
        json!({"name": "stinger", "data": "vertex_outdegree", "strings": true}),
    );
    assert_eq!(
        r["vertex_outdegree"]["vertex_str"],
        json!(["v0", "v1", "v2"])
    );
}

// ---------------------------------------------------------------------------
// Boundary behaviors
// ---------------------------------------------------------------------------

#[test]
fn range_start_at_vertex_count_is_param_error() {
    let state = projection_state();
    assert_eq!(
        error_code(
            &state,
            "get_data_array_range",
            json!({"name": "pr", "data": "pagerank", "offset": 3, "count": 1}),
        ),
        -32602
    );
}

#[test]
fn range_end_clamps_to_vertex_count() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array_range",
        json!({"name": "pr", "data": "pagerank", "offset": 1, "count": 99}),
    );
    let p = &r["pagerank"];
    assert_eq!(p["vertex_id"], json!([1, 2]));
    assert_eq!(p["count"], json!(2));
}

#[test]
fn nonpositive_stride_clamps_to_one() {
    let state = projection_state();
    let r = result(
        &state,
        "get_data_array",
        json!({"name": "pr", "data": "pagerank", "stride": -3}),
    );
    assert_eq!(r["pagerank"]["vertex_id"], json!([0, 1, 2]));
}

#[test]
fn unknown_column_is_param_error() {
    let state = projection_state();
    assert_eq!(
        error_code(
            &state,
            "get_data_array",
            json!({"name": "pr", "data": "nope"}),
        ),
        -32602
    );
}

#[test]
fn unknown_method_is_method_not_found() {
    let state = projection_state();
    assert_eq!(error_code(&state, "get_everything", Value::Null), -32601);
}

#[test]
fn missing_params_is_param_error() {
    let state = projection_state();
    assert_eq!(error_code(&state, "get_data_array", Value::Null), -32602);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

fn session_state() -> ServerState {
    let mut g = MemGraph::new();
    g.add_edge(0, 1);
    g.add_edge(1, 2);
    let state = ServerState::with_graph(g);
    state
        .sessions
        .register_kind("subgraph", SubgraphMonitor::boxed);
    state
}

#[test]
fn register_then_request_round_trip() {
    let state = session_state();

    let r = result(
        &state,
        "register",
        json!({"type": "subgraph", "vertices": [0, 1, 2]}),
    );
    let session_id = r["session_id"].as_i64().unwrap();
    assert_eq!(r["subgraph"], json!([[0, 1], [1, 2]]));

    state.publish_batch(&sgdb::UpdateBatch {
        insertions: vec![(2, 0), (7, 8)],
        deletions: vec![(0, 1)],
    });

    let r = result(&state, "request", json!({"session_id": session_id}));
    assert_eq!(r["session_id"], json!(session_id));
    assert_eq!(r["insertions"], json!([[2, 0]]));
    assert_eq!(r["deletions"], json!([[0, 1]]));
    assert!(r["time_since"].as_i64().unwrap() >= 0);

    // Drained on the next poll.
    let r = result(&state, "request", json!({"session_id": session_id}));
    assert_eq!(r["insertions"], json!([]));
}

#[test]
fn register_unknown_kind_is_method_not_found() {
    let state = session_state();
    assert_eq!(
        error_code(&state, "register", json!({"type": "mystery"})),
        -32601
    );
}

#[test]
fn register_bad_session_params() {
    let state = session_state();
    assert_eq!(
        error_code(&state, "register", json!({"type": "subgraph"})),
        -32602
    );
    assert_eq!(
        error_code(
            &state,
            "register",
            json!({"type": "subgraph", "vertices": []}),
        ),
        -32602
    );
}

#[test]
fn request_unknown_session() {
    let state = session_state();
    assert_eq!(
        error_code(&state, "request", json!({"session_id": 12345})),
        -32001
    );
}

#[test]
fn distinct_sessions_get_distinct_ids() {
    let state = session_state();
    let a = result(
        &state,
        "register",
        json!({"type": "subgraph", "vertices": [0]}),
    )["session_id"]
        .as_i64()
        .unwrap();
    let b = result(
        &state,
        "register",
        json!({"type": "subgraph", "vertices": [1]}),
    )["session_id"]
        .as_i64()
        .unwrap();
    assert_ne!(a, b);
}
