//! Cross-cutting projection and registry properties, driven through the
//! public dispatch surface.

use std::sync::Arc;

use serde_json::{json, Value};

use sgdb::session::SubgraphMonitor;
use sgdb::{AlgorithmState, MemGraph, Request, ServerState};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn result(state: &ServerState, method: &str, params: Value) -> Value {
    let response = sgdb::dispatch(
        state,
        Request {
            method: method.to_string(),
            params: Some(params),
        },
    );
    let v = serde_json::to_value(&response).unwrap();
    assert!(v.get("result").is_some(), "expected result, got {}", v);
    v["result"].clone()
}

fn i64_buffer(values: &[i64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn scores_state(nv: i64) -> ServerState {
    let mut g = MemGraph::new();
    g.ensure_vertex(nv - 1);
    let state = ServerState::with_graph(g);
    let scores: Vec<i64> = (0..nv).map(|i| (i * 7919) % 257).collect();
    state.publish_algorithm(AlgorithmState::new(
        "scores",
        "l score",
        i64_buffer(&scores),
        nv,
    ));
    state
}

fn ids_of(p: &Value) -> Vec<i64> {
    p["vertex_id"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

fn values_of(p: &Value) -> Vec<i64> {
    p["value"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect()
}

// ---------------------------------------------------------------------------
// Sampling counts
// ---------------------------------------------------------------------------

#[test]
fn samples_parameter_bounds_emitted_items() {
    let nv = 100;
    let state = scores_state(nv);

    for samples in [1i64, 2, 3, 7, 10, 20, 100, 250] {
        let r = result(
            &state,
            "get_data_array",
            json!({"name": "scores", "data": "score", "samples": samples}),
        );
        let got = ids_of(&r["score"]).len() as i64;
        let want = samples.min(nv);
        assert!(
            (got - want).abs() <= 1,
            "samples={} emitted={} expected about {}",
            samples,
            got,
            want
        );
    }
}

#[test]
fn log_sampling_emits_increasing_positions() {
    let state = scores_state(1000);
    let r = result(
        &state,
        "get_data_array",
        json!({"name": "scores", "data": "score", "samples": 10, "log": true}),
    );
    let ids = ids_of(&r["score"]);
    assert_eq!(ids[0], 0);
    for pair in ids.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    assert!(*ids.last().unwrap() < 1000);
}

// ---------------------------------------------------------------------------
// Round-trip law: range projection re-sorted by value equals the
// ascending sorted projection
// ---------------------------------------------------------------------------

#[test]
fn range_resorted_equals_sorted_ascending() {
    let nv = 64;
    let state = scores_state(nv);

    let range = result(
        &state,
        "get_data_array_range",
        json!({"name": "scores", "data": "score", "offset": 0, "count": nv}),
    );
    let sorted = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "scores", "data": "score", "offset": 0, "count": nv, "order": "ASC"}),
    );

    let mut pairs: Vec<(i64, i64)> = ids_of(&range["score"])
        .into_iter()
        .zip(values_of(&range["score"]))
        .collect();
    pairs.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

    let sorted_pairs: Vec<(i64, i64)> = ids_of(&sorted["score"])
        .into_iter()
        .zip(values_of(&sorted["score"]))
        .collect();
    assert_eq!(pairs, sorted_pairs);
}

#[test]
fn sorted_ascending_values_are_monotone() {
    let state = scores_state(128);
    let r = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "scores", "data": "score", "offset": 0, "count": 128, "order": "ASC"}),
    );
    let values = values_of(&r["score"]);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));

    let r = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "scores", "data": "score", "offset": 0, "count": 128, "order": "DESC"}),
    );
    let values = values_of(&r["score"]);
    assert!(values.windows(2).all(|w| w[0] >= w[1]));
}

// ---------------------------------------------------------------------------
// Sorted window addresses the permutation, not vertex ids
// ---------------------------------------------------------------------------

#[test]
fn sorted_window_is_top_k_of_permutation() {
    let nv = 32;
    let state = scores_state(nv);

    let top3 = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "scores", "data": "score", "offset": 0, "count": 3, "order": "DESC"}),
    );
    let all = result(
        &state,
        "get_data_array_sorted_range",
        json!({"name": "scores", "data": "score", "offset": 0, "count": nv, "order": "DESC"}),
    );

    assert_eq!(ids_of(&top3["score"]), ids_of(&all["score"])[..3].to_vec());
}

// ---------------------------------------------------------------------------
// Concurrent registration through dispatch
// ---------------------------------------------------------------------------

#[test]
fn concurrent_registration_yields_unique_ids() {
    let mut g = MemGraph::new();
    g.add_edge(0, 1);
    let state = ServerState::with_graph(g);
    state
        .sessions
        .register_kind("subgraph", SubgraphMonitor::boxed);
    let state = Arc::new(state);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let state = Arc::clone(&state);
        handles.push(std::thread::spawn(move || {
            let mut ids = Vec::new();
            for _ in 0..25 {
                let r = result(
                    &state,
                    "register",
                    json!({"type": "subgraph", "vertices": [0, 1]}),
                );
                ids.push(r["session_id"].as_i64().unwrap());
            }
            ids
        }));
    }

    let mut all: Vec<i64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let total = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), total);
}
