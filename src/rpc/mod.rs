//! Request envelope, server state, and method dispatch.

pub mod methods;
pub mod params;

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::alg::AlgorithmState;
use crate::error::RpcError;
use crate::graph::MemGraph;
use crate::session::SessionRegistry;

/// Request envelope from a client.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// Response envelope to a client.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Result { result: Value },
    Error { error: ErrorBody },
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

impl Response {
    pub fn result(fields: Map<String, Value>) -> Self {
        Response::Result {
            result: Value::Object(fields),
        }
    }

    pub fn error(err: &RpcError) -> Self {
        Response::Error {
            error: ErrorBody {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

/// Root server state reachable from every method handler.
///
/// The graph is shared read-mostly behind an RwLock; a writer applies
/// batches through [`ServerState::publish_batch`] while query workers
/// hold read guards for the duration of one call. Algorithm states are
/// published whole and captured as `Arc` snapshots per call.
pub struct ServerState {
    graph: Option<Arc<RwLock<MemGraph>>>,
    algorithms: RwLock<Vec<Arc<AlgorithmState>>>,
    pub sessions: SessionRegistry,
}

impl ServerState {
    /// State without a graph handle; queries needing the graph fail with
    /// an internal error.
    pub fn new() -> Self {
        Self {
            graph: None,
            algorithms: RwLock::new(Vec::new()),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn with_graph(graph: MemGraph) -> Self {
        Self {
            graph: Some(Arc::new(RwLock::new(graph))),
            algorithms: RwLock::new(Vec::new()),
            sessions: SessionRegistry::new(),
        }
    }

    pub fn graph(&self) -> Option<Arc<RwLock<MemGraph>>> {
        self.graph.clone()
    }

    /// Publish (or replace) an algorithm snapshot under its name.
    pub fn publish_algorithm(&self, alg: AlgorithmState) {
        let mut algorithms = self.algorithms.write().unwrap();
        let alg = Arc::new(alg);
        match algorithms.iter_mut().find(|a| a.name == alg.name) {
            Some(slot) => *slot = alg,
            None => algorithms.push(alg),
        }
    }

    /// Capture the current snapshot of one algorithm.
    pub fn algorithm(&self, name: &str) -> Option<Arc<AlgorithmState>> {
        self.algorithms
            .read()
            .unwrap()
            .iter()
            .find(|a| a.name == name)
            .cloned()
    }

    /// Names of running algorithms, in publication order.
    pub fn algorithm_names(&self) -> Vec<String> {
        self.algorithms
            .read()
            .unwrap()
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    /// Apply a writer batch to the graph, then fan it out to sessions.
    pub fn publish_batch(&self, batch: &crate::graph::UpdateBatch) {
        if let Some(graph) = &self.graph {
            graph.write().unwrap().apply(batch);
        }
        self.sessions.publish(batch);
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Route one request to its handler and wrap the outcome in an envelope.
pub fn dispatch(state: &ServerState, request: Request) -> Response {
    let mut out = Map::new();
    let outcome = match request.method.as_str() {
        "get_graph_stats" => methods::get_graph_stats(state, &mut out),
        "breadth_first_search" => methods::breadth_first_search(state, request.params, &mut out),
        "get_algorithms" => methods::get_algorithms(state, &mut out),
        "get_data_description" => methods::get_data_description(state, request.params, &mut out),
        "get_data_array" => methods::get_data_array(state, request.params, &mut out),
        "get_data_array_range" => methods::get_data_array_range(state, request.params, &mut out),
        "get_data_array_sorted_range" => {
            methods::get_data_array_sorted_range(state, request.params, &mut out)
        }
        "get_data_array_set" => methods::get_data_array_set(state, request.params, &mut out),
        "register" => methods::register(state, request.params, &mut out),
        "request" => methods::request(state, request.params, &mut out),
        other => Err(RpcError::MethodNotFound(other.to_string())),
    };

    match outcome {
        Ok(()) => Response::result(out),
        Err(err) => Response::error(&err),
    }
}
