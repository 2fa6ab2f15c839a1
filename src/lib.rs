//! sgdb: an in-memory streaming graph store with a JSON-RPC query and
//! session core.
//!
//! Clients submit `{method, params}` requests for graph statistics,
//! breadth-first shortest-path subgraphs, algorithm introspection, typed
//! sampled projections of algorithm data columns, and long-lived update
//! sessions. The graph itself is grown concurrently by a writer; every
//! query tolerates stale vertex counts by clamping its own bounds.
//!
//! The wire layer (framing, transport) lives in the server binary; this
//! library is the dispatchable core, usable in-process:
//!
//! ```
//! use sgdb::{dispatch, MemGraph, Request, ServerState};
//!
//! let mut g = MemGraph::new();
//! g.add_edge(0, 1);
//! let state = ServerState::with_graph(g);
//! let response = dispatch(&state, Request {
//!     method: "get_graph_stats".to_string(),
//!     params: None,
//! });
//! let encoded = serde_json::to_string(&response).unwrap();
//! assert!(encoded.contains("vertices"));
//! ```

pub mod alg;
pub mod error;
pub mod graph;
pub mod graph_columns;
pub mod metrics;
pub mod projection;
pub mod rpc;
pub mod sampling;
pub mod schema;
pub mod session;
pub mod subgraph;

pub use alg::AlgorithmState;
pub use error::{Result, RpcError};
pub use graph::{GraphView, MemGraph, UpdateBatch};
pub use projection::{AddressMode, ColumnValues, Projection, SampleOpts, SortOrder};
pub use rpc::{dispatch, Request, Response, ServerState};
pub use schema::Schema;
pub use session::{Session, SessionCtx, SessionRegistry};
