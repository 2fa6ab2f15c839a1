//! sgdb RPC server: Unix socket front end for the query and session core.
//!
//! Usage:
//!   sgdb-rpc-server <graph-file> [--socket /tmp/sgdb.sock] [--metrics]
//!                   [--session-timeout <secs>]
//!
//! Protocol:
//!   Request:  [4-byte length BE] [JSON request envelope]
//!   Response: [4-byte length BE] [JSON response envelope]
//!
//! The graph is loaded once from a whitespace-delimited edge-list file;
//! each client connection is served on its own thread. Idle sessions are
//! reaped by a background sweeper.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use sgdb::graph::load_edge_list;
use sgdb::metrics::{Metrics, SLOW_CALL_THRESHOLD_MS};
use sgdb::rpc::{dispatch, Request, Response};
use sgdb::session::SubgraphMonitor;
use sgdb::{GraphView, RpcError, ServerState};

static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

const DEFAULT_SOCKET: &str = "/tmp/sgdb.sock";
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 300;
const REAPER_INTERVAL_SECS: u64 = 30;
const MAX_MESSAGE_BYTES: usize = 100 * 1024 * 1024;

fn read_message(stream: &mut UnixStream) -> std::io::Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Message too large: {} bytes", len),
        ));
    }

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf)?;
    Ok(Some(buf))
}

fn write_message(stream: &mut UnixStream, data: &[u8]) -> std::io::Result<()> {
    let len = data.len() as u32;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(data)?;
    stream.flush()?;
    Ok(())
}

fn handle_client(mut stream: UnixStream, state: Arc<ServerState>, client_id: usize, metrics: Option<Arc<Metrics>>) {
    info!(client_id, "client connected");

    loop {
        let msg = match read_message(&mut stream) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                info!(client_id, "client disconnected");
                break;
            }
            Err(e) => {
                warn!(client_id, error = %e, "read error");
                break;
            }
        };

        let response = match serde_json::from_slice::<Request>(&msg) {
            Ok(request) => {
                let method = request.method.clone();
                let start = Instant::now();
                let response = dispatch(&state, request);

                if let Some(metrics) = &metrics {
                    let duration_ms = start.elapsed().as_millis() as u64;
                    metrics.record_call(&method, duration_ms);
                    if duration_ms >= SLOW_CALL_THRESHOLD_MS {
                        warn!(client_id, method = %method, duration_ms, "slow call");
                    }
                }
                response
            }
            Err(e) => {
                Response::error(&RpcError::InvalidParams(format!("invalid request: {}", e)))
            }
        };

        let bytes = match serde_json::to_vec(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(client_id, error = %e, "serialize error");
                continue;
            }
        };

        if let Err(e) = write_message(&mut stream, &bytes) {
            warn!(client_id, error = %e, "write error");
            break;
        }
    }
}

fn print_usage() {
    println!("sgdb-rpc-server {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("JSON-RPC server for the sgdb streaming graph store");
    println!();
    println!("Usage: sgdb-rpc-server <graph-file> [--socket <path>] [--metrics] [--session-timeout <secs>]");
    println!();
    println!("Arguments:");
    println!("  <graph-file>        Whitespace-delimited edge list (src dst [weight])");
    println!("  --socket            Unix socket path (default: {})", DEFAULT_SOCKET);
    println!("  --session-timeout   Idle session reap threshold in seconds (default: {})", DEFAULT_SESSION_TIMEOUT_SECS);
    println!();
    println!("Flags:");
    println!("  -V, --version       Print version information");
    println!("  -h, --help          Print this help message");
    println!("  --metrics           Enable call metrics collection");
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("sgdb-rpc-server {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        std::process::exit(0);
    }
    if args.len() < 2 || args[1].starts_with("--") {
        eprintln!("Usage: sgdb-rpc-server <graph-file> [--socket <path>] [--metrics] [--session-timeout <secs>]");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let graph_path = &args[1];
    let socket_path = args
        .iter()
        .position(|a| a == "--socket")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or(DEFAULT_SOCKET)
        .to_string();
    let session_timeout = args
        .iter()
        .position(|a| a == "--session-timeout")
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_SESSION_TIMEOUT_SECS);

    let metrics: Option<Arc<Metrics>> = if args.iter().any(|a| a == "--metrics") {
        info!("metrics collection enabled");
        Some(Arc::new(Metrics::new()))
    } else {
        None
    };

    info!(path = %graph_path, "loading graph");
    let graph = match load_edge_list(graph_path) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Failed to load graph from {}: {}", graph_path, e);
            std::process::exit(1);
        }
    };

    let state = ServerState::with_graph(graph);
    state.sessions.register_kind("subgraph", SubgraphMonitor::boxed);
    let state = Arc::new(state);

    if let Some(graph) = state.graph() {
        let graph = graph.read().unwrap();
        let nv = graph.vertex_count();
        info!(vertices = nv, edges = graph.edge_count_up_to(nv), "graph loaded");
    }

    let _ = std::fs::remove_file(&socket_path);
    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", socket_path, e);
            std::process::exit(1);
        }
    };
    info!(socket = %socket_path, "listening");

    // Graceful shutdown: remove the socket file and exit.
    let socket_for_signal = socket_path.clone();
    let metrics_for_signal = metrics.clone();
    let mut signals = match signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ]) {
        Ok(signals) => signals,
        Err(e) => {
            eprintln!("Failed to register signal handlers: {}", e);
            std::process::exit(1);
        }
    };
    thread::spawn(move || {
        for sig in signals.forever() {
            info!(signal = sig, "shutting down");
            if let Some(metrics) = &metrics_for_signal {
                let snap = metrics.snapshot();
                info!(
                    calls = snap.call_count,
                    slow = snap.slow_call_count,
                    p95_ms = snap.p95_ms,
                    uptime_secs = snap.uptime_secs,
                    "final metrics"
                );
            }
            let _ = std::fs::remove_file(&socket_for_signal);
            std::process::exit(0);
        }
    });

    // Idle-session sweeper.
    let state_for_reaper = Arc::clone(&state);
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(REAPER_INTERVAL_SECS));
        let reaped = state_for_reaper
            .sessions
            .reap_idle(Duration::from_secs(session_timeout));
        if !reaped.is_empty() {
            info!(count = reaped.len(), "reaped idle sessions");
        }
    });

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst);
                let state = Arc::clone(&state);
                let metrics = metrics.clone();
                thread::spawn(move || handle_client(stream, state, client_id, metrics));
            }
            Err(e) => {
                warn!(error = %e, "accept error");
            }
        }
    }
}
