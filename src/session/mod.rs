//! Long-lived client sessions.
//!
//! A session is registered under a kind name, receives `on_register` once
//! and `on_request` on every poll, and sees writer batches through
//! `on_update`. The registry owns the id space and the id-to-session map;
//! each session carries its own mutex, so its three hooks are serialized
//! against each other while distinct sessions proceed in parallel.

pub mod subgraph_monitor;

pub use subgraph_monitor::SubgraphMonitor;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::error::{Result, RpcError};
use crate::graph::{GraphView, UpdateBatch};

/// Per-call context handed to session hooks.
pub struct SessionCtx<'a> {
    pub graph: Option<&'a dyn GraphView>,
    pub strings: bool,
}

/// A registered session. Hooks run under the session's own mutex.
pub trait Session: Send {
    /// Validate and bind the kind-specific registration parameters.
    fn bind_params(&mut self, params: Option<&Value>) -> Result<()>;

    /// Called once right after the session is inserted; fills the
    /// registration response.
    fn on_register(&mut self, ctx: &SessionCtx<'_>, out: &mut Map<String, Value>);

    /// Called on every `request`; fills the poll response.
    fn on_request(&mut self, ctx: &SessionCtx<'_>, out: &mut Map<String, Value>);

    /// Called when the writer publishes a batch.
    fn on_update(&mut self, batch: &UpdateBatch);
}

type SessionCtor = Box<dyn Fn() -> Box<dyn Session> + Send + Sync>;

struct SessionInner {
    session: Box<dyn Session>,
    last_touch: Instant,
}

/// Handle shared between the registry map and in-flight calls.
pub struct SessionHandle {
    pub id: i64,
    pub kind: String,
    inner: Mutex<SessionInner>,
}

/// Process-wide session registry: kind factories, id allocation, and the
/// id-to-session map.
pub struct SessionRegistry {
    kinds: RwLock<HashMap<String, SessionCtor>>,
    sessions: Mutex<HashMap<i64, Arc<SessionHandle>>>,
    next_id: AtomicI64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            kinds: RwLock::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Register a session kind under a name.
    pub fn register_kind<F>(&self, name: &str, ctor: F)
    where
        F: Fn() -> Box<dyn Session> + Send + Sync + 'static,
    {
        self.kinds
            .write()
            .unwrap()
            .insert(name.to_string(), Box::new(ctor));
    }

    pub fn has_kind(&self, name: &str) -> bool {
        self.kinds.read().unwrap().contains_key(name)
    }

    /// Create, check, insert, and kick off a session of the given kind.
    ///
    /// Ids are monotonic and never reused within the process lifetime. A
    /// failed parameter check discards the session before insertion.
    pub fn register(
        &self,
        kind: &str,
        params: Option<&Value>,
        ctx: &SessionCtx<'_>,
        out: &mut Map<String, Value>,
    ) -> Result<i64> {
        let mut session = {
            let kinds = self.kinds.read().unwrap();
            let ctor = kinds
                .get(kind)
                .ok_or_else(|| RpcError::MethodNotFound(format!("session type '{}'", kind)))?;
            ctor()
        };

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        session.bind_params(params)?;

        let handle = Arc::new(SessionHandle {
            id,
            kind: kind.to_string(),
            inner: Mutex::new(SessionInner {
                session,
                last_touch: Instant::now(),
            }),
        });

        {
            let mut sessions = self.sessions.lock().unwrap();
            if sessions.contains_key(&id) {
                return Err(RpcError::SessionInsert(id));
            }
            sessions.insert(id, Arc::clone(&handle));
        }

        let mut inner = handle.inner.lock().unwrap();
        inner.session.on_register(ctx, out);
        inner.last_touch = Instant::now();

        out.insert("session_id".to_string(), Value::from(id));
        Ok(id)
    }

    /// Poll a session: run `on_request`, report seconds since the
    /// previous touch, and re-stamp the touch time.
    pub fn request(
        &self,
        id: i64,
        ctx: &SessionCtx<'_>,
        out: &mut Map<String, Value>,
    ) -> Result<()> {
        let handle = self
            .sessions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(RpcError::SessionNotFound(id))?;

        out.insert("session_id".to_string(), Value::from(id));

        let mut inner = handle.inner.lock().unwrap();
        inner.session.on_request(ctx, out);
        let time_since = inner.last_touch.elapsed().as_secs() as i64;
        inner.last_touch = Instant::now();

        out.insert("time_since".to_string(), Value::from(time_since));
        Ok(())
    }

    /// Fan a writer batch out to every live session.
    pub fn publish(&self, batch: &UpdateBatch) {
        let handles: Vec<Arc<SessionHandle>> =
            self.sessions.lock().unwrap().values().cloned().collect();
        for handle in handles {
            handle.inner.lock().unwrap().session.on_update(batch);
        }
    }

    /// Drop sessions idle beyond `max_idle`; returns the reaped ids.
    pub fn reap_idle(&self, max_idle: Duration) -> Vec<i64> {
        let mut sessions = self.sessions.lock().unwrap();
        let stale: Vec<i64> = sessions
            .iter()
            .filter(|(_, h)| h.inner.lock().unwrap().last_touch.elapsed() > max_idle)
            .map(|(&id, _)| id)
            .collect();
        for id in &stale {
            sessions.remove(id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
