//! In-memory graph store used by the server binary and tests.
//!
//! Adjacency is kept per vertex in insertion order; the order of
//! `edges_from` is the order edges were added, which makes traversal
//! output deterministic for a given build sequence.

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::warn;

use super::{GraphView, UpdateBatch};

/// In-memory adjacency store with vertex weight/type columns and a
/// bidirectional external-name mapping.
#[derive(Debug, Default)]
pub struct MemGraph {
    out_edges: Vec<Vec<i64>>,
    in_edges: Vec<Vec<i64>>,
    weights: Vec<i64>,
    types: Vec<i64>,
    names: Vec<Option<String>>,
    name_index: HashMap<String, i64>,
    type_names: Vec<String>,
}

impl MemGraph {
    pub fn new() -> Self {
        // Type 0 is always present so untyped vertices resolve to a name.
        Self {
            type_names: vec!["none".to_string()],
            ..Default::default()
        }
    }

    /// Add an anonymous vertex and return its id.
    pub fn add_vertex(&mut self) -> i64 {
        let id = self.out_edges.len() as i64;
        self.out_edges.push(Vec::new());
        self.in_edges.push(Vec::new());
        self.weights.push(0);
        self.types.push(0);
        self.names.push(None);
        id
    }

    /// Look up a vertex by external name, creating it if absent.
    pub fn add_named_vertex(&mut self, name: &str) -> i64 {
        if let Some(&id) = self.name_index.get(name) {
            return id;
        }
        let id = self.add_vertex();
        self.names[id as usize] = Some(name.to_string());
        self.name_index.insert(name.to_string(), id);
        id
    }

    /// Grow the vertex table so that `v` is a valid id.
    pub fn ensure_vertex(&mut self, v: i64) {
        while (self.out_edges.len() as i64) <= v {
            self.add_vertex();
        }
    }

    /// Add a directed edge. Duplicate edges are ignored.
    pub fn add_edge(&mut self, src: i64, dst: i64) {
        if src < 0 || dst < 0 {
            return;
        }
        self.ensure_vertex(src.max(dst));
        let out = &mut self.out_edges[src as usize];
        if !out.contains(&dst) {
            out.push(dst);
            self.in_edges[dst as usize].push(src);
        }
    }

    /// Remove a directed edge if present.
    pub fn remove_edge(&mut self, src: i64, dst: i64) {
        if src < 0 || dst < 0 || src as usize >= self.out_edges.len() {
            return;
        }
        self.out_edges[src as usize].retain(|&d| d != dst);
        if (dst as usize) < self.in_edges.len() {
            self.in_edges[dst as usize].retain(|&s| s != src);
        }
    }

    pub fn set_weight(&mut self, v: i64, weight: i64) {
        self.ensure_vertex(v);
        self.weights[v as usize] = weight;
    }

    /// Register (or find) a vertex type name and return its number.
    pub fn intern_type(&mut self, name: &str) -> i64 {
        if let Some(pos) = self.type_names.iter().position(|t| t == name) {
            return pos as i64;
        }
        self.type_names.push(name.to_string());
        (self.type_names.len() - 1) as i64
    }

    pub fn set_type(&mut self, v: i64, type_num: i64) {
        self.ensure_vertex(v);
        self.types[v as usize] = type_num;
    }

    /// Apply a writer batch: insertions first, then deletions.
    pub fn apply(&mut self, batch: &UpdateBatch) {
        for &(src, dst) in &batch.insertions {
            self.add_edge(src, dst);
        }
        for &(src, dst) in &batch.deletions {
            self.remove_edge(src, dst);
        }
    }

    fn in_range(&self, v: i64) -> bool {
        v >= 0 && (v as usize) < self.out_edges.len()
    }
}

impl GraphView for MemGraph {
    fn vertex_count(&self) -> i64 {
        self.out_edges.len() as i64
    }

    fn edge_count_up_to(&self, nv: i64) -> i64 {
        let bound = nv.clamp(0, self.out_edges.len() as i64) as usize;
        self.out_edges[..bound]
            .iter()
            .map(|out| out.iter().filter(|&&d| d < nv).count() as i64)
            .sum()
    }

    fn out_degree(&self, v: i64) -> i64 {
        if self.in_range(v) {
            self.out_edges[v as usize].len() as i64
        } else {
            0
        }
    }

    fn in_degree(&self, v: i64) -> i64 {
        if self.in_range(v) {
            self.in_edges[v as usize].len() as i64
        } else {
            0
        }
    }

    fn weight(&self, v: i64) -> i64 {
        if self.in_range(v) {
            self.weights[v as usize]
        } else {
            0
        }
    }

    fn type_num(&self, v: i64) -> i64 {
        if self.in_range(v) {
            self.types[v as usize]
        } else {
            0
        }
    }

    fn type_name(&self, type_num: i64) -> Option<&str> {
        if type_num < 0 {
            return None;
        }
        self.type_names.get(type_num as usize).map(|s| s.as_str())
    }

    fn name_of(&self, v: i64) -> Option<&str> {
        if self.in_range(v) {
            self.names[v as usize].as_deref()
        } else {
            None
        }
    }

    fn lookup(&self, name: &str) -> Option<i64> {
        self.name_index.get(name).copied()
    }

    fn edges_from(&self, v: i64) -> Vec<i64> {
        if self.in_range(v) {
            self.out_edges[v as usize].clone()
        } else {
            Vec::new()
        }
    }
}

/// Load a graph from a whitespace-delimited edge-list file.
///
/// Each line is `src dst [weight]`; endpoints are external names and are
/// interned as vertices on first sight. A positive third column sets the
/// source vertex weight. `#` starts a comment line. Malformed lines are
/// skipped with a warning.
pub fn load_edge_list<P: AsRef<Path>>(path: P) -> std::io::Result<MemGraph> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let mut graph = MemGraph::new();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (src, dst) = match (fields.next(), fields.next()) {
            (Some(s), Some(d)) => (s, d),
            _ => {
                warn!(lineno = lineno + 1, "skipping malformed edge-list line");
                continue;
            }
        };
        let src = graph.add_named_vertex(src);
        let dst = graph.add_named_vertex(dst);
        graph.add_edge(src, dst);
        if let Some(w) = fields.next() {
            match w.parse::<i64>() {
                Ok(w) => graph.set_weight(src, w),
                Err(_) => {
                    warn!(lineno = lineno + 1, "skipping unparsable edge weight");
                }
            }
        }
    }

    Ok(graph)
}
