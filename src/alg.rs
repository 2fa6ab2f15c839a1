//! Published algorithm state.
//!
//! Each running analytic publishes a snapshot: its name, the description
//! string for its packed buffer, the buffer itself, and the vertex count
//! the buffer was laid out for. The analytic runtime double-buffers on
//! its side; the server only ever sees whole published snapshots, and a
//! projection call captures one `Arc` for its full duration.

use crate::error::Result;
use crate::schema::Schema;

/// One published snapshot of a running analytic.
#[derive(Debug, Clone)]
pub struct AlgorithmState {
    pub name: String,
    /// Whitespace-delimited schema description (see [`Schema::parse`]).
    pub description: String,
    /// Packed column data, vertex-major within each column.
    pub data: Vec<u8>,
    /// Vertex count the buffer was published for.
    pub vertex_count: i64,
}

impl AlgorithmState {
    pub fn new(name: &str, description: &str, data: Vec<u8>, vertex_count: i64) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            data,
            vertex_count,
        }
    }

    /// Parse this state's schema against its own vertex count.
    pub fn schema(&self) -> Result<Schema> {
        Schema::parse(&self.description, self.vertex_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_uses_own_vertex_count() {
        let alg = AlgorithmState::new("pr", "f pagerank", vec![0u8; 12], 3);
        let schema = alg.schema().unwrap();
        assert_eq!(schema.packed_len(), 12);
        assert_eq!(alg.data.len(), schema.packed_len());
    }
}
