//! Typed, sampled, sortable projection of one algorithm column.
//!
//! A projection takes a read-only borrow of an algorithm's packed buffer
//! (and optionally the graph, for name resolution), an addressing mode,
//! and sampling options, and emits an ordered list of
//! (vertex id, value[, external name]) items for one named column.

use std::cmp::Ordering;

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::error::{Result, RpcError};
use crate::graph::GraphView;
use crate::sampling::sample_positions;
use crate::schema::{ElemType, Schema};

/// How the walk addresses vertices.
#[derive(Debug, Clone)]
pub enum AddressMode<'a> {
    /// Contiguous `[start, end)` over vertex-id space.
    Range { start: i64, end: i64 },
    /// `[start, end)` over a permutation ordering vertices by column value.
    Sorted {
        start: i64,
        end: i64,
        order: SortOrder,
    },
    /// Explicit vertex list, addressed `[0, len)`.
    Set { vertices: &'a [i64] },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parse the wire token. Anything but the two exact tokens is a
    /// contract error.
    pub fn parse(token: &str) -> Result<SortOrder> {
        match token {
            "ASC" => Ok(SortOrder::Asc),
            "DESC" => Ok(SortOrder::Desc),
            other => Err(RpcError::Internal(format!(
                "invalid sort order '{}', expecting ASC or DESC",
                other
            ))),
        }
    }
}

/// Sampling options for a projection walk.
#[derive(Debug, Clone, Copy)]
pub struct SampleOpts {
    pub stride: i64,
    pub log_scale: bool,
}

impl Default for SampleOpts {
    fn default() -> Self {
        Self {
            stride: 1,
            log_scale: false,
        }
    }
}

/// Column values carry their element family through to serialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValues {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Float(v) => v.len(),
            ColumnValues::Int(v) => v.len(),
            ColumnValues::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One projected column, ready for serialization into a response.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    pub vertex_id: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertex_str: Option<Vec<String>>,
    #[serde(rename = "value")]
    pub values: ColumnValues,
}

/// Walk bounds after validation and clamping.
pub(crate) struct ResolvedWalk {
    pub start: i64,
    pub end: i64,
    pub stride: i64,
    pub log_scale: bool,
}

/// Apply the shared validation sequence for every projection call.
///
/// Failures keep their original precedence: set shape first, then range
/// bounds, then the graph/strings contract, then stride clamping.
pub(crate) fn resolve_walk(
    mode: &AddressMode<'_>,
    nv: i64,
    opts: SampleOpts,
    graph_present: bool,
    strings: bool,
) -> Result<ResolvedWalk> {
    let (start, end) = match mode {
        AddressMode::Set { vertices } => {
            if vertices.is_empty() {
                return Err(RpcError::InvalidParams("vertex set is empty".to_string()));
            }
            // Set elements index the column slice directly, so every id
            // must lie inside the nv the buffer was published for. A
            // vertex added to the graph after that snapshot is therefore
            // rejected here rather than read past the column. Goes
            // beyond the spec's set checks; see DESIGN.md.
            if let Some(&bad) = vertices.iter().find(|&&v| v < 0 || v >= nv) {
                return Err(RpcError::InvalidParams(format!(
                    "vertex {} out of range, expecting [0, {})",
                    bad, nv
                )));
            }
            (0, vertices.len() as i64)
        }
        AddressMode::Range { start, end } | AddressMode::Sorted { start, end, .. } => {
            if *start < 0 || *start >= nv {
                return Err(RpcError::InvalidParams(format!(
                    "invalid range {} to {}, expecting [0, {})",
                    start, end, nv
                )));
            }
            let end = if *end > nv {
                warn!(end, nv, "end of range past vertex count, clamping");
                nv
            } else {
                *end
            };
            (*start, end)
        }
    };

    if strings && !graph_present {
        return Err(RpcError::Internal(
            "graph handle must be valid to resolve vertex names".to_string(),
        ));
    }

    let stride = if opts.stride <= 0 {
        warn!(stride = opts.stride, "stride is not positive, fixing to 1");
        1
    } else {
        opts.stride
    };
    if stride >= nv && nv > 0 {
        warn!(stride, nv, "stride spans the whole range, one value returned");
    }

    Ok(ResolvedWalk {
        start,
        end,
        stride,
        log_scale: opts.log_scale,
    })
}

pub(crate) fn name_or_empty(graph: Option<&dyn GraphView>, v: i64) -> String {
    graph
        .and_then(|g| g.name_of(v))
        .unwrap_or_default()
        .to_string()
}

/// Project one column of a packed algorithm buffer.
///
/// `data` is the whole buffer described by `schema`; `nv` is the vertex
/// count the buffer was published for. Borrowed state is never written.
pub fn project(
    schema: &Schema,
    data: &[u8],
    nv: i64,
    graph: Option<&dyn GraphView>,
    mode: AddressMode<'_>,
    column: &str,
    opts: SampleOpts,
    strings: bool,
) -> Result<Projection> {
    let walk = resolve_walk(&mode, nv, opts, graph.is_some(), strings)?;

    let col = schema
        .column(column)
        .ok_or_else(|| RpcError::ColumnUnknown(column.to_string()))?;

    let size = col.ty.size();
    let needed = col.offset + nv.max(0) as usize * size;
    if needed > data.len() {
        return Err(RpcError::Internal(format!(
            "algorithm buffer too small: {} bytes, column '{}' needs {}",
            data.len(),
            column,
            needed
        )));
    }
    let col_data = &data[col.offset..needed];

    match col.ty {
        ElemType::F32 => run::<f32>(col_data, nv, graph, &mode, &walk, strings),
        ElemType::F64 => run::<f64>(col_data, nv, graph, &mode, &walk, strings),
        ElemType::I32 => run::<i32>(col_data, nv, graph, &mode, &walk, strings),
        ElemType::I64 => run::<i64>(col_data, nv, graph, &mode, &walk, strings),
        ElemType::U8 => run::<u8>(col_data, nv, graph, &mode, &walk, strings),
    }
}

/// Build the index permutation that orders `[0, nv)` by a key function.
/// Ties break toward the lower vertex id, so the order is total and
/// deterministic.
pub(crate) fn sort_permutation<F>(nv: i64, order: SortOrder, key_cmp: F) -> Vec<i64>
where
    F: Fn(i64, i64) -> Ordering + Sync,
{
    let mut idx: Vec<i64> = (0..nv).collect();
    match order {
        SortOrder::Asc => idx.par_sort_by(|&a, &b| key_cmp(a, b).then(a.cmp(&b))),
        SortOrder::Desc => idx.par_sort_by(|&a, &b| key_cmp(b, a).then(a.cmp(&b))),
    }
    idx
}

/// Assemble a projection by walking sample positions and reading one
/// value per resolved vertex. `values` starts as the empty vector of the
/// column's element family.
pub(crate) fn assemble<V, N>(
    mode: &AddressMode<'_>,
    walk: &ResolvedWalk,
    idx: Option<Vec<i64>>,
    strings: bool,
    mut values: ColumnValues,
    mut value_at: V,
    mut name_at: N,
) -> Projection
where
    V: FnMut(i64, &mut ColumnValues),
    N: FnMut(i64) -> String,
{
    let positions = sample_positions(walk.start, walk.end, walk.stride, walk.log_scale);

    let mut vertex_id = Vec::with_capacity(positions.len());
    let mut vertex_str = strings.then(|| Vec::with_capacity(positions.len()));

    for p in positions {
        let vtx = match mode {
            AddressMode::Range { .. } => p,
            AddressMode::Sorted { .. } => match &idx {
                Some(idx) => idx[p as usize],
                None => p,
            },
            AddressMode::Set { vertices } => vertices[p as usize],
        };

        value_at(vtx, &mut values);
        vertex_id.push(vtx);
        if let Some(names) = vertex_str.as_mut() {
            names.push(name_at(vtx));
        }
    }

    let (offset, count, order) = match mode {
        AddressMode::Range { .. } => (Some(walk.start), Some(walk.end - walk.start), None),
        AddressMode::Sorted { order, .. } => (
            Some(walk.start),
            Some(walk.end - walk.start),
            Some(*order),
        ),
        AddressMode::Set { .. } => (None, None, None),
    };

    Projection {
        offset,
        count,
        order,
        vertex_id,
        vertex_str,
        values,
    }
}

fn run<T: ColumnScalar>(
    col_data: &[u8],
    nv: i64,
    graph: Option<&dyn GraphView>,
    mode: &AddressMode<'_>,
    walk: &ResolvedWalk,
    strings: bool,
) -> Result<Projection> {
    let read_at = |v: i64| T::read(&col_data[v as usize * T::SIZE..][..T::SIZE]);

    let idx = match mode {
        AddressMode::Sorted { order, .. } => Some(sort_permutation(nv, *order, |a, b| {
            read_at(a).scalar_cmp(&read_at(b))
        })),
        _ => None,
    };

    Ok(assemble(
        mode,
        walk,
        idx,
        strings,
        T::empty_values(),
        |vtx, out| read_at(vtx).push_value(out),
        |vtx| name_or_empty(graph, vtx),
    ))
}

/// Fixed-width scalar readable from a packed column.
pub(crate) trait ColumnScalar: Copy + Send + Sync {
    const SIZE: usize;
    fn read(bytes: &[u8]) -> Self;
    fn scalar_cmp(&self, other: &Self) -> Ordering;
    fn push_value(self, out: &mut ColumnValues);
    fn empty_values() -> ColumnValues;
}

macro_rules! int_scalar {
    ($ty:ty, $size:expr) => {
        impl ColumnScalar for $ty {
            const SIZE: usize = $size;

            fn read(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $size];
                buf.copy_from_slice(&bytes[..$size]);
                <$ty>::from_ne_bytes(buf)
            }

            fn scalar_cmp(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }

            fn push_value(self, out: &mut ColumnValues) {
                if let ColumnValues::Int(v) = out {
                    v.push(self as i64);
                }
            }

            fn empty_values() -> ColumnValues {
                ColumnValues::Int(Vec::new())
            }
        }
    };
}

macro_rules! float_scalar {
    ($ty:ty, $size:expr) => {
        impl ColumnScalar for $ty {
            const SIZE: usize = $size;

            fn read(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $size];
                buf.copy_from_slice(&bytes[..$size]);
                <$ty>::from_ne_bytes(buf)
            }

            fn scalar_cmp(&self, other: &Self) -> Ordering {
                self.total_cmp(other)
            }

            fn push_value(self, out: &mut ColumnValues) {
                if let ColumnValues::Float(v) = out {
                    v.push(self as f64);
                }
            }

            fn empty_values() -> ColumnValues {
                ColumnValues::Float(Vec::new())
            }
        }
    };
}

int_scalar!(i32, 4);
int_scalar!(i64, 8);
int_scalar!(u8, 1);
float_scalar!(f32, 4);
float_scalar!(f64, 8);
