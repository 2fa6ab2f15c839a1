//! Column schema parser for algorithm data buffers.
//!
//! An algorithm describes its packed buffer with a whitespace-delimited
//! description string. The first token is the per-column type-code
//! sequence; every later token is a column name whose element type is the
//! code character at the same index. Example: `"dl pagerank iterations"`
//! declares an f64 column `pagerank` followed by an i64 column
//! `iterations`, laid out vertex-major within each column.

use crate::error::{Result, RpcError};

/// Element type of one column, keyed by its single-character code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
    F32,
    F64,
    I32,
    I64,
    U8,
}

impl ElemType {
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'f' => Some(ElemType::F32),
            'd' => Some(ElemType::F64),
            'i' => Some(ElemType::I32),
            'l' => Some(ElemType::I64),
            'b' => Some(ElemType::U8),
            _ => None,
        }
    }

    /// Byte stride of one element.
    pub fn size(&self) -> usize {
        match self {
            ElemType::F32 => 4,
            ElemType::F64 => 8,
            ElemType::I32 => 4,
            ElemType::I64 => 8,
            ElemType::U8 => 1,
        }
    }
}

/// One named column and its byte offset inside the packed buffer.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: ElemType,
    pub offset: usize,
}

/// Parsed, offset-resolved description of an algorithm buffer.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<Column>,
    packed_len: usize,
}

impl Schema {
    /// Parse a description string against a vertex count.
    ///
    /// Offsets advance by `nv * size` per column, so the columns partition
    /// `[0, packed_len)` without gap or overlap. Trailing unused code
    /// characters are tolerated; a name without a code character, an
    /// unknown code, or a duplicate name is an error.
    pub fn parse(description: &str, nv: i64) -> Result<Schema> {
        let mut tokens = description.split_whitespace();
        let codes: Vec<char> = match tokens.next() {
            Some(header) => header.chars().collect(),
            None => {
                return Err(RpcError::SchemaMalformed(
                    "description string is empty".to_string(),
                ))
            }
        };

        let nv = nv.max(0) as usize;
        let mut columns: Vec<Column> = Vec::new();
        let mut offset = 0usize;

        for (index, name) in tokens.enumerate() {
            let code = *codes.get(index).ok_or_else(|| {
                RpcError::SchemaMalformed(format!("no type code for column '{}'", name))
            })?;
            let ty = ElemType::from_code(code).ok_or_else(|| {
                RpcError::SchemaMalformed(format!("unknown type code '{}'", code))
            })?;
            if columns.iter().any(|c| c.name == name) {
                return Err(RpcError::SchemaMalformed(format!(
                    "duplicate column name '{}'",
                    name
                )));
            }
            columns.push(Column {
                name: name.to_string(),
                ty,
                offset,
            });
            offset += nv * ty.size();
        }

        Ok(Schema {
            columns,
            packed_len: offset,
        })
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Total byte length a conforming buffer must have.
    pub fn packed_len(&self) -> usize {
        self.packed_len
    }
}
