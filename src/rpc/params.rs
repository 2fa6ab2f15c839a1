//! Parameter extraction for the RPC methods.
//!
//! Each method declares a serde struct; optional fields carry the wire
//! defaults. A deserialization failure is a parameter error (-32602),
//! never an internal one. Unknown extra fields are ignored, which lets
//! `register` carry kind-specific parameters next to `type`.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, RpcError};
use crate::graph::GraphView;

/// Deserialize a method's parameter object; a missing object behaves
/// like an empty one so methods with only optional fields accept both.
pub fn parse<T: DeserializeOwned>(params: Option<Value>) -> Result<T> {
    let value = params.unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

/// A vertex parameter: a numeric id, or an external name to resolve.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VertexRef {
    Id(i64),
    Name(String),
}

impl VertexRef {
    pub fn resolve(&self, graph: &dyn GraphView) -> Result<i64> {
        match self {
            VertexRef::Id(id) => Ok(*id),
            VertexRef::Name(name) => graph.lookup(name).ok_or_else(|| {
                RpcError::InvalidParams(format!("unknown vertex name '{}'", name))
            }),
        }
    }
}

fn default_stride() -> i64 {
    1
}

fn default_order() -> String {
    "DESC".to_string()
}

#[derive(Debug, Deserialize)]
pub struct BfsParams {
    pub source: VertexRef,
    pub target: VertexRef,
    #[serde(default)]
    pub strings: bool,
}

#[derive(Debug, Deserialize)]
pub struct DataArrayParams {
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub strings: bool,
    #[serde(default = "default_stride")]
    pub stride: i64,
    #[serde(default)]
    pub samples: i64,
    #[serde(default, rename = "log")]
    pub log_scale: bool,
}

#[derive(Debug, Deserialize)]
pub struct DataArrayRangeParams {
    #[serde(flatten)]
    pub array: DataArrayParams,
    pub offset: i64,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct DataArraySortedParams {
    #[serde(flatten)]
    pub range: DataArrayRangeParams,
    #[serde(default = "default_order")]
    pub order: String,
}

#[derive(Debug, Deserialize)]
pub struct DataArraySetParams {
    pub name: String,
    pub data: String,
    pub set: Vec<i64>,
    #[serde(default)]
    pub strings: bool,
}

#[derive(Debug, Deserialize)]
pub struct DescriptionParams {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterParams {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct RequestParams {
    pub session_id: i64,
    #[serde(default)]
    pub strings: bool,
}
