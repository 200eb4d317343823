use serde::{Deserialize, Serialize};

use super::lenient::{lenient_f64, lenient_i64, lenient_opt_string, lenient_string};

/// Node/link graph returned by `GET /cashflow`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SankeyGraph {
    #[serde(default)]
    pub nodes: Vec<SankeyNode>,
    #[serde(default)]
    pub links: Vec<SankeyLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyNode {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub group: Option<String>,
}

/// Endpoints are signed so that malformed indices survive decoding and are
/// rejected by the sanitizer instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SankeyLink {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub source: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub target: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub value: f64,
}
