use serde::{Deserialize, Serialize};

use super::category::BucketGroup;
use super::lenient::{lenient_f64, lenient_f64_vec, lenient_group, lenient_index, lenient_string};

/// Whose spending a performance or transaction view covers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Spender {
    #[default]
    Combined,
    Joint,
    Member(String),
}

impl Spender {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "Combined" | "combined" => Self::Combined,
            "Joint" | "joint" => Self::Joint,
            name => Self::Member(name.to_string()),
        }
    }

    pub fn as_param(&self) -> &str {
        match self {
            Self::Combined => "Combined",
            Self::Joint => "Joint",
            Self::Member(name) => name,
        }
    }

    pub fn is(&self, value: &str) -> bool {
        self.as_param() == value
    }
}

/// `GET /performance` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceResponse {
    #[serde(default)]
    pub months: Vec<String>,
    #[serde(default)]
    pub categories: Vec<CategoryPerformance>,
    #[serde(default, deserialize_with = "lenient_index")]
    pub current_month_index: Option<usize>,
}

/// Per-bucket spend series. `spend_by_month[i]` belongs to `months[i]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPerformance {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_group")]
    pub group: Option<BucketGroup>,
    #[serde(default, deserialize_with = "lenient_f64_vec")]
    pub spend_by_month: Vec<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub budget_limit: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average: f64,
    #[serde(default)]
    pub children: Vec<CategoryPerformance>,
}
