use serde::{Deserialize, Serialize};

use super::lenient::{lenient_f64, lenient_string};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(default)]
    pub bucket_id: Option<i64>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub spender: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Transaction {
    pub fn bucket_label(&self) -> &str {
        self.bucket_name.as_deref().unwrap_or("Uncategorized")
    }

    pub fn spender_label(&self) -> &str {
        self.spender.as_deref().unwrap_or("Joint")
    }
}

/// One page of `GET /transactions`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionPage {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub total: i64,
}

/// Filters forwarded to `GET /transactions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    pub search: Option<String>,
    pub bucket_id: Option<i64>,
    pub spender: Option<String>,
    pub month: Option<String>,
    pub page: i64,
    pub page_size: i64,
}

impl TransactionQuery {
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            params.push(("search", search.clone()));
        }
        if let Some(bucket_id) = self.bucket_id {
            params.push(("bucket_id", bucket_id.to_string()));
        }
        if let Some(spender) = self.spender.as_ref().filter(|s| !s.is_empty()) {
            params.push(("spender", spender.clone()));
        }
        if let Some(month) = self.month.as_ref().filter(|s| !s.is_empty()) {
            params.push(("month", month.clone()));
        }
        params.push(("page", self.page.max(1).to_string()));
        params.push(("page_size", self.page_size.max(1).to_string()));
        params
    }
}

/// Fields the user may change on an existing transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionAssignment {
    pub bucket_id: Option<i64>,
    pub spender: Option<String>,
}

/// One line of a submitted split, sign and date already applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitLinePayload {
    pub description: String,
    pub amount: f64,
    pub bucket_id: Option<i64>,
    pub date: String,
}
