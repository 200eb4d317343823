use serde::{Deserialize, Serialize};

use super::lenient::{lenient_f64, lenient_group, lenient_string};
use super::settings::BudgetMode;

/// Top-level budget classification of a bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BucketGroup {
    Income,
    #[serde(rename = "Non-Discretionary")]
    NonDiscretionary,
    #[default]
    Discretionary,
}

impl BucketGroup {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "non-discretionary" | "nondiscretionary" | "needs" => Some(Self::NonDiscretionary),
            "discretionary" | "wants" => Some(Self::Discretionary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::NonDiscretionary => "Non-Discretionary",
            Self::Discretionary => "Discretionary",
        }
    }

    /// Short household label shown on section headers.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::NonDiscretionary => "Needs",
            Self::Discretionary => "Wants",
        }
    }

    pub fn all() -> &'static [BucketGroup] {
        &[Self::NonDiscretionary, Self::Discretionary, Self::Income]
    }
}

/// A budget bucket as owned by the backend.
///
/// Every field except `id` and `name` may be absent from a payload; defaults
/// are resolved once by the tree builder, not by consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_group")]
    pub group: Option<BucketGroup>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub rollover: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub limit_a: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub limit_b: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Bucket {
    /// Monthly limit for the household's budget mode.
    pub fn monthly_limit(&self, mode: BudgetMode) -> f64 {
        match mode {
            BudgetMode::Single => self.limit_a,
            BudgetMode::Couple => self.limit_a + self.limit_b,
        }
    }

    pub fn icon_tag(&self) -> &str {
        self.icon.as_deref().filter(|i| !i.is_empty()).unwrap_or("folder")
    }
}

/// Tree-shaped bucket payload (`GET /buckets/tree`).
#[derive(Debug, Clone, Deserialize)]
pub struct BucketRecord {
    #[serde(flatten)]
    pub bucket: Bucket,
    #[serde(default)]
    pub children: Vec<BucketRecord>,
}

/// A bucket in a built tree. `group` is the effective group after defaulting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketNode {
    pub bucket: Bucket,
    pub group: BucketGroup,
    pub children: Vec<BucketNode>,
}

impl BucketNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(BucketNode::size).sum::<usize>()
    }
}

/// Flattened tree entry for hierarchical `<select>` options.
#[derive(Debug, Clone, Serialize)]
pub struct BucketOption {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub depth: usize,
    pub group: BucketGroup,
}

impl BucketOption {
    pub fn indent(&self) -> String {
        "\u{00a0}\u{00a0}".repeat(self.depth)
    }

    pub fn display_name(&self) -> String {
        if self.depth > 0 {
            format!("{}└ {}", self.indent(), self.name)
        } else {
            self.name.clone()
        }
    }
}

/// Body for creating or replacing a bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBucket {
    pub name: String,
    pub group: BucketGroup,
    pub parent_id: Option<i64>,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub rollover: bool,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub limit_a: f64,
    #[serde(default)]
    pub limit_b: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewBucket {
    pub fn from_bucket(bucket: &Bucket, group: BucketGroup) -> Self {
        Self {
            name: bucket.name.clone(),
            group,
            parent_id: bucket.parent_id,
            icon: bucket.icon_tag().to_string(),
            rollover: bucket.rollover,
            is_shared: bucket.is_shared,
            limit_a: bucket.limit_a,
            limit_b: bucket.limit_b,
            tags: bucket.tags.clone(),
        }
    }
}

fn default_icon() -> String {
    "folder".to_string()
}

/// Split a comma-separated tag field into trimmed, de-duplicated labels.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
