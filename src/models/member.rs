use serde::{Deserialize, Serialize};

use super::lenient::lenient_string;

/// Default swatches offered when adding a household member.
pub const MEMBER_PALETTE: &[(&str, &str)] = &[
    ("Blue", "#3b82f6"),
    ("Green", "#22c55e"),
    ("Amber", "#f59e0b"),
    ("Rose", "#f43f5e"),
    ("Violet", "#8b5cf6"),
    ("Teal", "#14b8a6"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#6b7280".to_string()
}
