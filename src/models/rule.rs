use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::lenient::lenient_string;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    StartsWith,
    Regex,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Contains => "contains",
            MatchType::Exact => "exact",
            MatchType::StartsWith => "starts_with",
            MatchType::Regex => "regex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(MatchType::Contains),
            "exact" => Some(MatchType::Exact),
            "starts_with" => Some(MatchType::StartsWith),
            "regex" => Some(MatchType::Regex),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            MatchType::Contains => "Contains",
            MatchType::Exact => "Exact",
            MatchType::StartsWith => "Starts with",
            MatchType::Regex => "Regex",
        }
    }

    pub fn all() -> &'static [MatchType] {
        &[
            MatchType::Contains,
            MatchType::Exact,
            MatchType::StartsWith,
            MatchType::Regex,
        ]
    }

    /// Local preview of a pattern against one description. Rule execution
    /// itself happens on the backend.
    pub fn matches(&self, pattern: &str, description: &str) -> Result<bool, RuleError> {
        let needle = pattern.trim().to_lowercase();
        let haystack = description.trim().to_lowercase();
        Ok(match self {
            MatchType::Contains => haystack.contains(&needle),
            MatchType::Exact => haystack == needle,
            MatchType::StartsWith => haystack.starts_with(&needle),
            MatchType::Regex => RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| RuleError::InvalidRegex(e.to_string()))?
                .is_match(description),
        })
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Pattern is required")]
    MissingPattern,
    #[error("Choose a bucket for this rule")]
    MissingBucket,
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub bucket_id: Option<i64>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub spender: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub pattern: String,
    pub match_type: MatchType,
    pub bucket_id: Option<i64>,
    pub spender: Option<String>,
    pub priority: i64,
}

impl NewRule {
    /// Checks that must pass before the rule is sent to the backend.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.pattern.trim().is_empty() {
            return Err(RuleError::MissingPattern);
        }
        if self.bucket_id.is_none() {
            return Err(RuleError::MissingBucket);
        }
        if self.match_type == MatchType::Regex {
            RegexBuilder::new(&self.pattern)
                .build()
                .map_err(|e| RuleError::InvalidRegex(e.to_string()))?;
        }
        Ok(())
    }
}

/// Rule proposed by the backend from uncategorized transaction history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSuggestion {
    #[serde(default, deserialize_with = "lenient_string")]
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub bucket_id: Option<i64>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub match_count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyRulesResult {
    #[serde(default)]
    pub updated: i64,
}
