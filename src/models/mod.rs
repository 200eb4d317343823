pub mod cashflow;
pub mod category;
pub mod chat;
pub mod lenient;
pub mod member;
pub mod performance;
pub mod rule;
pub mod settings;
pub mod transaction;

pub use cashflow::{SankeyGraph, SankeyLink, SankeyNode};
pub use category::{Bucket, BucketGroup, BucketNode, BucketOption, BucketRecord, NewBucket};
pub use chat::{ChatMessage, ChatReply, ChatRequest, ChatRole};
pub use member::{Member, NewMember, MEMBER_PALETTE};
pub use performance::{CategoryPerformance, PerformanceResponse, Spender};
pub use rule::{ApplyRulesResult, MatchType, NewRule, Rule, RuleError, RuleSuggestion};
pub use settings::{BudgetMode, Settings};
pub use transaction::{
    SplitLinePayload, Transaction, TransactionAssignment, TransactionPage, TransactionQuery,
};
