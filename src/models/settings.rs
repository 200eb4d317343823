use crate::filters;
use serde::{Deserialize, Serialize};

use super::lenient::lenient_string;

/// Single-earner budgets carry one limit per bucket; couples carry two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetMode {
    #[default]
    Single,
    Couple,
}

impl BudgetMode {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "couple" => Self::Couple,
            _ => Self::Single,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Couple => "couple",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub budget_mode: BudgetMode,
    #[serde(default = "default_partner_a", deserialize_with = "lenient_string")]
    pub partner_a: String,
    #[serde(default = "default_partner_b", deserialize_with = "lenient_string")]
    pub partner_b: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_partner_a() -> String {
    "Partner A".into()
}

fn default_partner_b() -> String {
    "Partner B".into()
}

fn default_currency() -> String {
    "USD".into()
}

fn default_locale() -> String {
    "en-US".into()
}

fn default_theme() -> String {
    "system".into()
}

fn default_page_size() -> i64 {
    25
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            budget_mode: BudgetMode::Single,
            partner_a: default_partner_a(),
            partner_b: default_partner_b(),
            currency: default_currency(),
            locale: default_locale(),
            theme: default_theme(),
            page_size: default_page_size(),
        }
    }
}

impl Settings {
    pub fn is_couple(&self) -> bool {
        self.budget_mode == BudgetMode::Couple
    }

    pub fn is_theme(&self, value: &str) -> bool {
        self.theme == value
    }

    pub fn is_currency(&self, value: &str) -> bool {
        self.currency == value
    }

    pub fn is_locale(&self, value: &str) -> bool {
        self.locale == value
    }

    pub fn is_page_size(&self, size: &i64) -> bool {
        self.page_size == *size
    }

    pub fn is_dark(&self) -> bool {
        self.theme == "dark"
    }

    /// Format an amount with locale formatting and sign coloring.
    pub fn format_money(&self, amount: &f64) -> String {
        filters::format_money(*amount, &self.currency, &self.locale)
    }

    /// Format an amount as plain text without HTML/colors.
    pub fn format_money_plain(&self, amount: &f64) -> String {
        filters::format_money_plain(*amount, &self.currency, &self.locale)
    }

    /// Format an amount without sign or color (limits, averages).
    pub fn format_money_neutral(&self, amount: &f64) -> String {
        filters::format_money_neutral(*amount, &self.currency, &self.locale)
    }

    /// Format an optional variance; `None` renders the placeholder dash.
    pub fn format_variance(&self, variance: &Option<f64>) -> String {
        match variance {
            Some(v) => filters::format_money_plain(*v, &self.currency, &self.locale),
            None => filters::PLACEHOLDER.to_string(),
        }
    }
}
