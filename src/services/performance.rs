//! Variance math over the backend's monthly performance series.

use serde::Serialize;

use crate::models::{BucketGroup, CategoryPerformance, PerformanceResponse};

/// Budget standing of one row for the selected month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Over,
    Under,
    NoBudget,
}

impl BudgetStatus {
    pub fn is_over(&self) -> bool {
        matches!(self, BudgetStatus::Over)
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            BudgetStatus::Over => "text-red-600 dark:text-red-400 font-semibold",
            BudgetStatus::Under => "text-green-600 dark:text-green-400",
            BudgetStatus::NoBudget => "text-gray-500 dark:text-gray-400",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceRow {
    pub id: Option<i64>,
    pub name: String,
    /// `Parent > Child` path, used by exports.
    pub path: String,
    pub group: Option<BucketGroup>,
    pub depth: usize,
    /// Series in month order, exactly as received.
    pub spend_by_month: Vec<f64>,
    /// Spend in the selected month; `None` when the series has no entry.
    pub spend: Option<f64>,
    pub budget_limit: Option<f64>,
    pub average: Option<f64>,
    pub variance_vs_budget: Option<f64>,
    pub variance_vs_average: Option<f64>,
    pub status: BudgetStatus,
}

impl PerformanceRow {
    /// Share of the limit used in the selected month, in percent.
    pub fn percent_used(&self) -> Option<f64> {
        match (self.spend, self.budget_limit) {
            (Some(spend), Some(limit)) => Some(spend / limit * 100.0),
            _ => None,
        }
    }

    /// Bar width for the progress meter, clamped to 0..=100.
    pub fn meter_width(&self) -> u8 {
        self.percent_used()
            .map(|p| p.clamp(0.0, 100.0).round() as u8)
            .unwrap_or(0)
    }

    pub fn above_average(&self) -> bool {
        self.variance_vs_average.is_some_and(|v| v > 0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupTotal {
    pub group: BucketGroup,
    pub spend: f64,
    pub budget_limit: f64,
}

impl GroupTotal {
    pub fn remaining(&self) -> f64 {
        self.budget_limit - self.spend
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceView {
    pub months: Vec<String>,
    pub selected_month: Option<usize>,
    pub rows: Vec<PerformanceRow>,
    /// Sums of top-level rows per group for the selected month.
    pub totals: Vec<GroupTotal>,
}

impl PerformanceView {
    pub fn selected_label(&self) -> &str {
        self.selected_month
            .and_then(|i| self.months.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_selected(&self, index: &usize) -> bool {
        self.selected_month == Some(*index)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn over_budget_count(&self) -> usize {
        self.rows.iter().filter(|r| r.status.is_over()).count()
    }
}

/// Month shown when the user has not picked one: the server's current month
/// when it is in range, otherwise the most recent month.
pub fn default_month_index(response: &PerformanceResponse) -> Option<usize> {
    let len = response.months.len();
    if len == 0 {
        return None;
    }
    response
        .current_month_index
        .filter(|&i| i < len)
        .or(Some(len - 1))
}

/// An explicit, in-range selection wins over the default.
pub fn select_month(response: &PerformanceResponse, requested: Option<usize>) -> Option<usize> {
    requested
        .filter(|&i| i < response.months.len())
        .or_else(|| default_month_index(response))
}

/// `spend − limit`, only meaningful when a limit is set.
pub fn variance_vs_budget(spend: f64, budget_limit: f64) -> Option<f64> {
    (budget_limit > 0.0).then_some(spend - budget_limit)
}

/// `spend − average`, only meaningful when an average is available.
pub fn variance_vs_average(spend: f64, average: f64) -> Option<f64> {
    (average > 0.0).then_some(spend - average)
}

pub fn budget_status(variance: Option<f64>) -> BudgetStatus {
    match variance {
        Some(v) if v > 0.0 => BudgetStatus::Over,
        Some(_) => BudgetStatus::Under,
        None => BudgetStatus::NoBudget,
    }
}

/// Combine a performance payload with the selected month into display rows.
/// Children follow their parent, depth-first.
pub fn aggregate(response: &PerformanceResponse, requested: Option<usize>) -> PerformanceView {
    let selected = select_month(response, requested);
    let mut rows = Vec::new();
    for category in &response.categories {
        push_rows(category, 0, "", selected, &mut rows);
    }

    let mut totals: Vec<GroupTotal> = Vec::new();
    for row in rows.iter().filter(|r| r.depth == 0) {
        let group = row.group.unwrap_or_default();
        let idx = match totals.iter().position(|t| t.group == group) {
            Some(idx) => idx,
            None => {
                totals.push(GroupTotal {
                    group,
                    spend: 0.0,
                    budget_limit: 0.0,
                });
                totals.len() - 1
            }
        };
        totals[idx].spend += row.spend.unwrap_or(0.0);
        totals[idx].budget_limit += row.budget_limit.unwrap_or(0.0);
    }

    PerformanceView {
        months: response.months.clone(),
        selected_month: selected,
        rows,
        totals,
    }
}

fn push_rows(
    category: &CategoryPerformance,
    depth: usize,
    prefix: &str,
    selected: Option<usize>,
    out: &mut Vec<PerformanceRow>,
) {
    let spend = selected.and_then(|i| category.spend_by_month.get(i).copied());
    let variance_budget = spend.and_then(|s| variance_vs_budget(s, category.budget_limit));
    let variance_average = spend.and_then(|s| variance_vs_average(s, category.average));
    let name = if category.name.trim().is_empty() {
        "Unnamed".to_string()
    } else {
        category.name.clone()
    };
    let path = if prefix.is_empty() {
        name.clone()
    } else {
        format!("{} > {}", prefix, name)
    };

    out.push(PerformanceRow {
        id: category.id,
        name,
        path: path.clone(),
        group: category.group,
        depth,
        spend_by_month: category.spend_by_month.clone(),
        spend,
        budget_limit: (category.budget_limit > 0.0).then_some(category.budget_limit),
        average: (category.average > 0.0).then_some(category.average),
        variance_vs_budget: variance_budget,
        variance_vs_average: variance_average,
        status: budget_status(variance_budget),
    });

    for child in &category.children {
        push_rows(child, depth + 1, &path, selected, out);
    }
}
