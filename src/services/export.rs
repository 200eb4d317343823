use csv::Writer;

use crate::error::{AppError, AppResult};
use crate::services::performance::{BudgetStatus, PerformanceView};

/// Performance spreadsheet as CSV: one column per month, then the limit,
/// average and variances for the selected month. Empty cells mean "not set".
pub fn performance_csv(view: &PerformanceView) -> AppResult<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());

    let mut header: Vec<String> = vec!["Bucket".into(), "Group".into()];
    header.extend(view.months.iter().cloned());
    header.extend(
        [
            "Budget limit",
            "Average",
            "Variance vs budget",
            "Variance vs average",
            "Status",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    writer.write_record(&header)?;

    for row in &view.rows {
        let mut record: Vec<String> = vec![
            row.path.clone(),
            row.group
                .map(|g| g.label().to_string())
                .unwrap_or_default(),
        ];
        for i in 0..view.months.len() {
            record.push(
                row.spend_by_month
                    .get(i)
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_default(),
            );
        }
        record.push(optional(row.budget_limit));
        record.push(optional(row.average));
        record.push(optional(row.variance_vs_budget));
        record.push(optional(row.variance_vs_average));
        record.push(
            match row.status {
                BudgetStatus::Over => "over",
                BudgetStatus::Under => "under",
                BudgetStatus::NoBudget => "",
            }
            .to_string(),
        );
        writer.write_record(&record)?;
    }

    tracing::debug!(rows = view.rows.len(), "exported performance csv");
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV flush failed: {}", e)))
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}
