//! Split editing: dividing one transaction into categorized lines whose
//! amounts add up to the original.
//!
//! Amounts stay free text while editing so half-typed values such as `-` or
//! `12.` survive a round trip. They are parsed only for balance checks and
//! on submit; anything unparseable counts as zero.

use serde::Serialize;
use thiserror::Error;

use crate::models::{SplitLinePayload, Transaction};

/// Largest difference between the line total and the original amount that
/// still counts as balanced.
pub const BALANCE_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplitError {
    #[error("Split lines must add up to {expected:.2}; they currently total {actual:.2}")]
    Unbalanced { expected: f64, actual: f64 },

    #[error("A split needs at least two lines")]
    TooFewLines,

    #[error("There is no split line {0}")]
    NoSuchLine(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SplitLine {
    pub description: String,
    pub amount: String,
    pub bucket_id: Option<i64>,
}

impl SplitLine {
    pub fn parsed_amount(&self) -> f64 {
        parse_amount(&self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitEditor {
    transaction_id: i64,
    original_amount: f64,
    date: String,
    lines: Vec<SplitLine>,
}

impl SplitEditor {
    /// Two lines: the full original amount, then an empty line.
    pub fn initialize(transaction: &Transaction) -> Self {
        let first = SplitLine {
            description: transaction.description.clone(),
            amount: format_amount(transaction.amount.abs()),
            bucket_id: transaction.bucket_id,
        };
        Self {
            transaction_id: transaction.id,
            original_amount: transaction.amount,
            date: transaction.date.clone(),
            lines: vec![first, SplitLine::default()],
        }
    }

    /// Resume an edit from submitted form lines. Fewer than two lines are
    /// padded back to two.
    pub fn resume(transaction: &Transaction, mut lines: Vec<SplitLine>) -> Self {
        while lines.len() < 2 {
            lines.push(SplitLine::default());
        }
        Self {
            transaction_id: transaction.id,
            original_amount: transaction.amount,
            date: transaction.date.clone(),
            lines,
        }
    }

    pub fn transaction_id(&self) -> i64 {
        self.transaction_id
    }

    pub fn lines(&self) -> &[SplitLine] {
        &self.lines
    }

    pub fn original_abs(&self) -> f64 {
        self.original_amount.abs()
    }

    pub fn can_remove(&self) -> bool {
        self.lines.len() > 2
    }

    pub fn add_line(&mut self) {
        self.lines.push(SplitLine::default());
    }

    pub fn remove_line(&mut self, index: usize) -> Result<(), SplitError> {
        if index >= self.lines.len() {
            return Err(SplitError::NoSuchLine(index));
        }
        if !self.can_remove() {
            return Err(SplitError::TooFewLines);
        }
        self.lines.remove(index);
        Ok(())
    }

    /// Store the raw text for one line. With exactly two lines and a numeric
    /// value no larger than the original, the other line becomes the
    /// remainder. Editing the other line afterwards simply wins.
    pub fn set_amount(&mut self, index: usize, raw: &str) -> Result<(), SplitError> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(SplitError::NoSuchLine(index))?;
        line.amount = raw.to_string();

        if self.lines.len() == 2 {
            if let Some(value) = parse_strict(raw) {
                let original = self.original_abs();
                if value <= original {
                    self.lines[1 - index].amount = format_amount(round2(original - value));
                }
            }
        }
        Ok(())
    }

    pub fn set_description(&mut self, index: usize, description: &str) -> Result<(), SplitError> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(SplitError::NoSuchLine(index))?;
        line.description = description.to_string();
        Ok(())
    }

    pub fn set_bucket(&mut self, index: usize, bucket_id: Option<i64>) -> Result<(), SplitError> {
        let line = self
            .lines
            .get_mut(index)
            .ok_or(SplitError::NoSuchLine(index))?;
        line.bucket_id = bucket_id;
        Ok(())
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(SplitLine::parsed_amount).sum()
    }

    /// Original amount minus the current total.
    pub fn remaining(&self) -> f64 {
        round2(self.original_abs() - self.total())
    }

    pub fn is_balanced(&self) -> bool {
        (self.total() - self.original_abs()).abs() < BALANCE_EPSILON
    }

    /// Lines ready for the backend: the original sign re-applied and the
    /// original date inherited.
    pub fn submit(&self) -> Result<Vec<SplitLinePayload>, SplitError> {
        if !self.is_balanced() {
            return Err(SplitError::Unbalanced {
                expected: self.original_abs(),
                actual: self.total(),
            });
        }
        let sign = if self.original_amount < 0.0 { -1.0 } else { 1.0 };
        Ok(self
            .lines
            .iter()
            .map(|line| SplitLinePayload {
                description: line.description.trim().to_string(),
                amount: round2(line.parsed_amount()) * sign,
                bucket_id: line.bucket_id,
                date: self.date.clone(),
            })
            .collect())
    }
}

fn parse_strict(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Lenient parse used for totals: unparseable text is zero.
pub fn parse_amount(raw: &str) -> f64 {
    parse_strict(raw).unwrap_or(0.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction(amount: f64) -> Transaction {
        Transaction {
            id: 42,
            date: "2024-03-14".into(),
            description: "Costco".into(),
            amount,
            bucket_id: Some(7),
            bucket_name: Some("Groceries".into()),
            spender: None,
            account_name: None,
            notes: None,
        }
    }

    #[test]
    fn test_initialize_seeds_two_lines() {
        let editor = SplitEditor::initialize(&transaction(-100.0));
        assert_eq!(editor.lines().len(), 2);
        assert_eq!(editor.lines()[0].description, "Costco");
        assert_eq!(editor.lines()[0].amount, "100.00");
        assert_eq!(editor.lines()[0].bucket_id, Some(7));
        assert_eq!(editor.lines()[1], SplitLine::default());
        assert!(editor.is_balanced());
    }

    #[test]
    fn test_two_line_auto_balance() {
        let mut editor = SplitEditor::initialize(&transaction(-100.0));
        editor.set_amount(0, "30.00").unwrap();
        assert_eq!(editor.lines()[1].amount, "70.00");

        editor.set_amount(1, "25.5").unwrap();
        assert_eq!(editor.lines()[0].amount, "74.50");
        assert!(editor.is_balanced());
    }

    #[test]
    fn test_no_rebalance_above_original_or_while_typing() {
        let mut editor = SplitEditor::initialize(&transaction(-100.0));
        editor.set_amount(0, "30").unwrap();
        editor.set_amount(0, "150").unwrap();
        assert_eq!(editor.lines()[1].amount, "70.00");

        editor.set_amount(0, "-").unwrap();
        assert_eq!(editor.lines()[0].amount, "-");
        assert_eq!(editor.lines()[1].amount, "70.00");
        assert_eq!(editor.total(), 70.0);
    }

    #[test]
    fn test_no_auto_balance_with_three_lines() {
        let mut editor = SplitEditor::initialize(&transaction(-100.0));
        editor.add_line();
        editor.set_amount(0, "40").unwrap();
        assert_eq!(editor.lines()[1].amount, "");
        assert_eq!(editor.remaining(), 60.0);
    }

    #[test]
    fn test_remove_keeps_two_lines() {
        let mut editor = SplitEditor::initialize(&transaction(-50.0));
        assert_eq!(editor.remove_line(1), Err(SplitError::TooFewLines));
        editor.add_line();
        assert!(editor.remove_line(2).is_ok());
        assert_eq!(editor.lines().len(), 2);
        assert_eq!(editor.remove_line(5), Err(SplitError::NoSuchLine(5)));
    }

    #[test]
    fn test_submit_requires_balance() {
        let mut editor = SplitEditor::initialize(&transaction(-100.0));
        editor.add_line();
        editor.set_amount(0, "50").unwrap();
        editor.set_amount(1, "30").unwrap();
        assert!(matches!(
            editor.submit(),
            Err(SplitError::Unbalanced { expected, actual }) if expected == 100.0 && actual == 80.0
        ));
        editor.set_amount(2, "20.004").unwrap();
        assert!(editor.submit().is_ok());
    }

    #[test]
    fn test_submit_reapplies_sign_and_date() {
        let mut editor = SplitEditor::initialize(&transaction(-100.0));
        editor.set_amount(0, "30").unwrap();
        editor.set_description(1, "  Household  ").unwrap();
        editor.set_bucket(1, Some(9)).unwrap();
        let lines = editor.submit().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].amount, -30.0);
        assert_eq!(lines[1].amount, -70.0);
        assert_eq!(lines[1].description, "Household");
        assert_eq!(lines[1].bucket_id, Some(9));
        assert!(lines.iter().all(|l| l.date == "2024-03-14"));

        let income = SplitEditor::initialize(&transaction(250.0)).submit().unwrap();
        assert_eq!(income[0].amount, 250.0);
    }

    #[test]
    fn test_submit_iff_balanced_over_edit_sequences() {
        let inputs = ["10", "abc", "", "33.33", "66.67", "100", "-5", "0.004", "99.995", "12,5"];
        for (i, a) in inputs.iter().enumerate() {
            for b in inputs.iter().skip(i) {
                for c in inputs.iter() {
                    let mut editor = SplitEditor::initialize(&transaction(-100.0));
                    editor.add_line();
                    editor.set_amount(0, a).unwrap();
                    editor.set_amount(1, b).unwrap();
                    editor.set_amount(2, c).unwrap();
                    let sum: f64 = [a, b, c].iter().map(|s| parse_amount(s)).sum();
                    let balanced = (sum - 100.0).abs() < BALANCE_EPSILON;
                    assert_eq!(editor.submit().is_ok(), balanced, "{} {} {}", a, b, c);
                }
            }
        }
    }

    #[test]
    fn test_resume_pads_lines() {
        let editor = SplitEditor::resume(&transaction(-20.0), vec![]);
        assert_eq!(editor.lines().len(), 2);
        assert!(!editor.is_balanced());
    }
}
