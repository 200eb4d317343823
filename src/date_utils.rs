use chrono::{Datelike, Local, NaiveDate};

/// A calendar month as used by the `month=YYYY-MM` filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Month {
    first_day: NaiveDate,
}

impl Month {
    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first_day: date.with_day(1).unwrap_or(date),
        }
    }

    /// Parse `YYYY-MM`; anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let (year, month) = s.trim().split_once('-')?;
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1).map(|first_day| Self { first_day })
    }

    pub fn prev(&self) -> Self {
        let last_of_prev = self.first_day.pred_opt().unwrap_or(self.first_day);
        Self::containing(last_of_prev)
    }

    pub fn next(&self) -> Self {
        let (year, month) = if self.first_day.month() == 12 {
            (self.first_day.year() + 1, 1)
        } else {
            (self.first_day.year(), self.first_day.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| Self { first_day })
            .unwrap_or(*self)
    }

    pub fn as_param(&self) -> String {
        self.first_day.format("%Y-%m").to_string()
    }

    /// e.g. "March 2024"
    pub fn label(&self) -> String {
        self.first_day.format("%B %Y").to_string()
    }
}

/// `2024-03-14` as "Mar 14, 2024"; unparseable dates are shown as given.
pub fn format_date(raw: &str) -> String {
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => date.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}
