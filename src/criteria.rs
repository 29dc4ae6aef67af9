use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::Filters;
use crate::error::{Result, ScrapeError};

/// Dates exactly as typed into the search form.
pub const FORM_DATE: &str = "%m/%d/%Y";

/// One row of the date-range file. Empty means "no bound".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DateRange {
    pub born_after: String,
    pub born_before: String,
}

impl DateRange {
    pub fn new(born_after: impl Into<String>, born_before: impl Into<String>) -> Self {
        DateRange {
            born_after: born_after.into(),
            born_before: born_before.into(),
        }
    }
}

/// Everything that determines a single scrape run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub breed: String,
    pub breed_group: String,
    pub gender: String,
    pub born_after: String,
    pub born_before: String,
}

impl SearchCriteria {
    pub fn new(filters: &Filters, range: &DateRange) -> Self {
        SearchCriteria {
            breed: filters.breed.clone(),
            breed_group: filters.breed_group.clone(),
            gender: filters.gender.clone(),
            born_after: range.born_after.clone(),
            born_before: range.born_before.clone(),
        }
    }
}

fn check_form_date(value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    NaiveDate::parse_from_str(value, FORM_DATE)
        .map(|_| ())
        .map_err(|_| ScrapeError::parse("search date (MM/DD/YYYY)", value))
}

/// Read the date-range CSV. Needs `born_after` and `born_before` columns;
/// any others are ignored.
pub fn load_date_ranges(path: &Path) -> Result<Vec<DateRange>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| ScrapeError::Input(format!("{}: {}", path.display(), e)))?;
    parse_ranges(&mut reader)
}

fn parse_ranges<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<DateRange>> {
    let mut ranges = Vec::new();
    for row in reader.deserialize() {
        let range: DateRange = row?;
        check_form_date(&range.born_after)?;
        check_form_date(&range.born_before)?;
        ranges.push(range);
    }
    Ok(ranges)
}
