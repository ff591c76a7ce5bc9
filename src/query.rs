//! Query engine over the loaded dataset.
//!
//! Two operations:
//! - exact lookup by identifier (first match in load order wins)
//! - multi-predicate filtering (identifier substring + inclusive numeric
//!   ranges on TABVPM and FDY IN MONTH) with a stable descending sort by
//!   Final Score
//!
//! Filter bounds arrive as raw form text and are validated here; a
//! non-numeric bound is a [`ValidationError`], never a crash.

use crate::data::{Dataset, ScoreRecord};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid value for {field}: '{value}' is not a number")]
    InvalidBound { field: &'static str, value: String },
}

/// Raw filter form input, exactly as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub search_number: Option<String>,
    #[serde(default)]
    pub tabvpm_min: Option<String>,
    #[serde(default)]
    pub tabvpm_max: Option<String>,
    #[serde(default)]
    pub fdy_min: Option<String>,
    #[serde(default)]
    pub fdy_max: Option<String>,
}

/// Validated filter predicates. Absent predicates are no-ops; supplied
/// predicates combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreFilters {
    pub search_number: Option<String>,
    pub tabvpm_min: Option<f64>,
    pub tabvpm_max: Option<f64>,
    pub fdy_min: Option<f64>,
    pub fdy_max: Option<f64>,
}

impl ScoreFilters {
    /// Validate raw form text. Empty or whitespace-only fields count as
    /// absent predicates.
    pub fn parse(form: &FilterForm) -> Result<Self, ValidationError> {
        Ok(ScoreFilters {
            search_number: normalize_text(&form.search_number),
            tabvpm_min: parse_bound("tabvpm_min", &form.tabvpm_min)?,
            tabvpm_max: parse_bound("tabvpm_max", &form.tabvpm_max)?,
            fdy_min: parse_bound("fdy_min", &form.fdy_min)?,
            fdy_max: parse_bound("fdy_max", &form.fdy_max)?,
        })
    }
}

fn normalize_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_bound(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<f64>, ValidationError> {
    let raw = match value.as_deref().map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };
    match raw.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
        _ => Err(ValidationError::InvalidBound {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Exact lookup by identifier. Duplicates resolve to the first record in
/// load order; a miss is `None` (surfaced as 404 by the caller).
pub fn lookup<'a>(dataset: &'a Dataset, identifier: &str) -> Option<&'a ScoreRecord> {
    dataset
        .records()
        .iter()
        .find(|record| record.identifier == identifier)
}

/// Apply all supplied predicates (AND), then sort by Final Score descending.
/// The sort is stable, so ties keep their load order. With no predicates
/// this returns the whole dataset, sorted.
pub fn filter_records<'a>(dataset: &'a Dataset, filters: &ScoreFilters) -> Vec<&'a ScoreRecord> {
    let mut matched: Vec<&ScoreRecord> = dataset
        .records()
        .iter()
        .filter(|record| matches_filters(record, filters))
        .collect();
    matched.sort_by_key(|record| std::cmp::Reverse(record.final_score));
    matched
}

fn matches_filters(record: &ScoreRecord, filters: &ScoreFilters) -> bool {
    if let Some(needle) = &filters.search_number {
        if !record.identifier.contains(needle.as_str()) {
            return false;
        }
    }
    if !in_range(record.tabvpm, filters.tabvpm_min, filters.tabvpm_max) {
        return false;
    }
    if !in_range(record.fdy_in_month, filters.fdy_min, filters.fdy_max) {
        return false;
    }
    true
}

/// Inclusive range check. A record without a value for the column is
/// excluded as soon as either bound is supplied.
fn in_range(value: Option<f64>, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(v) = value else {
        return false;
    };
    if let Some(min) = min {
        if v < min {
            return false;
        }
    }
    if let Some(max) = max {
        if v > max {
            return false;
        }
    }
    true
}
