//! Dataset loading and normalization.
//!
//! Reads the scored-records spreadsheet export (CSV or Parquet) into an
//! in-memory table at process start using Polars, then normalizes column
//! types row by row:
//! - identifier and model name: missing values become empty strings
//! - the three scoring columns: missing values become 0
//! - the two range-filter columns stay optional per value
//!
//! Load failure is terminal for the dataset but not for the process:
//! [`DatasetState::load_or_unavailable`] logs the cause and returns
//! `Unavailable`, and every consumer handles that branch explicitly.

use crate::score::{compute_score, ScoreInputs};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Identifier column in the source file.
pub const IDENTIFIER_COL: &str = "NUMBER";
/// Model name column in the source file.
pub const MODEL_NAME_COL: &str = "MODEL_NAME";
/// The three scoring input columns, in summation order.
pub const SCORING_COLS: [&str; 3] = ["FDY SCORING", "TABVPM_SCORING", "DVB_final"];
/// Range-filter columns.
pub const TABVPM_COL: &str = "TABVPM";
pub const FDY_IN_MONTH_COL: &str = "FDY IN MONTH";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: PolarsError,
    },
}

/// One row of the loaded dataset.
///
/// `identifier` is the lookup key but is NOT guaranteed unique; lookups
/// resolve duplicates to the first record in load order.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRecord {
    pub identifier: String,
    pub model_name: String,
    pub fdy_scoring: i64,
    pub tabvpm_scoring: i64,
    pub dvb_final: i64,
    /// Range-filter field; `None` when the value was missing or non-numeric.
    pub tabvpm: Option<f64>,
    /// Range-filter field; `None` when the value was missing or non-numeric.
    pub fdy_in_month: Option<f64>,
    /// Derived composite score, computed once at load.
    pub final_score: i64,
}

/// The loaded dataset: an ordered sequence of records, immutable after load.
#[derive(Debug, Default)]
pub struct Dataset {
    records: Vec<ScoreRecord>,
}

impl Dataset {
    pub fn from_records(records: Vec<ScoreRecord>) -> Self {
        Dataset { records }
    }

    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Dataset availability, decided once at startup.
///
/// Consumers never dereference a missing table: routes that need records
/// match on this and answer "dataset unavailable" for the second branch.
#[derive(Debug)]
pub enum DatasetState {
    Loaded(Dataset),
    Unavailable { reason: String },
}

impl DatasetState {
    /// Load the dataset, demoting failure to an explicit `Unavailable` state.
    pub fn load_or_unavailable(path: &Path) -> Self {
        match load_dataset(path) {
            Ok(dataset) => {
                tracing::info!("Loaded {} records from {}", dataset.len(), path.display());
                DatasetState::Loaded(dataset)
            }
            Err(e) => {
                tracing::error!("Error loading dataset file: {}", e);
                DatasetState::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn as_loaded(&self) -> Option<&Dataset> {
        match self {
            DatasetState::Loaded(dataset) => Some(dataset),
            DatasetState::Unavailable { .. } => None,
        }
    }
}

/// Load and normalize the dataset from a CSV or Parquet export.
pub fn load_dataset(path: &Path) -> Result<Dataset, LoadError> {
    let df = read_frame(path)?;
    let height = df.height();

    let identifiers = string_column(&df, IDENTIFIER_COL, height);
    let model_names = string_column(&df, MODEL_NAME_COL, height);

    let fdy_scoring = int_column(&df, SCORING_COLS[0], height);
    let tabvpm_scoring = int_column(&df, SCORING_COLS[1], height);
    let dvb_final = int_column(&df, SCORING_COLS[2], height);
    if fdy_scoring.is_none() || tabvpm_scoring.is_none() || dvb_final.is_none() {
        tracing::warn!("Scoring column(s) missing; Final Score defaults to 0 for every record");
    }

    let tabvpm = float_column(&df, TABVPM_COL, height);
    let fdy_in_month = float_column(&df, FDY_IN_MONTH_COL, height);

    let mut records = Vec::with_capacity(height);
    for idx in 0..height {
        let inputs = ScoreInputs {
            fdy_scoring: fdy_scoring.as_ref().map(|v| v[idx]),
            tabvpm_scoring: tabvpm_scoring.as_ref().map(|v| v[idx]),
            dvb_final: dvb_final.as_ref().map(|v| v[idx]),
        };
        records.push(ScoreRecord {
            identifier: identifiers[idx].clone(),
            model_name: model_names[idx].clone(),
            fdy_scoring: inputs.fdy_scoring.unwrap_or(0),
            tabvpm_scoring: inputs.tabvpm_scoring.unwrap_or(0),
            dvb_final: inputs.dvb_final.unwrap_or(0),
            tabvpm: tabvpm[idx],
            fdy_in_month: fdy_in_month[idx],
            final_score: compute_score(&inputs),
        });
    }

    Ok(Dataset::from_records(records))
}

/// Pick the reader by extension: `.parquet` scans lazily, anything else is
/// treated as a CSV export with a header row.
fn read_frame(path: &Path) -> Result<DataFrame, LoadError> {
    let result = match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => {
            LazyFrame::scan_parquet(path, Default::default()).and_then(|lf| lf.collect())
        }
        _ => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish()),
    };
    result.map_err(|source| LoadError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Text column with missing values coerced to empty strings.
///
/// An entirely absent column logs a warning and yields empty strings for
/// every record (load continues).
fn string_column(df: &DataFrame, name: &str, height: usize) -> Vec<String> {
    let col = match df.column(name) {
        Ok(col) => col,
        Err(_) => {
            tracing::warn!("Column {} not found in the data", name);
            return vec![String::new(); height];
        }
    };
    match try_strings(col) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Column {} could not be read as text: {}", name, e);
            vec![String::new(); height]
        }
    }
}

fn try_strings(col: &Column) -> PolarsResult<Vec<String>> {
    let cast = col.cast(&DataType::String)?;
    let ca = cast.str()?;
    Ok(ca
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect())
}

/// Integer scoring column with missing values coerced to 0.
///
/// Returns `None` when the column is absent from the source, which the
/// caller reports once and the score computation treats as fail-soft.
fn int_column(df: &DataFrame, name: &str, height: usize) -> Option<Vec<i64>> {
    let col = match df.column(name) {
        Ok(col) => col,
        Err(_) => {
            tracing::warn!("Column {} not found in the data", name);
            return None;
        }
    };
    match try_ints(col) {
        Ok(values) => Some(values),
        Err(e) => {
            tracing::warn!("Column {} could not be read as integers: {}", name, e);
            Some(vec![0; height])
        }
    }
}

fn try_ints(col: &Column) -> PolarsResult<Vec<i64>> {
    // Non-strict cast: unparseable values become null, then 0.
    let cast = col.cast(&DataType::Int64)?;
    let ca = cast.i64()?;
    Ok(ca.into_iter().map(|v| v.unwrap_or(0)).collect())
}

/// Numeric range-filter column, kept optional per value.
///
/// Missing or non-numeric values load as `None` and are excluded by any
/// range predicate on the column.
fn float_column(df: &DataFrame, name: &str, height: usize) -> Vec<Option<f64>> {
    let col = match df.column(name) {
        Ok(col) => col,
        Err(_) => {
            tracing::warn!("Column {} not found in the data", name);
            return vec![None; height];
        }
    };
    match try_floats(col) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Column {} could not be read as numbers: {}", name, e);
            vec![None; height]
        }
    }
}

fn try_floats(col: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let cast = col.cast(&DataType::Float64)?;
    let ca = cast.f64()?;
    Ok(ca.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("create temp csv");
        file.write_all(content.as_bytes()).expect("write temp csv");
        file
    }

    #[test]
    fn test_final_score_is_sum_of_inputs() {
        let file = write_csv(
            "NUMBER,MODEL_NAME,FDY SCORING,TABVPM_SCORING,DVB_final,TABVPM,FDY IN MONTH\n\
             A1,alpha,10,20,5,12.5,3\n\
             B2,beta,1,2,3,7,9\n",
        );
        let dataset = load_dataset(file.path()).expect("load");
        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.identifier, "A1");
        assert_eq!(first.model_name, "alpha");
        assert_eq!(first.final_score, 35);
        assert_eq!(dataset.records()[1].final_score, 6);
        for record in dataset.records() {
            assert_eq!(
                record.final_score,
                record.fdy_scoring + record.tabvpm_scoring + record.dvb_final
            );
        }
    }

    #[test]
    fn test_missing_values_are_coerced_not_errors() {
        let file = write_csv(
            "NUMBER,MODEL_NAME,FDY SCORING,TABVPM_SCORING,DVB_final,TABVPM,FDY IN MONTH\n\
             ,gamma,,7,,abc,\n",
        );
        let dataset = load_dataset(file.path()).expect("load");
        let record = &dataset.records()[0];
        assert_eq!(record.identifier, "");
        assert_eq!(record.fdy_scoring, 0);
        assert_eq!(record.tabvpm_scoring, 7);
        assert_eq!(record.dvb_final, 0);
        // Missing values (not missing columns) still participate in the sum.
        assert_eq!(record.final_score, 7);
        // Non-numeric filter value loads as None, never a crash.
        assert_eq!(record.tabvpm, None);
        assert_eq!(record.fdy_in_month, None);
    }

    #[test]
    fn test_absent_scoring_column_zeroes_final_score() {
        let file = write_csv(
            "NUMBER,MODEL_NAME,FDY SCORING,TABVPM_SCORING\n\
             A1,alpha,10,20\n",
        );
        let dataset = load_dataset(file.path()).expect("load");
        let record = &dataset.records()[0];
        assert_eq!(record.fdy_scoring, 10);
        assert_eq!(record.tabvpm_scoring, 20);
        assert_eq!(record.dvb_final, 0);
        // DVB_final column is absent entirely: fail soft to 0, not 30.
        assert_eq!(record.final_score, 0);
    }

    #[test]
    fn test_numeric_identifier_column_is_coerced_to_string() {
        let file = write_csv(
            "NUMBER,MODEL_NAME,FDY SCORING,TABVPM_SCORING,DVB_final\n\
             101,alpha,1,2,3\n",
        );
        let dataset = load_dataset(file.path()).expect("load");
        assert_eq!(dataset.records()[0].identifier, "101");
    }

    #[test]
    fn test_load_order_is_preserved() {
        let file = write_csv(
            "NUMBER,MODEL_NAME,FDY SCORING,TABVPM_SCORING,DVB_final\n\
             Z9,first,1,1,1\n\
             A1,second,2,2,2\n\
             Z9,third,3,3,3\n",
        );
        let dataset = load_dataset(file.path()).expect("load");
        let names: Vec<&str> = dataset
            .records()
            .iter()
            .map(|r| r.model_name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let result = load_dataset(Path::new("does/not/exist.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_unavailable_does_not_panic() {
        let state = DatasetState::load_or_unavailable(Path::new("does/not/exist.csv"));
        match state {
            DatasetState::Unavailable { reason } => assert!(!reason.is_empty()),
            DatasetState::Loaded(_) => panic!("expected unavailable state"),
        }
    }
}
