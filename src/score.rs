//! Final Score computation.
//!
//! The composite score for a record is the sum of its three scoring inputs
//! (`FDY SCORING`, `TABVPM_SCORING`, `DVB_final`). It is computed once per
//! record at load time and stored on the record; it is never written back
//! to the source file.

/// Scoring inputs for one record.
///
/// `None` means the corresponding column was absent from the source file
/// entirely. Value-level gaps are coerced to 0 by the loader before this
/// struct is built, so a present column always carries a concrete value.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInputs {
    pub fdy_scoring: Option<i64>,
    pub tabvpm_scoring: Option<i64>,
    pub dvb_final: Option<i64>,
}

/// Compute the composite Final Score.
///
/// Total function: if any scoring column is absent the result is 0, never a
/// partial sum and never an error. Uses i64 so malformed data cannot
/// overflow at realistic scale.
pub fn compute_score(inputs: &ScoreInputs) -> i64 {
    match (inputs.fdy_scoring, inputs.tabvpm_scoring, inputs.dvb_final) {
        (Some(fdy), Some(tabvpm), Some(dvb)) => fdy + tabvpm + dvb,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_of_three_inputs() {
        let inputs = ScoreInputs {
            fdy_scoring: Some(10),
            tabvpm_scoring: Some(20),
            dvb_final: Some(5),
        };
        assert_eq!(compute_score(&inputs), 35);
    }

    #[test]
    fn test_missing_column_yields_zero_not_partial_sum() {
        let inputs = ScoreInputs {
            fdy_scoring: Some(10),
            tabvpm_scoring: None,
            dvb_final: Some(5),
        };
        assert_eq!(compute_score(&inputs), 0);
    }

    #[test]
    fn test_all_columns_missing() {
        assert_eq!(compute_score(&ScoreInputs::default()), 0);
    }

    #[test]
    fn test_zero_values_are_summed_normally() {
        let inputs = ScoreInputs {
            fdy_scoring: Some(0),
            tabvpm_scoring: Some(0),
            dvb_final: Some(7),
        };
        assert_eq!(compute_score(&inputs), 7);
    }

    #[test]
    fn test_negative_values() {
        let inputs = ScoreInputs {
            fdy_scoring: Some(-3),
            tabvpm_scoring: Some(10),
            dvb_final: Some(1),
        };
        assert_eq!(compute_score(&inputs), 8);
    }
}
