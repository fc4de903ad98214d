use anyhow::Result;
use mcmc_util::{LinearCombination, LinearDesign};
use nalgebra::{DMatrix, DVector};

use crate::simulation::TrialRecord;

/// Cell weights of a record, which are exactly its design-matrix row
pub fn record_cell<'a>(
    design: &'a LinearDesign,
    rec: &TrialRecord,
) -> Result<&'a LinearCombination> {
    design
        .cell(rec.arm.as_str(), rec.visit.as_str())
        .ok_or(anyhow::anyhow!(
            "design has no cell for {} @ {}",
            rec.arm,
            rec.visit
        ))
}

/// Complete-case design matrix and response vector
///
/// * `records` - trial measurements; missing responses are skipped
/// * `design` - maps each `(arm, visit)` cell to its coefficient weights
///
/// Returns `(X, y)` with one row per observed response.
pub fn design_matrix(
    records: &[TrialRecord],
    design: &LinearDesign,
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let observed: Vec<(&TrialRecord, f64)> = records
        .iter()
        .filter_map(|r| r.response.map(|y| (r, y)))
        .collect();

    let n = observed.len();
    let k = design.n_coefficients();
    let mut xx = DMatrix::zeros(n, k);
    let mut yy = DVector::zeros(n);

    for (i, (rec, y)) in observed.into_iter().enumerate() {
        let cell = record_cell(design, rec)?;
        for (j, &w) in cell.weights.iter().enumerate() {
            xx[(i, j)] = w;
        }
        yy[i] = y;
    }

    Ok((xx, yy))
}
