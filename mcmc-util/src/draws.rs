use crate::error::{Result, SummaryError};

/// Posterior samples of a fixed set of named coefficients, stored
/// row-major with one row per sample. The samples come from one joint
/// posterior, so every row has the same number of coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorDraws {
    names: Vec<Box<str>>,
    values: Vec<f64>,
    nrows: usize,
}

impl PosteriorDraws {
    /// Build draws from sample rows, naming the coefficients `b0`, `b1`, ...
    ///
    /// ```
    /// use mcmc_util::draws::PosteriorDraws;
    /// let draws = PosteriorDraws::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(draws.ncols(), 2);
    /// assert_eq!(draws.names()[1].as_ref(), "b1");
    /// ```
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let ncols = rows.first().map(|r| r.len()).unwrap_or(0);
        let names = (0..ncols).map(|j| format!("b{}", j).into_boxed_str()).collect();
        Self::from_named_rows(names, rows)
    }

    /// Build draws from sample rows with explicit coefficient names
    ///
    /// * `names` - one name per coefficient (column)
    /// * `rows` - one vector per posterior sample
    pub fn from_named_rows(names: Vec<Box<str>>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let ncols = names.len();
        let nrows = rows.len();
        let mut values = Vec::with_capacity(nrows * ncols);

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != ncols {
                return Err(SummaryError::Shape(format!(
                    "sample {} has {} coefficients, expected {}",
                    i,
                    row.len(),
                    ncols
                )));
            }
            if let Some(j) = row.iter().position(|x| !x.is_finite()) {
                return Err(SummaryError::NonFinite { sample: i, coef: j });
            }
            values.extend(row);
        }

        Ok(Self {
            names,
            values,
            nrows,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nrows == 0
    }

    pub fn names(&self) -> &[Box<str>] {
        &self.names
    }

    /// Coefficients of the `i`-th sample
    pub fn row(&self, i: usize) -> &[f64] {
        let d = self.ncols();
        &self.values[i * d..(i + 1) * d]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.nrows).map(move |i| self.row(i))
    }

    /// Draw sequence of the linear combination `sum_j w[j] * b[j]`,
    /// evaluated sample by sample.
    pub fn combine(&self, weights: &[f64]) -> Result<Vec<f64>> {
        if weights.len() != self.ncols() {
            return Err(SummaryError::Shape(format!(
                "{} weights for {} coefficients",
                weights.len(),
                self.ncols()
            )));
        }
        Ok(self
            .rows()
            .map(|r| r.iter().zip(weights).map(|(b, w)| b * w).sum())
            .collect())
    }

    /// Posterior mean of each coefficient; empty when there are no samples
    pub fn posterior_mean(&self) -> Vec<f64> {
        if self.is_empty() {
            return vec![];
        }
        let mut mean = vec![0.0; self.ncols()];
        for sample in self.rows() {
            mean.iter_mut().zip(sample).for_each(|(m, v)| *m += v);
        }
        let n = self.nrows as f64;
        mean.iter_mut().for_each(|m| *m /= n);
        mean
    }
}

/// Linearly interpolated quantile of already sorted values
pub(crate) fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let idx = (q * (n - 1) as f64).clamp(0.0, (n - 1) as f64);
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = idx - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ragged_rows_are_rejected() {
        let err = PosteriorDraws::from_rows(vec![vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, SummaryError::Shape(_)));
    }

    #[test]
    fn non_finite_draws_are_rejected() {
        let err = PosteriorDraws::from_rows(vec![vec![1.0, 2.0], vec![f64::NAN, 0.0]]).unwrap_err();
        assert_eq!(err, SummaryError::NonFinite { sample: 1, coef: 0 });
    }

    #[test]
    fn combine_weights_each_sample() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let draws = PosteriorDraws::from_rows(rows).unwrap();
        let combined = draws.combine(&[1.0, 0.0, -1.0]).unwrap();
        assert_eq!(combined, vec![-2.0, -2.0]);
        assert!(draws.combine(&[1.0]).is_err());
    }

    #[test]
    fn posterior_mean_per_coefficient() {
        let rows = (0..5).map(|i| vec![i as f64, 10.0]).collect();
        let draws = PosteriorDraws::from_rows(rows).unwrap();

        let mean = draws.posterior_mean();
        assert_abs_diff_eq!(mean[0], 2.0);
        assert_abs_diff_eq!(mean[1], 10.0);
        assert!(PosteriorDraws::from_rows(vec![]).unwrap().posterior_mean().is_empty());
    }

    #[test]
    fn interpolated_quantiles() {
        let sorted = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_abs_diff_eq!(sorted_quantile(&sorted, 0.5), 2.0);
        assert_abs_diff_eq!(sorted_quantile(&sorted, 0.1), 0.4, epsilon = 1e-12);
    }
}
