use crate::draws::sorted_quantile;
use crate::error::{Result, SummaryError};
use crate::traits::IntervalOps;

fn check_mass(mass: f64) -> Result<()> {
    if mass > 0.0 && mass <= 1.0 {
        Ok(())
    } else {
        Err(SummaryError::InvalidMass(mass))
    }
}

fn sorted_copy(values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(SummaryError::Shape("no draws to summarize".into()));
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    Ok(sorted)
}

/// Index distance between the ends of a window holding `mass` of `n` draws
fn window_span(n: usize, mass: f64) -> usize {
    ((mass * n as f64).floor() as usize).min(n - 1)
}

/// Leftmost narrowest `(sorted[i], sorted[i + k])` accepted by `keep`
fn narrowest_window<F>(sorted: &[f64], k: usize, keep: F) -> Option<(f64, f64)>
where
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<(f64, f64)> = None;
    for i in 0..(sorted.len() - k) {
        let (lo, hi) = (sorted[i], sorted[i + k]);
        if keep(lo, hi) && best.map_or(true, |(bl, bh)| hi - lo < bh - bl) {
            best = Some((lo, hi));
        }
    }
    best
}

impl IntervalOps for [f64] {
    type Scalar = f64;

    fn sample_mean(&self) -> f64 {
        self.iter().sum::<f64>() / self.len() as f64
    }

    /// Slide a window of `floor(mass * n) + 1` sorted draws and keep
    /// the narrowest one. Ties resolve to the leftmost window.
    fn hpd_interval(&self, mass: f64) -> Result<(f64, f64)> {
        check_mass(mass)?;
        let sorted = sorted_copy(self)?;
        let k = window_span(sorted.len(), mass);
        Ok(narrowest_window(&sorted, k, |_, _| true).unwrap_or((sorted[0], sorted[k])))
    }

    /// Same windows as [`hpd_interval`](IntervalOps::hpd_interval), restricted
    /// to those containing `point`. Consecutive windows overlap, so one
    /// qualifies whenever `point` lies within the draws and a window holds
    /// at least two of them; otherwise the narrowest window is stretched
    /// to reach `point`.
    fn hpd_interval_around(&self, mass: f64, point: f64) -> Result<(f64, f64)> {
        check_mass(mass)?;
        let sorted = sorted_copy(self)?;
        let k = window_span(sorted.len(), mass);
        if let Some(found) = narrowest_window(&sorted, k, |lo, hi| lo <= point && point <= hi) {
            return Ok(found);
        }
        let (lo, hi) = narrowest_window(&sorted, k, |_, _| true).unwrap_or((sorted[0], sorted[k]));
        Ok((lo.min(point), hi.max(point)))
    }

    fn equal_tail_interval(&self, mass: f64) -> Result<(f64, f64)> {
        check_mass(mass)?;
        let sorted = sorted_copy(self)?;
        let tail = (1.0 - mass) / 2.0;
        Ok((
            sorted_quantile(&sorted, tail),
            sorted_quantile(&sorted, 1.0 - tail),
        ))
    }
}
