use anyhow::Result;
use rand::Rng;
use rand_distr::{Distribution, Normal};

const MAX_REJECTIONS: usize = 1000;

/// Normal distribution restricted to `[lower, ∞)`
///
/// Sampled by rejection from the untruncated normal. When the bound sits
/// so far in the upper tail that `MAX_REJECTIONS` proposals all fall
/// below it, the bound itself is returned.
#[derive(Debug, Clone, Copy)]
pub struct TruncatedNormal {
    normal: Normal<f64>,
    lower: f64,
}

impl TruncatedNormal {
    pub fn new(mean: f64, sd: f64, lower: f64) -> Result<Self> {
        if sd.is_nan() || sd <= 0.0 || !mean.is_finite() || lower.is_nan() {
            anyhow::bail!(
                "invalid truncated normal: mean={}, sd={}, lower={}",
                mean,
                sd,
                lower
            );
        }
        let normal = Normal::new(mean, sd).map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(Self { normal, lower })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }
}

impl Distribution<f64> for TruncatedNormal {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        for _ in 0..MAX_REJECTIONS {
            let x = self.normal.sample(rng);
            if x >= self.lower {
                return x;
            }
        }
        self.lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn draws_respect_the_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        let tn = TruncatedNormal::new(0.5, 2.0, 0.0).unwrap();
        let xs: Vec<f64> = (0..10_000).map(|_| tn.sample(&mut rng)).collect();
        assert!(xs.iter().all(|&x| x >= 0.0));

        // truncation pushes the mean above the untruncated one
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        assert!(mean > 0.5);
    }

    #[test]
    fn far_tail_falls_back_to_the_bound() {
        let mut rng = StdRng::seed_from_u64(2);
        let tn = TruncatedNormal::new(0.0, 1.0, 50.0).unwrap();
        assert_eq!(tn.sample(&mut rng), 50.0);
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(TruncatedNormal::new(0.0, 0.0, 0.0).is_err());
        assert!(TruncatedNormal::new(f64::NAN, 1.0, 0.0).is_err());
        assert!(TruncatedNormal::new(0.0, 1.0, f64::NAN).is_err());
        assert!(TruncatedNormal::new(0.0, 1.0, f64::NEG_INFINITY).is_ok());
    }
}
