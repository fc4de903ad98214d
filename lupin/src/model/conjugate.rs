use anyhow::Result;
use log::info;
use mcmc_util::{LinearDesign, PosteriorDraws};
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Gamma, Normal, StandardNormal};
use rayon::prelude::*;

use super::design_matrix::{design_matrix, record_cell};
use crate::simulation::TrialRecord;

/// Normal-inverse-gamma prior
///
/// beta | s2 ~ N(mean, s2 * scale * I), s2 ~ InvGamma(a0, b0)
#[derive(Debug, Clone)]
pub struct PriorSpec {
    /// Prior mean of the coefficients; `None` centres them at zero
    pub mean: Option<Vec<f64>>,
    pub scale: f64,
    pub a0: f64,
    pub b0: f64,
}

impl Default for PriorSpec {
    fn default() -> Self {
        Self {
            mean: None,
            scale: 100.0,
            a0: 1.0,
            b0: 1.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Total number of posterior draws across chains
    pub n_draws: usize,
    /// Independent streams, each seeded with `seed + chain`
    pub n_chains: usize,
    pub seed: u64,
    pub prior: PriorSpec,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            n_draws: 4000,
            n_chains: 4,
            seed: 42,
            prior: PriorSpec::default(),
        }
    }
}

impl FitConfig {
    /// Seed of the posterior predictive stream. Chains use `seed` up to
    /// `seed + n_chains - 1`, so this stream never repeats their normals.
    pub fn imputation_seed(&self) -> u64 {
        self.seed.wrapping_add(self.n_chains as u64)
    }
}

/// Closed-form posterior of the conjugate linear model
///
/// beta | s2, y ~ N(mean, s2 * cov), s2 | y ~ InvGamma(shape, rate)
#[derive(Debug, Clone)]
pub struct ConjugatePosterior {
    pub mean: DVector<f64>,
    pub cov: DMatrix<f64>,
    pub shape: f64,
    pub rate: f64,
}

impl ConjugatePosterior {
    /// Posterior mean of the residual variance, defined for `shape > 1`
    pub fn sigma_sq_mean(&self) -> Option<f64> {
        (self.shape > 1.0).then(|| self.rate / (self.shape - 1.0))
    }
}

pub struct ConjugateFit {
    pub draws: PosteriorDraws,
    /// Residual standard deviation, one per draw
    pub sigma: Vec<f64>,
    pub posterior: ConjugatePosterior,
    pub n_obs: usize,
}

/// Update the prior with complete-case observations
pub fn conjugate_posterior(
    xx: &DMatrix<f64>,
    yy: &DVector<f64>,
    prior: &PriorSpec,
) -> Result<ConjugatePosterior> {
    let k = xx.ncols();
    let n = xx.nrows();

    if prior.scale.is_nan() || prior.scale <= 0.0 {
        anyhow::bail!("prior scale must be positive, got {}", prior.scale);
    }
    if prior.a0 <= 0.0 || prior.b0 <= 0.0 {
        anyhow::bail!("prior a0, b0 must be positive, got {}, {}", prior.a0, prior.b0);
    }

    let m0 = match &prior.mean {
        Some(m) if m.len() == k => DVector::from_column_slice(m),
        Some(m) => anyhow::bail!("prior mean has {} entries, design has {}", m.len(), k),
        None => DVector::zeros(k),
    };

    let prior_prec = 1.0 / prior.scale;
    let xtx = xx.transpose() * xx;
    let xty = xx.transpose() * yy;

    // posterior precision: V0^{-1} + X'X
    let mut prec = xtx;
    for j in 0..k {
        prec[(j, j)] += prior_prec;
    }

    let chol = prec
        .clone()
        .cholesky()
        .ok_or(anyhow::anyhow!("posterior precision is not positive definite"))?;

    let rhs = &m0 * prior_prec + xty;
    let mean = chol.solve(&rhs);
    let cov = chol.inverse();

    let quad = yy.dot(yy) + prior_prec * m0.dot(&m0) - mean.dot(&(&prec * &mean));
    let shape = prior.a0 + 0.5 * n as f64;
    let rate = prior.b0 + 0.5 * quad.max(0.0);

    Ok(ConjugatePosterior {
        mean,
        cov,
        shape,
        rate,
    })
}

/// `n` independent draws of `(beta, sigma)` from the closed-form posterior
fn sample_chain(
    post: &ConjugatePosterior,
    chol_l: &DMatrix<f64>,
    n: usize,
    seed: u64,
) -> Result<(Vec<Vec<f64>>, Vec<f64>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    let precision = Gamma::new(post.shape, 1.0 / post.rate)?;
    let k = post.mean.len();

    let mut betas = Vec::with_capacity(n);
    let mut sigmas = Vec::with_capacity(n);

    for _ in 0..n {
        let s2 = 1.0 / precision.sample(&mut rng);
        let z = DVector::from_fn(k, |_, _| {
            let v: f64 = StandardNormal.sample(&mut rng);
            v
        });
        let beta = &post.mean + chol_l * z * s2.sqrt();
        betas.push(beta.iter().copied().collect());
        sigmas.push(s2.sqrt());
    }
    Ok((betas, sigmas))
}

/// Fit the treatment-coded linear model and draw coefficients
///
/// Missing responses are dropped before fitting. Draws are split across
/// `n_chains` independent streams that run in parallel and are
/// concatenated in chain order.
pub fn fit_conjugate(
    records: &[TrialRecord],
    design: &LinearDesign,
    config: &FitConfig,
) -> Result<ConjugateFit> {
    let (xx, yy) = design_matrix(records, design)?;
    let n_obs = xx.nrows();
    let k = xx.ncols();

    if n_obs < k {
        anyhow::bail!("{} observed responses for {} coefficients", n_obs, k);
    }
    if config.n_draws == 0 || config.n_chains == 0 {
        anyhow::bail!("need at least one draw and one chain");
    }

    info!(
        "Fitting {} coefficients on {} observed responses ({} missing)",
        k,
        n_obs,
        records.len() - n_obs
    );

    let posterior = conjugate_posterior(&xx, &yy, &config.prior)?;

    let chol_l = posterior
        .cov
        .clone()
        .cholesky()
        .ok_or(anyhow::anyhow!("posterior covariance is not positive definite"))?
        .l();

    let n_chains = config.n_chains.min(config.n_draws);
    let per_chain = config.n_draws / n_chains;
    let remainder = config.n_draws % n_chains;

    let chains = (0..n_chains)
        .into_par_iter()
        .map(|c| {
            let n = per_chain + usize::from(c < remainder);
            sample_chain(&posterior, &chol_l, n, config.seed.wrapping_add(c as u64))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut rows = Vec::with_capacity(config.n_draws);
    let mut sigma = Vec::with_capacity(config.n_draws);
    for (betas, sigmas) in chains {
        rows.extend(betas);
        sigma.extend(sigmas);
    }

    let draws = PosteriorDraws::from_named_rows(design.coefficient_names().to_vec(), rows)?;
    info!("Drew {} posterior samples in {} chains", draws.nrows(), n_chains);

    Ok(ConjugateFit {
        draws,
        sigma,
        posterior,
        n_obs,
    })
}

/// A missing measurement filled in from the posterior predictive
#[derive(Debug, Clone)]
pub struct ImputedResponse {
    pub record: TrialRecord,
    pub draws: Vec<f64>,
}

/// Posterior predictive draws for every missing response
///
/// Each fitted draw `(beta, sigma)` yields one value `x'beta + sigma * e`,
/// with `e` drawn from the stream seeded by [`FitConfig::imputation_seed`].
pub fn impute_missing(
    records: &[TrialRecord],
    design: &LinearDesign,
    fit: &ConjugateFit,
    config: &FitConfig,
) -> Result<Vec<ImputedResponse>> {
    let mut rng = StdRng::seed_from_u64(config.imputation_seed());
    let noise = Normal::new(0.0, 1.0)?;
    let mut ret = vec![];

    for rec in records.iter().filter(|r| r.response.is_none()) {
        let cell = record_cell(design, rec)?;
        let mu = fit.draws.combine(&cell.weights)?;
        let draws = mu
            .iter()
            .zip(fit.sigma.iter())
            .map(|(m, s)| m + s * noise.sample(&mut rng))
            .collect();
        ret.push(ImputedResponse {
            record: rec.clone(),
            draws,
        });
    }

    info!("Imputed {} missing responses", ret.len());
    Ok(ret)
}
