use anyhow::Result;
use log::info;
use mcmc_util::LinearDesign;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::fmt;
use std::str::FromStr;

use super::truncated_normal::TruncatedNormal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arm {
    Control,
    Intervention,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visit {
    T1,
    T2,
    T3,
}

impl Arm {
    pub const ALL: [Arm; 2] = [Arm::Control, Arm::Intervention];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Control => "control",
            Arm::Intervention => "intervention",
        }
    }
}

impl Visit {
    pub const ALL: [Visit; 3] = [Visit::T1, Visit::T2, Visit::T3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Visit::T1 => "t1",
            Visit::T2 => "t2",
            Visit::T3 => "t3",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Visit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Arm::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s))
            .ok_or(anyhow::anyhow!("unknown arm `{}`", s))
    }
}

impl FromStr for Visit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Visit::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or(anyhow::anyhow!("unknown visit `{}`", s))
    }
}

/// One scheduled measurement; `response` is `None` when missing
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub subject: usize,
    pub arm: Arm,
    pub visit: Visit,
    pub response: Option<f64>,
}

/// Parameters of the two-arm, three-visit trial
#[derive(Debug, Clone)]
pub struct TrialSimParams {
    /// Subjects per arm
    pub n_per_group: usize,
    /// Control mean at the first visit
    pub baseline: f64,
    /// Control change at visits 2 and 3
    pub time_effects: [f64; 2],
    /// Intervention shift at the first visit
    pub group_effect: f64,
    /// Extra intervention change at visits 2 and 3
    pub interaction_effects: [f64; 2],
    /// Standard deviation of the per-subject random intercept
    pub subject_sd: f64,
    /// Standard deviation of the measurement noise
    pub noise_sd: f64,
    /// Responses are truncated below at this value
    pub lower_bound: f64,
    /// Per-measurement probability of a missing follow-up
    pub missing_rate: f64,
    /// Per-measurement probability of an outlier
    pub outlier_rate: f64,
    /// Added to an outlying response
    pub outlier_shift: f64,
    pub seed: u64,
}

impl Default for TrialSimParams {
    fn default() -> Self {
        Self {
            n_per_group: 50,
            baseline: 20.0,
            time_effects: [2.0, 5.0],
            group_effect: 1.0,
            interaction_effects: [0.0, 1.0],
            subject_sd: 1.0,
            noise_sd: 2.0,
            lower_bound: 0.0,
            missing_rate: 0.1,
            outlier_rate: 0.02,
            outlier_shift: 15.0,
            seed: 42,
        }
    }
}

impl TrialSimParams {
    /// Coefficients in the order of `LinearDesign::group_by_time`
    pub fn coefficients(&self) -> Vec<f64> {
        vec![
            self.baseline,
            self.time_effects[0],
            self.time_effects[1],
            self.group_effect,
            self.interaction_effects[0],
            self.interaction_effects[1],
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_per_group == 0 {
            anyhow::bail!("need at least one subject per group");
        }
        for (name, rate) in [
            ("missing_rate", self.missing_rate),
            ("outlier_rate", self.outlier_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("{} must be in [0, 1], got {}", name, rate);
            }
        }
        if self.noise_sd.is_nan() || self.noise_sd <= 0.0 {
            anyhow::bail!("noise_sd must be positive, got {}", self.noise_sd);
        }
        if self.subject_sd.is_nan() || self.subject_sd < 0.0 {
            anyhow::bail!("subject_sd must be non-negative, got {}", self.subject_sd);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedTrial {
    /// Ordered by subject, then visit
    pub records: Vec<TrialRecord>,
    /// Coefficients that generated the data
    pub truth: Vec<f64>,
}

impl SimulatedTrial {
    pub fn num_subjects(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.subject + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn num_observed(&self) -> usize {
        self.records.iter().filter(|r| r.response.is_some()).count()
    }
}

/// Simulate a longitudinal two-arm trial
///
/// # Model
/// y_it = mu(arm_i, t) + u_i + e_it, truncated below at `lower_bound`
/// where:
/// - mu is the treatment-coded cell mean
/// - u_i ~ N(0, subject_sd²) per subject
/// - e_it ~ N(0, noise_sd²)
///
/// Follow-up visits go missing at `missing_rate`; observed values get
/// `outlier_shift` added at `outlier_rate`.
pub fn simulate_trial(params: &TrialSimParams) -> Result<SimulatedTrial> {
    params.validate()?;

    let design = LinearDesign::group_by_time();
    let truth = params.coefficients();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let subject_effect = Normal::new(0.0, params.subject_sd)?;

    info!(
        "Simulating {} subjects per arm over {} visits",
        params.n_per_group,
        Visit::ALL.len()
    );

    let mut records = Vec::with_capacity(2 * params.n_per_group * Visit::ALL.len());
    let mut subject = 0;

    for arm in Arm::ALL {
        for _ in 0..params.n_per_group {
            let u = subject_effect.sample(&mut rng);

            for visit in Visit::ALL {
                let mu = design
                    .cell(arm.as_str(), visit.as_str())
                    .ok_or(anyhow::anyhow!("no cell for {} @ {}", arm, visit))?
                    .evaluate(&truth);

                let noise = TruncatedNormal::new(mu + u, params.noise_sd, params.lower_bound)?;
                let mut y = noise.sample(&mut rng);

                let missing = visit != Visit::T1 && rng.random_bool(params.missing_rate);
                let response = if missing {
                    None
                } else {
                    if rng.random_bool(params.outlier_rate) {
                        y += params.outlier_shift;
                    }
                    Some(y)
                };

                records.push(TrialRecord {
                    subject,
                    arm,
                    visit,
                    response,
                });
            }
            subject += 1;
        }
    }

    let trial = SimulatedTrial { records, truth };
    info!(
        "Simulated {} measurements, {} observed",
        trial.records.len(),
        trial.num_observed()
    );
    Ok(trial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_and_determinism() {
        let params = TrialSimParams {
            n_per_group: 10,
            ..TrialSimParams::default()
        };
        let a = simulate_trial(&params).unwrap();
        let b = simulate_trial(&params).unwrap();
        assert_eq!(a.records, b.records);

        assert_eq!(a.records.len(), 60);
        assert_eq!(a.num_subjects(), 20);
        assert_eq!(a.records[0].arm, Arm::Control);
        assert_eq!(a.records[59].arm, Arm::Intervention);
        assert_eq!(
            a.records[..3].iter().map(|r| r.visit).collect::<Vec<_>>(),
            Visit::ALL.to_vec()
        );
    }

    #[test]
    fn baseline_is_always_observed() {
        let params = TrialSimParams {
            missing_rate: 1.0,
            ..TrialSimParams::default()
        };
        let trial = simulate_trial(&params).unwrap();
        for r in &trial.records {
            assert_eq!(r.response.is_some(), r.visit == Visit::T1);
        }
    }

    #[test]
    fn responses_stay_above_the_bound() {
        let params = TrialSimParams {
            baseline: 1.0,
            lower_bound: 0.0,
            outlier_rate: 0.0,
            ..TrialSimParams::default()
        };
        let trial = simulate_trial(&params).unwrap();
        assert!(trial
            .records
            .iter()
            .filter_map(|r| r.response)
            .all(|y| y >= 0.0));
    }

    #[test]
    fn invalid_parameters() {
        let bad = [
            TrialSimParams {
                n_per_group: 0,
                ..TrialSimParams::default()
            },
            TrialSimParams {
                missing_rate: 1.5,
                ..TrialSimParams::default()
            },
            TrialSimParams {
                noise_sd: 0.0,
                ..TrialSimParams::default()
            },
            TrialSimParams {
                subject_sd: -1.0,
                ..TrialSimParams::default()
            },
        ];
        for params in bad {
            assert!(simulate_trial(&params).is_err());
        }
    }

    #[test]
    fn labels_parse_back() {
        for arm in Arm::ALL {
            assert_eq!(arm.as_str().parse::<Arm>().unwrap(), arm);
        }
        assert_eq!("T3".parse::<Visit>().unwrap(), Visit::T3);
        assert!("t4".parse::<Visit>().is_err());
    }
}
