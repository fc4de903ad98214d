use crate::error::{Result, SummaryError};

/// A derived quantity `sum_j weights[j] * b[j]`, tagged by the group it
/// belongs to and a label (a time level, or a pair of them)
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCombination {
    pub group: Box<str>,
    pub label: Box<str>,
    pub weights: Vec<f64>,
}

impl LinearCombination {
    /// `self - other`, labelled `"{self.label}-{other.label}"`
    pub fn minus(&self, other: &Self) -> Self {
        Self {
            group: self.group.clone(),
            label: format!("{}-{}", self.label, other.label).into_boxed_str(),
            weights: self
                .weights
                .iter()
                .zip(other.weights.iter())
                .map(|(a, b)| a - b)
                .collect(),
        }
    }

    /// Value of the combination at one coefficient vector
    pub fn evaluate(&self, coefficients: &[f64]) -> f64 {
        self.weights
            .iter()
            .zip(coefficients)
            .map(|(w, b)| w * b)
            .sum()
    }
}

/// Lookup table from `(group, time)` cells to coefficient weights for a
/// two-factor design with interaction under treatment coding. The first
/// level of each factor is the reference.
///
/// Coefficients are laid out as
/// - intercept
/// - time main effects (levels 2..T)
/// - group main effects (levels 2..G)
/// - group × time interactions, group-major
///
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDesign {
    coefficient_names: Vec<Box<str>>,
    groups: Vec<Box<str>>,
    times: Vec<Box<str>>,
    cells: Vec<LinearCombination>,
}

impl LinearDesign {
    /// Build the cell table for the given factor levels
    ///
    /// * `groups` - group levels, reference first
    /// * `times` - time levels, reference first
    pub fn treatment_coded(groups: &[&str], times: &[&str]) -> Result<Self> {
        let ng = groups.len();
        let nt = times.len();
        if ng == 0 || nt == 0 {
            return Err(SummaryError::InvalidDesign(format!(
                "need at least one level per factor, got {} groups and {} times",
                ng, nt
            )));
        }

        let time_offset = 1;
        let group_offset = time_offset + (nt - 1);
        let inter_offset = group_offset + (ng - 1);
        let ncoef = inter_offset + (ng - 1) * (nt - 1);

        let mut coefficient_names: Vec<Box<str>> = vec!["intercept".into()];
        coefficient_names.extend(times[1..].iter().map(|&t| Box::from(t)));
        coefficient_names.extend(groups[1..].iter().map(|&g| Box::from(g)));
        for g in &groups[1..] {
            for t in &times[1..] {
                coefficient_names.push(format!("{}:{}", g, t).into_boxed_str());
            }
        }

        let mut cells = Vec::with_capacity(ng * nt);
        for (gi, &g) in groups.iter().enumerate() {
            for (ti, &t) in times.iter().enumerate() {
                let mut weights = vec![0.0; ncoef];
                weights[0] = 1.0;
                if ti > 0 {
                    weights[time_offset + ti - 1] = 1.0;
                }
                if gi > 0 {
                    weights[group_offset + gi - 1] = 1.0;
                }
                if gi > 0 && ti > 0 {
                    weights[inter_offset + (gi - 1) * (nt - 1) + ti - 1] = 1.0;
                }
                cells.push(LinearCombination {
                    group: g.into(),
                    label: t.into(),
                    weights,
                });
            }
        }

        Ok(Self {
            coefficient_names,
            groups: groups.iter().map(|&g| g.into()).collect(),
            times: times.iter().map(|&t| t.into()).collect(),
            cells,
        })
    }

    /// Control vs. intervention over three timepoints:
    ///
    /// ```text
    /// control      @ t1 = b0
    /// control      @ t2 = b0 + b1
    /// control      @ t3 = b0 + b2
    /// intervention @ t1 = b0 + b3
    /// intervention @ t2 = b0 + b3 + b1 + b4
    /// intervention @ t3 = b0 + b3 + b2 + b5
    /// ```
    pub fn group_by_time() -> Self {
        Self::treatment_coded(&["control", "intervention"], &["t1", "t2", "t3"])
            .expect("fixed two-by-three design is valid")
    }

    pub fn n_coefficients(&self) -> usize {
        self.coefficient_names.len()
    }

    pub fn coefficient_names(&self) -> &[Box<str>] {
        &self.coefficient_names
    }

    pub fn groups(&self) -> &[Box<str>] {
        &self.groups
    }

    pub fn times(&self) -> &[Box<str>] {
        &self.times
    }

    /// Group-major: every time of the first group, then the next group
    pub fn cells(&self) -> &[LinearCombination] {
        &self.cells
    }

    pub fn cell(&self, group: &str, time: &str) -> Option<&LinearCombination> {
        self.cells
            .iter()
            .find(|c| c.group.as_ref() == group && c.label.as_ref() == time)
    }

    /// Within-group pairwise differences between timepoints. For times
    /// `t1, t2, t3` each group yields `t2-t1, t3-t1, t3-t2`.
    pub fn contrasts(&self) -> Vec<LinearCombination> {
        let nt = self.times.len();
        let mut ret = Vec::with_capacity(self.groups.len() * nt * nt.saturating_sub(1) / 2);
        for row in self.cells.chunks(nt) {
            for i in 0..nt {
                for j in (i + 1)..nt {
                    ret.push(row[j].minus(&row[i]));
                }
            }
        }
        ret
    }
}
