//! Empirical likelihood analysis of variance.
//!
//! Tests whether k groups of observations share a common mean. Each group
//! contributes one estimating equation, (x - mu) for its own observations and
//! zero for the others, and the common mean mu is profiled out.

use crate::{
    dual::{self, DualOptions, DualSolution},
    error::{ElError, ElResult},
    optimize::{minimize, Method, OptimOptions},
    regression::chi2_sf,
};
use ndarray::{Array1, Array2};
use tracing::debug;

/// Holds the observations of each group for an empirical likelihood ANOVA.
#[derive(Clone, Debug)]
pub struct ElAnova {
    groups: Vec<Array1<f64>>,
    dual_options: DualOptions,
}

impl ElAnova {
    /// Each entry holds the observations of one group. At least two non-empty
    /// groups are required.
    pub fn new(groups: Vec<Array1<f64>>) -> ElResult<Self> {
        if groups.len() < 2 {
            return Err(ElError::BadInput(format!(
                "at least two groups are required, got {}",
                groups.len()
            )));
        }
        if let Some(i) = groups.iter().position(|g| g.is_empty()) {
            return Err(ElError::BadInput(format!("group {} is empty", i)));
        }
        if groups.iter().flatten().any(|x| !x.is_finite()) {
            return Err(ElError::BadInput("non-finite observation".to_string()));
        }
        Ok(Self {
            groups,
            dual_options: DualOptions::default(),
        })
    }

    pub fn dual_options(mut self, options: DualOptions) -> Self {
        self.dual_options = options;
        self
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// The total number of observations over all groups.
    pub fn nobs(&self) -> usize {
        self.groups.iter().map(|g| g.len()).sum()
    }

    /// The mean of all observations regardless of group.
    pub fn pooled_mean(&self) -> f64 {
        let total: f64 = self.groups.iter().map(|g| g.sum()).sum();
        total / self.nobs() as f64
    }

    /// The pooled estimating equations for a common mean `mu`. Rows follow the
    /// order of the groups and of the observations within them.
    fn estimating_equations(&self, mu: f64) -> Array2<f64> {
        let mut est: Array2<f64> = Array2::zeros((self.nobs(), self.num_groups()));
        let mut row = 0;
        for (g, group) in self.groups.iter().enumerate() {
            for &x in group {
                est[[row, g]] = x - mu;
                row += 1;
            }
        }
        est
    }

    /// Solve the dual problem for the common mean `mu`.
    pub fn el_at(&self, mu: f64) -> ElResult<DualSolution> {
        let est = self.estimating_equations(mu);
        dual::solve(est.view(), &self.dual_options)
    }

    /// The statistic for the common mean `mu`, finite even outside the hull
    /// of a group.
    pub fn capped_llr_at(&self, mu: f64) -> ElResult<f64> {
        let est = self.estimating_equations(mu);
        dual::capped_llr(est.view(), &self.dual_options)
    }

    /// Returns a configuration that is run with [`AnovaConfig::run`].
    pub fn compute(&self) -> AnovaConfig<'_> {
        AnovaConfig {
            model: self,
            mu: None,
            mu_start: None,
            method: Method::default(),
            return_weights: false,
            options: OptimOptions::default(),
        }
    }
}

/// The result of an empirical likelihood ANOVA.
#[derive(Clone, Debug, PartialEq)]
pub struct AnovaResult {
    /// -2 times the log empirical likelihood ratio at `mu`
    pub llr: f64,
    /// The chi-squared p-value with k - 1 degrees of freedom
    pub p_value: f64,
    /// The common mean, either given or estimated
    pub mu: f64,
    /// The weight of each pooled observation, if requested
    pub weights: Option<Array1<f64>>,
}

pub struct AnovaConfig<'a> {
    model: &'a ElAnova,
    mu: Option<f64>,
    mu_start: Option<f64>,
    method: Method,
    return_weights: bool,
    options: OptimOptions,
}

impl<'a> AnovaConfig<'a> {
    /// Evaluate the statistic at a fixed common mean instead of profiling it.
    pub fn mu(mut self, mu: f64) -> Self {
        self.mu = Some(mu);
        self
    }

    /// The starting point of the search for the common mean. Defaults to the
    /// pooled sample mean.
    pub fn mu_start(mut self, mu_start: f64) -> Self {
        self.mu_start = Some(mu_start);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn return_weights(mut self) -> Self {
        self.return_weights = true;
        self
    }

    pub fn options(mut self, options: OptimOptions) -> Self {
        self.options = options;
        self
    }

    pub fn run(self) -> ElResult<AnovaResult> {
        let model = self.model;
        let mu = match self.mu {
            Some(mu) => mu,
            None => {
                let cost =
                    |x: &[f64]| -> f64 { model.capped_llr_at(x[0]).unwrap_or(f64::INFINITY) };
                let start = self.mu_start.unwrap_or_else(|| model.pooled_mean());
                let min = minimize(&cost, &[start], self.method, &self.options)?;
                if !min.x[0].is_finite() {
                    return Err(ElError::Optimization(
                        "no finite common mean found".to_string(),
                    ));
                }
                min.x[0]
            }
        };
        let sol = model.el_at(mu)?;
        let p_value = chi2_sf(sol.llr, model.num_groups() - 1)?;
        debug!(mu, llr = sol.llr, p_value, "empirical likelihood anova");
        Ok(AnovaResult {
            llr: sol.llr,
            p_value,
            mu,
            weights: if self.return_weights {
                Some(sol.weights)
            } else {
                None
            },
        })
    }
}
