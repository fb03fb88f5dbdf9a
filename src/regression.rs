//! Empirical likelihood inference on linear regression coefficients.
//!
//! The estimating equations of the regression are x_i (y_i - x_i^T beta).
//! A hypothesis fixing some coefficients is tested by the profile empirical
//! likelihood ratio, minimizing -2 log R over the remaining (nuisance)
//! coefficients. Confidence intervals are found by inverting the test.

use crate::{
    dual::{self, DualOptions, DualSolution},
    error::{ElError, ElResult},
    ols::Ols,
    optimize::{find_root, minimize, Method, OptimOptions},
};
use itertools::Itertools;
use ndarray::{concatenate, Array1, Array2, ArrayView1, ArrayView2, Axis};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use tracing::debug;

/// Holds the data for an empirical likelihood linear regression.
#[derive(Clone, Debug)]
pub struct ElRegression {
    /// the observation of response data by event
    endog: Array1<f64>,
    /// the design matrix with events in rows and instances in columns. Any
    /// intercept column must already be included.
    exog: Array2<f64>,
    /// least squares fit, which is also the unconstrained empirical
    /// likelihood estimate
    ols: Ols,
    /// Centered first and second moments of each non-constant regressor. These
    /// become additional estimating equations when the regressors are treated
    /// as fixed.
    exog_moments: Array2<f64>,
    dual_options: DualOptions,
}

impl ElRegression {
    /// Borrow the Y and X data where each row in the arrays is a new
    /// observation. The design matrix is used as is, so a constant column
    /// should be prepended if an intercept is desired.
    pub fn new(endog: ArrayView1<f64>, exog: ArrayView2<f64>) -> ElResult<Self> {
        let ols = Ols::fit(endog, exog)?;
        let exog_moments = fixed_design_moments(exog);
        Ok(Self {
            endog: endog.to_owned(),
            exog: exog.to_owned(),
            ols,
            exog_moments,
            dual_options: DualOptions::default(),
        })
    }

    /// Use custom settings for the inner solve of the Lagrange multiplier.
    pub fn dual_options(mut self, options: DualOptions) -> Self {
        self.dual_options = options;
        self
    }

    pub fn nobs(&self) -> usize {
        self.endog.len()
    }

    /// The number of regression parameters, including the intercept.
    pub fn nvar(&self) -> usize {
        self.exog.ncols()
    }

    /// The maximum empirical likelihood estimate of the parameters, which
    /// coincides with least squares.
    pub fn params(&self) -> &Array1<f64> {
        &self.ols.params
    }

    pub fn ols(&self) -> &Ols {
        &self.ols
    }

    /// The estimating equations evaluated at `params`, with observations in
    /// rows.
    fn estimating_equations(&self, params: &Array1<f64>, stochastic_exog: bool) -> Array2<f64> {
        let resid: Array1<f64> = &self.endog - &self.exog.dot(params);
        let est: Array2<f64> = &self.exog * &resid.insert_axis(Axis(1));
        if stochastic_exog || self.exog_moments.ncols() == 0 {
            est
        } else {
            concatenate![Axis(1), est, self.exog_moments]
        }
    }

    fn check_params(&self, params: &Array1<f64>) -> ElResult<()> {
        if params.len() != self.nvar() {
            return Err(ElError::BadInput(format!(
                "expected {} parameters, got {}",
                self.nvar(),
                params.len()
            )));
        }
        if params.iter().any(|b| !b.is_finite()) {
            return Err(ElError::BadInput(format!(
                "parameters {} are not finite",
                params
            )));
        }
        Ok(())
    }

    /// Solve the dual problem for the full parameter vector `params`.
    pub fn el_at(&self, params: &Array1<f64>, stochastic_exog: bool) -> ElResult<DualSolution> {
        self.check_params(params)?;
        let est = self.estimating_equations(params, stochastic_exog);
        dual::solve(est.view(), &self.dual_options)
    }

    /// The statistic at `params`, finite even when they are infeasible. See
    /// [`dual::capped_llr`].
    pub fn capped_llr_at(&self, params: &Array1<f64>, stochastic_exog: bool) -> ElResult<f64> {
        self.check_params(params)?;
        let est = self.estimating_equations(params, stochastic_exog);
        dual::capped_llr(est.view(), &self.dual_options)
    }

    /// Least squares for the coefficients in `free` with the others held at
    /// the values in `params`. The result is the full parameter vector.
    fn constrained_least_squares(&self, params: &Array1<f64>, free: &[usize]) -> ElResult<Array1<f64>> {
        let fixed: Vec<usize> = (0..self.nvar()).filter(|j| !free.contains(j)).collect();
        let fixed_vals: Array1<f64> = fixed.iter().map(|&j| params[j]).collect();
        let offset: Array1<f64> = self.exog.select(Axis(1), &fixed).dot(&fixed_vals);
        let target: Array1<f64> = &self.endog - &offset;
        let fit = Ols::fit(target.view(), self.exog.select(Axis(1), free).view())?;
        let mut constrained = params.clone();
        for (&j, &b) in free.iter().zip(fit.params.iter()) {
            constrained[j] = b;
        }
        Ok(constrained)
    }

    /// Test the hypothesis that the parameters with indices `param_nums` are
    /// equal to `b0_vals`. Returns a configuration that is run with
    /// [`TestConfig::test`].
    pub fn test_beta(&self, b0_vals: &[f64], param_nums: &[usize]) -> TestConfig<'_> {
        TestConfig {
            model: self,
            b0_vals: b0_vals.to_vec(),
            param_nums: param_nums.to_vec(),
            method: Method::default(),
            return_weights: false,
            return_params: false,
            stochastic_exog: true,
            options: OptimOptions::default(),
        }
    }

    /// Compute a confidence interval for the parameter with index
    /// `param_num`. Returns a configuration that is run with [`CiConfig::ci`].
    pub fn ci_beta(&self, param_num: usize) -> CiConfig<'_> {
        CiConfig {
            model: self,
            param_num,
            sig: 0.05,
            method: Method::default(),
            lower_bound: None,
            upper_bound: None,
            stochastic_exog: true,
            options: OptimOptions::default(),
        }
    }
}

/// The sample moment conditions x_ij - mean_j and x_ij^2 - mean(x_j^2) for
/// every column j of the design matrix that is not constant.
fn fixed_design_moments(exog: ArrayView2<f64>) -> Array2<f64> {
    let varying: Vec<usize> = (0..exog.ncols())
        .filter(|&j| {
            let col = exog.column(j);
            col.iter().any(|&x| x != col[0])
        })
        .collect();
    let nobs = exog.nrows();
    let mut moments: Array2<f64> = Array2::zeros((nobs, 2 * varying.len()));
    for (k, &j) in varying.iter().enumerate() {
        let col = exog.column(j);
        let mean = col.sum() / nobs as f64;
        let mean_sq = col.dot(&col) / nobs as f64;
        moments.column_mut(k).assign(&col.mapv(|x| x - mean));
        moments
            .column_mut(varying.len() + k)
            .assign(&col.mapv(|x| x * x - mean_sq));
    }
    moments
}

/// The result of an empirical likelihood hypothesis test.
#[derive(Clone, Debug, PartialEq)]
pub struct ElTest {
    /// The asymptotic chi-squared p-value
    pub p_value: f64,
    /// -2 times the log of the profile empirical likelihood ratio
    pub llr: f64,
    /// The weight of each observation under the hypothesis, if requested
    pub weights: Option<Array1<f64>>,
    /// The full parameter vector under the hypothesis, with the nuisance
    /// parameters at their profile optimum, if requested
    pub params: Option<Array1<f64>>,
}

/// A hypothesis test of regression coefficients and its settings.
pub struct TestConfig<'a> {
    model: &'a ElRegression,
    b0_vals: Vec<f64>,
    param_nums: Vec<usize>,
    method: Method,
    return_weights: bool,
    return_params: bool,
    stochastic_exog: bool,
    options: OptimOptions,
}

impl<'a> TestConfig<'a> {
    /// The optimization method used to profile out the nuisance parameters.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Also return the empirical likelihood weight of each observation.
    pub fn return_weights(mut self) -> Self {
        self.return_weights = true;
        self
    }

    /// Also return the parameter vector under the hypothesis.
    pub fn return_params(mut self) -> Self {
        self.return_params = true;
        self
    }

    /// Whether the regressors are random (the default). When they are fixed,
    /// their first two sample moments are added as estimating equations.
    pub fn stochastic_exog(mut self, stochastic: bool) -> Self {
        self.stochastic_exog = stochastic;
        self
    }

    pub fn options(mut self, options: OptimOptions) -> Self {
        self.options = options;
        self
    }

    fn validate(&self) -> ElResult<()> {
        let nvar = self.model.nvar();
        if self.param_nums.is_empty() {
            return Err(ElError::BadInput("no parameters to test".to_string()));
        }
        if self.b0_vals.len() != self.param_nums.len() {
            return Err(ElError::BadInput(format!(
                "{} hypothesized values given for {} parameters",
                self.b0_vals.len(),
                self.param_nums.len()
            )));
        }
        if let Some(&bad) = self.param_nums.iter().find(|&&j| j >= nvar) {
            return Err(ElError::BadInput(format!(
                "parameter index {} out of range for {} parameters",
                bad, nvar
            )));
        }
        if self.param_nums.iter().unique().count() != self.param_nums.len() {
            return Err(ElError::BadInput(
                "parameter indices must be unique".to_string(),
            ));
        }
        if let Some(&bad) = self.b0_vals.iter().find(|b| !b.is_finite()) {
            return Err(ElError::BadInput(format!(
                "hypothesized value {} is not finite",
                bad
            )));
        }
        Ok(())
    }

    /// Minimize the statistic over the nuisance parameters. Returns the full
    /// parameter vector at the minimum and the capped statistic there.
    fn profile(&self) -> ElResult<(Array1<f64>, f64)> {
        self.validate()?;
        let model = self.model;
        let mut params: Array1<f64> = model.params().clone();
        for (&j, &b0) in self.param_nums.iter().zip(self.b0_vals.iter()) {
            params[j] = b0;
        }
        let nuisance: Vec<usize> = (0..model.nvar())
            .filter(|j| !self.param_nums.contains(j))
            .collect();
        if nuisance.is_empty() {
            let llr = model.capped_llr_at(&params, self.stochastic_exog)?;
            return Ok((params, llr));
        }

        // Refitting the nuisance coefficients with the tested ones held fixed
        // keeps the start inside the convex hull for reasonable hypotheses.
        let start = model.constrained_least_squares(&params, &nuisance)?;
        let stochastic_exog = self.stochastic_exog;
        let cost = |x: &[f64]| -> f64 {
            let mut trial = start.clone();
            for (&j, &v) in nuisance.iter().zip(x) {
                trial[j] = v;
            }
            model
                .capped_llr_at(&trial, stochastic_exog)
                .unwrap_or(f64::INFINITY)
        };
        let x0: Vec<f64> = nuisance.iter().map(|&j| start[j]).collect();
        let min = minimize(&cost, &x0, self.method, &self.options)?;
        if !min.fun.is_finite() || min.x.iter().any(|v| !v.is_finite()) {
            return Err(ElError::Optimization(format!(
                "no finite statistic found for nuisance parameters {:?}",
                nuisance
            )));
        }
        for (&j, &v) in nuisance.iter().zip(min.x.iter()) {
            params[j] = v;
        }
        Ok((params, min.fun))
    }

    /// Run the hypothesis test. A hypothesis that leaves every choice of the
    /// nuisance parameters outside the convex hull of the data fails with
    /// [`ElError::MaxIter`].
    pub fn test(self) -> ElResult<ElTest> {
        let (params, _) = self.profile()?;
        let sol = self.model.el_at(&params, self.stochastic_exog)?;
        let p_value = chi2_sf(sol.llr, self.param_nums.len())?;
        debug!(
            params = ?self.param_nums,
            values = ?self.b0_vals,
            llr = sol.llr,
            p_value,
            "regression hypothesis test"
        );
        Ok(ElTest {
            p_value,
            llr: sol.llr,
            weights: if self.return_weights {
                Some(sol.weights)
            } else {
                None
            },
            params: if self.return_params { Some(params) } else { None },
        })
    }
}

/// A confidence interval for a single regression coefficient and its
/// settings.
pub struct CiConfig<'a> {
    model: &'a ElRegression,
    param_num: usize,
    sig: f64,
    method: Method,
    lower_bound: Option<f64>,
    upper_bound: Option<f64>,
    stochastic_exog: bool,
    options: OptimOptions,
}

impl<'a> CiConfig<'a> {
    /// The significance level. The interval has 100*(1-sig)% coverage.
    pub fn sig(mut self, sig: f64) -> Self {
        self.sig = sig;
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// The lowest value searched for the lower endpoint. Defaults to the lower
    /// limit of the 99% least squares interval.
    pub fn lower_bound(mut self, bound: f64) -> Self {
        self.lower_bound = Some(bound);
        self
    }

    /// The highest value searched for the upper endpoint. Defaults to the
    /// upper limit of the 99% least squares interval.
    pub fn upper_bound(mut self, bound: f64) -> Self {
        self.upper_bound = Some(bound);
        self
    }

    pub fn stochastic_exog(mut self, stochastic: bool) -> Self {
        self.stochastic_exog = stochastic;
        self
    }

    pub fn options(mut self, options: OptimOptions) -> Self {
        self.options = options;
        self
    }

    /// Compute the (lower, upper) endpoints of the interval.
    pub fn ci(self) -> ElResult<(f64, f64)> {
        let model = self.model;
        let j = self.param_num;
        if j >= model.nvar() {
            return Err(ElError::BadInput(format!(
                "parameter index {} out of range for {} parameters",
                j,
                model.nvar()
            )));
        }
        if !(self.sig > 0. && self.sig < 1.) {
            return Err(ElError::BadInput(format!(
                "significance level {} not in (0, 1)",
                self.sig
            )));
        }
        let estimate = model.params()[j];
        let (lower, upper) = match (self.lower_bound, self.upper_bound) {
            (Some(lower), Some(upper)) => (lower, upper),
            (lower, upper) => {
                let ols_ci = model.ols().conf_int(0.01)?;
                (
                    lower.unwrap_or(ols_ci[[j, 0]]),
                    upper.unwrap_or(ols_ci[[j, 1]]),
                )
            }
        };
        if !(lower < estimate && estimate < upper) {
            return Err(ElError::BadInput(format!(
                "search bounds [{}, {}] must contain the estimate {}",
                lower, upper, estimate
            )));
        }

        let crit = chi2_1_critical(self.sig)?;
        // Infeasible values have a large capped statistic, so a search bound
        // outside the hull still brackets the endpoint.
        let excess = |b: f64| -> ElResult<f64> {
            let (_, llr) = model
                .test_beta(&[b], &[j])
                .method(self.method)
                .stochastic_exog(self.stochastic_exog)
                .options(self.options.clone())
                .profile()?;
            Ok(llr - crit)
        };
        let lower_lim = find_root(&excess, lower, estimate, self.options.xtol)?;
        let upper_lim = find_root(&excess, estimate, upper, self.options.xtol)?;
        debug!(param = j, lower_lim, upper_lim, "confidence interval");
        Ok((lower_lim, upper_lim))
    }
}

/// The upper-tail probability of a chi-squared variable with `df` degrees of
/// freedom.
pub(crate) fn chi2_sf(llr: f64, df: usize) -> ElResult<f64> {
    let dist =
        ChiSquared::new(df as f64).map_err(|e| ElError::Distribution(e.to_string()))?;
    Ok(dist.sf(llr.max(0.)))
}

/// The 1-sig quantile of the chi-squared distribution with one degree of
/// freedom, i.e. the square of the two-sided normal critical value.
fn chi2_1_critical(sig: f64) -> ElResult<f64> {
    let normal = Normal::new(0., 1.).map_err(|e| ElError::Distribution(e.to_string()))?;
    Ok(normal.inverse_cdf(1. - 0.5 * sig).powi(2))
}
