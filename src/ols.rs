//! Ordinary least squares, used to seed the empirical likelihood searches.

use crate::error::{ElError, ElResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ndarray_linalg::{DeterminantH, InverseH, SolveH};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// The result of an ordinary least squares regression. The design matrix is
/// used as given, so it should already contain an intercept column if one is
/// desired.
#[derive(Clone, Debug)]
pub struct Ols {
    /// The parameter values that minimize the sum of squared residuals
    pub params: Array1<f64>,
    /// number of data points minus number of free parameters
    pub ndf: usize,
    resid: Array1<f64>,
    xtx_inv: Array2<f64>,
}

impl Ols {
    pub fn fit(endog: ArrayView1<f64>, exog: ArrayView2<f64>) -> ElResult<Self> {
        let n_data = endog.len();
        if n_data != exog.nrows() {
            return Err(ElError::BadInput(
                "y and x data must have same number of points".to_string(),
            ));
        }
        if n_data <= exog.ncols() {
            // The regression can find a solution if n_data == ncols, but
            // there will be no estimate for the uncertainty.
            return Err(ElError::Underconstrained);
        }
        let xtx: Array2<f64> = exog.t().dot(&exog);
        let det = xtx.deth()?;
        if det.abs() < default_epsilon(exog.ncols()) {
            return Err(ElError::ColinearData);
        }
        let xty: Array1<f64> = exog.t().dot(&endog);
        let params: Array1<f64> = xtx.solveh(&xty)?;
        let resid = &endog - &exog.dot(&params);
        let xtx_inv = xtx.invh()?;
        Ok(Self {
            params,
            ndf: n_data - exog.ncols(),
            resid,
            xtx_inv,
        })
    }

    /// The residuals y - X*beta.
    pub fn resid(&self) -> &Array1<f64> {
        &self.resid
    }

    /// Unbiased estimate of the error variance, RSS / (n - p).
    pub fn scale(&self) -> f64 {
        self.resid.dot(&self.resid) / self.ndf as f64
    }

    /// Standard errors of the parameters.
    pub fn bse(&self) -> Array1<f64> {
        let scale = self.scale();
        self.xtx_inv.diag().mapv(|v| (scale * v).sqrt())
    }

    /// The two-sided 100*(1-alpha)% confidence intervals of the parameters
    /// based on the t distribution. Each row holds the (lower, upper) limits
    /// of one parameter.
    pub fn conf_int(&self, alpha: f64) -> ElResult<Array2<f64>> {
        if !(alpha > 0. && alpha < 1.) {
            return Err(ElError::BadInput(format!(
                "significance level {} not in (0, 1)",
                alpha
            )));
        }
        let t_dist = StudentsT::new(0., 1., self.ndf as f64)
            .map_err(|e| ElError::Distribution(e.to_string()))?;
        let t_crit = t_dist.inverse_cdf(1. - 0.5 * alpha);
        let half_width = self.bse() * t_crit;
        let mut limits: Array2<f64> = Array2::zeros((self.params.len(), 2));
        limits.column_mut(0).assign(&(&self.params - &half_width));
        limits.column_mut(1).assign(&(&self.params + &half_width));
        Ok(limits)
    }
}

/// Default tolerance for colinearity checking.
/// Uses the square root of the number of parameters times machine epsilon.
fn default_epsilon(n_par: usize) -> f64 {
    (n_par as f64).sqrt() * f64::EPSILON
}
