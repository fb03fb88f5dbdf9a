//! Modified Newton iteration for the Lagrange multiplier of the empirical
//! likelihood dual problem.
//!
//! For estimating equations z_i, i = 1..n, the empirical likelihood of the
//! hypothesis E[z] = 0 is maximized by the weights
//! w_i = 1 / (n (1 + lambda^T z_i)), where lambda maximizes
//! sum_i log(1 + lambda^T z_i). The logarithm is replaced by Owen's
//! pseudo-logarithm below 1/n so that the objective is finite and concave on
//! the whole space, and the iteration can start from lambda = 0 even when the
//! hypothesis lies close to the boundary of the convex hull of the data.
use crate::error::{ElError, ElResult};
use ndarray::{Array1, Array2, ArrayView2, Zip};
use ndarray_linalg::SolveH;
use tracing::trace;

/// Specifies the options of the inner Newton solve.
#[derive(Clone, Debug)]
pub struct DualOptions {
    /// The maximum number of Newton iterations. Step halving does not count
    /// against this limit.
    pub max_iter: usize,
    /// The relative tolerance of the objective
    pub tol: f64,
    /// The maximum number of times a single step can be halved
    pub max_step_halves: usize,
}

impl Default for DualOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: f64::EPSILON,
            max_step_halves: 16,
        }
    }
}

/// The solution of the dual problem for a single hypothesis.
#[derive(Clone, Debug)]
pub struct DualSolution {
    /// The Lagrange multiplier
    pub lambda: Array1<f64>,
    /// The empirical likelihood weight of each observation. These sum to one
    /// when the hypothesis is inside the convex hull of the data.
    pub weights: Array1<f64>,
    /// -2 times the log empirical likelihood ratio
    pub llr: f64,
    /// The number of Newton iterations taken
    pub n_iter: usize,
}

/// Owen's pseudo-logarithm and its first two derivatives. It equals log(x)
/// for x >= 1/n and is continued below that by the matching quadratic.
pub fn log_star(x: f64, n: f64) -> (f64, f64, f64) {
    let thresh = n.recip();
    if x < thresh {
        let nx = n * x;
        (
            -n.ln() - 1.5 + nx * (2. - 0.5 * nx),
            n * (2. - nx),
            -n * n,
        )
    } else {
        (x.ln(), x.recip(), -(x * x).recip())
    }
}

/// The concave objective sum_i log*(1 + lambda^T z_i).
fn objective(est: &ArrayView2<f64>, lambda: &Array1<f64>) -> f64 {
    let n = est.nrows() as f64;
    est.dot(lambda)
        .iter()
        .map(|&lz| log_star(1. + lz, n).0)
        .sum()
}

/// Iterate over Newton updates of the Lagrange multiplier until the objective
/// stops improving.
pub struct ModifiedNewton<'a> {
    /// Estimating equations with observations in rows
    est: ArrayView2<'a, f64>,
    options: &'a DualOptions,
    /// The current multiplier guess
    guess: Array1<f64>,
    /// The number of Newton iterations taken so far
    pub n_iter: usize,
    /// The objective at the current guess
    last_obj: f64,
    /// Set when the last step was accepted within tolerance, so that the next
    /// call terminates.
    done: bool,
}

/// Represents a step of the modified Newton iteration.
pub struct NewtonStep {
    pub guess: Array1<f64>,
    pub obj: f64,
    /// The number of step halvings applied in this iteration
    pub halves: usize,
}

impl<'a> ModifiedNewton<'a> {
    pub fn new(est: ArrayView2<'a, f64>, options: &'a DualOptions) -> Self {
        let guess = Array1::zeros(est.ncols());
        // log*(1) = 0 for every observation
        Self {
            est,
            options,
            guess,
            n_iter: 0,
            last_obj: 0.,
            done: false,
        }
    }

    /// The objective at the latest accepted guess.
    pub fn objective(&self) -> f64 {
        self.last_obj
    }

    /// Returns the (negative Hessian, gradient) of the objective at the
    /// current guess.
    fn newton_mat_vec(&self) -> (Array2<f64>, Array1<f64>) {
        let n = self.est.nrows() as f64;
        let lin: Array1<f64> = self.est.dot(&self.guess);
        let mut d1: Array1<f64> = Array1::zeros(lin.len());
        let mut neg_d2: Array1<f64> = Array1::zeros(lin.len());
        Zip::from(&mut d1)
            .and(&mut neg_d2)
            .and(&lin)
            .for_each(|d1, neg_d2, &lz| {
                let (_, first, second) = log_star(1. + lz, n);
                *d1 = first;
                *neg_d2 = -second;
            });
        let grad: Array1<f64> = self.est.t().dot(&d1);
        let neg_hessian: Array2<f64> = (&self.est.t() * &neg_d2).dot(&self.est);
        (neg_hessian, grad)
    }

    /// Move to a new guess, while incrementing the number of iterations and
    /// checking that it is not over the maximum.
    fn step_with(
        &mut self,
        next_guess: Array1<f64>,
        next_obj: f64,
        halves: usize,
    ) -> <Self as Iterator>::Item {
        self.guess.assign(&next_guess);
        self.last_obj = next_obj;
        self.n_iter += 1;
        if self.n_iter > self.options.max_iter {
            return Err(ElError::MaxIter(self.options.max_iter));
        }
        Ok(NewtonStep {
            guess: next_guess,
            obj: next_obj,
            halves,
        })
    }
}

impl<'a> Iterator for ModifiedNewton<'a> {
    type Item = ElResult<NewtonStep>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (neg_hessian, grad) = self.newton_mat_vec();
        let step: Array1<f64> = match neg_hessian.solveh_into(grad) {
            Ok(step) => step,
            Err(err) => return Some(Err(err.into())),
        };
        let mut next_guess: Array1<f64> = &self.guess + &step;
        let mut next_obj = objective(&self.est, &next_guess);
        let mut rel = relative_improvement(next_obj, self.last_obj);
        if rel.abs() <= self.options.tol {
            if rel >= 0. {
                self.done = true;
                return Some(self.step_with(next_guess, next_obj, 0));
            }
            return None;
        }
        if rel > 0. {
            return Some(self.step_with(next_guess, next_obj, 0));
        }

        // The objective got worse, so backtrack along the Newton direction.
        let mut halves = 0;
        let mut mult = 0.5;
        while rel < 0. && halves < self.options.max_step_halves {
            next_guess = &self.guess + &(&step * mult);
            next_obj = objective(&self.est, &next_guess);
            rel = relative_improvement(next_obj, self.last_obj);
            mult *= 0.5;
            halves += 1;
        }
        if rel > 0. {
            Some(self.step_with(next_guess, next_obj, halves))
        } else {
            // No improvement can be found along the Newton direction, which
            // only happens at the optimum up to rounding.
            None
        }
    }
}

/// Positive for an improved objective. A step to a non-finite objective
/// always counts as worse so that it is halved.
fn relative_improvement(next_obj: f64, last_obj: f64) -> f64 {
    if next_obj.is_finite() {
        (next_obj - last_obj) / (f64::EPSILON + next_obj.abs())
    } else {
        f64::NEG_INFINITY
    }
}

fn check_finite(est: &ArrayView2<f64>) -> ElResult<()> {
    if est.nrows() == 0 {
        return Err(ElError::BadInput("no observations".to_string()));
    }
    if est.iter().any(|z| !z.is_finite()) {
        return Err(ElError::BadInput(
            "estimating equations are not finite".to_string(),
        ));
    }
    Ok(())
}

/// Solve for the Lagrange multiplier of the estimating equations `est`, with
/// observations in rows, and return the resulting weights and likelihood
/// ratio statistic.
pub fn solve<'a>(est: ArrayView2<'a, f64>, options: &'a DualOptions) -> ElResult<DualSolution> {
    check_finite(&est)?;
    let nobs = est.nrows();
    let mut newton = ModifiedNewton::new(est, options);
    let mut lambda: Array1<f64> = Array1::zeros(est.ncols());
    let mut obj = 0.;
    for step in &mut newton {
        let step = step?;
        trace!(obj = step.obj, halves = step.halves, "newton step");
        lambda = step.guess;
        obj = step.obj;
    }
    let n = nobs as f64;
    let weights: Array1<f64> = est.dot(&lambda).mapv(|lz| (n * (1. + lz)).recip());
    Ok(DualSolution {
        lambda,
        weights,
        llr: 2. * obj,
        n_iter: newton.n_iter,
    })
}

/// The likelihood ratio statistic for use as an optimization objective.
///
/// A hypothesis outside the convex hull of the data has no solution and the
/// multiplier diverges. Instead of failing, the statistic at the iteration
/// cap is returned. It is finite but far above any feasible value, so a
/// minimizer can step out of the hull and back without breaking down.
pub fn capped_llr<'a>(est: ArrayView2<'a, f64>, options: &'a DualOptions) -> ElResult<f64> {
    check_finite(&est)?;
    let mut newton = ModifiedNewton::new(est, options);
    for step in &mut newton {
        match step {
            Ok(_) => {}
            Err(ElError::MaxIter(_)) => break,
            Err(err) => return Err(err),
        }
    }
    Ok(2. * newton.objective())
}
