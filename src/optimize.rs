//! Derivative-free minimization of the profile likelihood and root finding
//! for interval endpoints.
//!
//! The nuisance parameters of an empirical likelihood hypothesis test are
//! profiled out by minimizing -2 log R over them. The objective is only
//! piecewise smooth and is infinite where the hypothesis leaves the convex
//! hull of the data, so only derivative-free methods are offered.
use crate::error::{ElError, ElResult};
use argmin::core::{CostFunction, Error, Executor, State};
use argmin::solver::brent::{BrentOpt, BrentRoot};
use argmin::solver::neldermead::NelderMead;
use ndarray::{Array1, Array2};
use tracing::{debug, trace};

/// The optimization strategy used to profile out nuisance parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Powell's conjugate direction method with Brent line searches
    Powell,
    /// The Nelder-Mead downhill simplex
    NelderMead,
}

impl Default for Method {
    fn default() -> Self {
        Method::Powell
    }
}

/// Specifies the stopping criteria of the minimizers.
#[derive(Clone, Debug)]
pub struct OptimOptions {
    /// The maximum number of iterations of a single run of the minimizer
    pub max_iter: u64,
    /// The tolerance of the objective. For Powell this is relative to the
    /// size of the objective, for Nelder-Mead it bounds the standard
    /// deviation of the simplex values.
    pub ftol: f64,
    /// The absolute tolerance of a line search or root
    pub xtol: f64,
    /// The maximum number of times the Nelder-Mead simplex is rebuilt around
    /// the best vertex.
    pub max_restarts: usize,
}

impl Default for OptimOptions {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            ftol: 1e-12,
            xtol: 1e-10,
            max_restarts: 10,
        }
    }
}

/// The location and value of a minimum.
#[derive(Clone, Debug)]
pub struct Minimum {
    pub x: Array1<f64>,
    pub fun: f64,
    /// The total number of iterations over all runs
    pub n_iter: u64,
}

/// Adapts a closure to the `argmin` cost function interface. Non-finite
/// values are reported as positive infinity so that the simplex ordering is
/// always defined.
struct ClosureCost<'a, C> {
    cost: &'a C,
}

impl<'a, C> CostFunction for ClosureCost<'a, C>
where
    C: Fn(&[f64]) -> f64,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(finite_or_inf((self.cost)(param)))
    }
}

/// The objective restricted to the line x + t * direction.
struct LineCost<'a, C> {
    cost: &'a C,
    origin: &'a Array1<f64>,
    direction: &'a Array1<f64>,
}

impl<'a, C> LineCost<'a, C>
where
    C: Fn(&[f64]) -> f64,
{
    fn point(&self, t: f64) -> Array1<f64> {
        self.origin + &(self.direction * t)
    }

    fn eval(&self, t: f64) -> f64 {
        let x = self.point(t);
        finite_or_inf((self.cost)(&x.to_vec()))
    }
}

impl<'a, C> CostFunction for LineCost<'a, C>
where
    C: Fn(&[f64]) -> f64,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, t: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.eval(*t))
    }
}

/// A scalar function whose zero is sought.
struct RootCost<'a, R> {
    func: &'a R,
}

impl<'a, R> CostFunction for RootCost<'a, R>
where
    R: Fn(f64) -> ElResult<f64>,
{
    type Param = f64;
    type Output = f64;

    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        (self.func)(*x).map_err(|e| Error::msg(e.to_string()))
    }
}

fn finite_or_inf(val: f64) -> f64 {
    if val.is_nan() {
        f64::INFINITY
    } else {
        val
    }
}

/// Minimize `cost` starting from `x0` with the given method.
pub fn minimize<C>(cost: &C, x0: &[f64], method: Method, options: &OptimOptions) -> ElResult<Minimum>
where
    C: Fn(&[f64]) -> f64,
{
    if x0.is_empty() {
        return Err(ElError::BadInput(
            "cannot minimize over zero parameters".to_string(),
        ));
    }
    let min = match method {
        Method::Powell => powell(cost, x0, options)?,
        Method::NelderMead => nelder_mead(cost, x0, options)?,
    };
    debug!(?method, fun = min.fun, n_iter = min.n_iter, "minimized");
    Ok(min)
}

/// Builds the initial simplex by perturbing each coordinate of the starting
/// point by 5%, or by a small absolute amount if it is zero.
fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = vec![x0.to_vec()];
    for i in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[i] = if vertex[i] != 0. {
            1.05 * vertex[i]
        } else {
            0.00025
        };
        simplex.push(vertex);
    }
    simplex
}

/// Run the Nelder-Mead simplex, rebuilding the simplex around the best vertex
/// until the minimum stops improving. A collapsed simplex can otherwise stall
/// away from the minimum.
fn nelder_mead<C>(cost: &C, x0: &[f64], options: &OptimOptions) -> ElResult<Minimum>
where
    C: Fn(&[f64]) -> f64,
{
    let mut best_x = x0.to_vec();
    let mut best_fun = finite_or_inf(cost(x0));
    let mut n_iter = 0;
    for restart in 0..=options.max_restarts {
        let solver = NelderMead::new(initial_simplex(&best_x)).with_sd_tolerance(options.ftol)?;
        let problem = ClosureCost { cost };
        let res = Executor::new(problem, solver)
            .configure(|state| state.max_iters(options.max_iter))
            .run()?;
        let state = res.state();
        n_iter += state.get_iter();
        let x = state
            .get_best_param()
            .cloned()
            .ok_or_else(|| ElError::Optimization("Nelder-Mead returned no parameters".to_string()))?;
        let fun = state.get_best_cost();
        trace!(restart, fun, status = ?state.get_termination_status(), "simplex run");
        let improvement = best_fun - fun;
        if fun <= best_fun {
            best_x = x;
            best_fun = fun;
        }
        if restart > 0 && improvement <= options.ftol * (1. + best_fun.abs()) {
            break;
        }
    }
    Ok(Minimum {
        x: Array1::from(best_x),
        fun: best_fun,
        n_iter,
    })
}

/// Powell's conjugate direction method. Each sweep minimizes along every
/// direction in turn; the direction with the largest decrease is then
/// replaced by the net displacement of the sweep when that is favorable.
fn powell<C>(cost: &C, x0: &[f64], options: &OptimOptions) -> ElResult<Minimum>
where
    C: Fn(&[f64]) -> f64,
{
    let n_par = x0.len();
    let mut x = Array1::from(x0.to_vec());
    let mut fx = finite_or_inf(cost(x0));
    let mut directions: Array2<f64> = Array2::eye(n_par);
    let mut n_iter = 0;
    while n_iter < options.max_iter {
        n_iter += 1;
        let x_start = x.clone();
        let fx_start = fx;
        // the index of the direction with the largest decrease and its size
        let mut big_ind = 0;
        let mut delta = 0.;
        for i in 0..n_par {
            let direction = directions.row(i).to_owned();
            let fx_prev = fx;
            let (x_next, fx_next) = line_minimize(cost, &x, &direction, fx, options)?;
            x = x_next;
            fx = fx_next;
            if fx_prev - fx > delta {
                delta = fx_prev - fx;
                big_ind = i;
            }
        }
        trace!(n_iter, fx, "powell sweep");
        if !fx.is_finite() {
            // Every line search stayed put on an infinite cost.
            break;
        }
        if 2. * (fx_start - fx) <= options.ftol * (fx_start.abs() + fx.abs()) + 1e-20 {
            break;
        }

        let displacement: Array1<f64> = &x - &x_start;
        let extrapolated: Array1<f64> = &x + &displacement;
        let fx_ext = finite_or_inf(cost(&extrapolated.to_vec()));
        if fx_start > fx_ext {
            let t = 2. * (fx_start + fx_ext - 2. * fx) * (fx_start - fx - delta).powi(2)
                - delta * (fx_start - fx_ext).powi(2);
            if t < 0. {
                let (x_next, fx_next) = line_minimize(cost, &x, &displacement, fx, options)?;
                x = x_next;
                fx = fx_next;
                if displacement.iter().any(|&d| d != 0.) {
                    let last = directions.row(n_par - 1).to_owned();
                    directions.row_mut(big_ind).assign(&last);
                    directions.row_mut(n_par - 1).assign(&displacement);
                }
            }
        }
    }
    if n_iter >= options.max_iter {
        debug!(n_iter, "Powell reached the maximum number of iterations");
    }
    Ok(Minimum { x, fun: fx, n_iter })
}

/// The golden ratio used to grow the bracket
const GOLDEN: f64 = 1.618_033_988_749_895;
const MAX_BRACKET_STEPS: usize = 64;
/// The number of times a step onto an infinite cost is halved
const MAX_SHRINK_STEPS: usize = 40;

/// Move `t` towards `center` until the cost there is finite. Returns the new
/// point and its cost, which stays infinite if no finite value was found.
fn shrink_to_finite<C>(line: &LineCost<C>, center: f64, mut t: f64, mut ft: f64) -> (f64, f64)
where
    C: Fn(&[f64]) -> f64,
{
    let mut shrinks = 0;
    while !ft.is_finite() && shrinks < MAX_SHRINK_STEPS {
        t = center + 0.5 * (t - center);
        ft = line.eval(t);
        shrinks += 1;
    }
    (t, ft)
}

/// Minimize `cost` along `direction` from `origin`, where `f_origin` is the
/// cost at the origin. The minimum is bracketed by golden-ratio expansion and
/// then refined with Brent's method. Brent only ever sees a bracket with
/// finite ends.
fn line_minimize<C>(
    cost: &C,
    origin: &Array1<f64>,
    direction: &Array1<f64>,
    f_origin: f64,
    options: &OptimOptions,
) -> ElResult<(Array1<f64>, f64)>
where
    C: Fn(&[f64]) -> f64,
{
    let line = LineCost {
        cost,
        origin,
        direction,
    };
    let stay = || Ok((origin.clone(), f_origin));
    if !f_origin.is_finite() {
        // There is nothing to compare against.
        return stay();
    }
    let (mut a, mut fa) = (0., f_origin);
    let (mut b, mut fb) = shrink_to_finite(&line, 0., 1., line.eval(1.));
    if !fb.is_finite() {
        return stay();
    }
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = b + GOLDEN * (b - a);
    let mut fc = line.eval(c);
    let mut steps = 0;
    while fc < fb && steps < MAX_BRACKET_STEPS {
        a = b;
        b = c;
        fb = fc;
        c = b + GOLDEN * (b - a);
        fc = line.eval(c);
        steps += 1;
    }
    if fc < fb {
        // The objective keeps decreasing; settle for the furthest point.
        return Ok((line.point(c), fc));
    }
    let (c, fc) = shrink_to_finite(&line, b, c, fc);
    if !fc.is_finite() {
        // No finite bracket around b, which is no worse than the origin.
        return Ok((line.point(b), fb));
    }
    if fc < fb {
        return Ok((line.point(c), fc));
    }
    let (lower, upper) = if a < c { (a, c) } else { (c, a) };
    let solver = BrentOpt::new(lower, upper).set_tolerance(f64::EPSILON.sqrt(), options.xtol);
    let res = Executor::new(line, solver)
        .configure(|state| state.max_iters(200))
        .run()?;
    let state = res.state();
    let (t_best, f_best) = match state.get_best_param() {
        Some(&t) if t.is_finite() && state.get_best_cost() <= fb => (t, state.get_best_cost()),
        _ => (b, fb),
    };
    // The origin itself may still be the best point if the line is flat.
    if f_best > f_origin {
        return stay();
    }
    let line = LineCost {
        cost,
        origin,
        direction,
    };
    Ok((line.point(t_best), f_best))
}

/// Find a zero of `func` in `[lower, upper]` with Brent's method. The function
/// must change sign over the interval.
pub fn find_root<R>(func: &R, lower: f64, upper: f64, tol: f64) -> ElResult<f64>
where
    R: Fn(f64) -> ElResult<f64>,
{
    let f_lower = func(lower)?;
    let f_upper = func(upper)?;
    if f_lower == 0. {
        return Ok(lower);
    }
    if f_upper == 0. {
        return Ok(upper);
    }
    if f_lower.signum() == f_upper.signum() {
        return Err(ElError::NoSignChange { lower, upper });
    }
    let solver = BrentRoot::new(lower, upper, tol);
    let res = Executor::new(RootCost { func }, solver)
        .configure(|state| state.max_iters(200))
        .run()?;
    let state = res.state();
    let root = state
        .get_best_param()
        .copied()
        .ok_or_else(|| ElError::Optimization("Brent root search returned no point".to_string()))?;
    debug!(root, residual = state.get_best_cost(), n_iter = state.get_iter(), "found root");
    Ok(root)
}
