//! Hypothesis tests and confidence intervals for the stack loss regression.
//!
//! The reference values in `tests/reference/hy_test_beta*` are written by
//! `tests/reference/generate.py` and are compared to 4 decimals.

use anyhow::Result;

mod common;
use common::{
    assert_almost_equal, assert_array_almost_equal, assert_ci_endpoints_pvalue,
    RegressionFixture, RegressionResults,
};
use ndarray_emplike::Method;

/// Test a single coefficient at its stored hypothesis and compare all three
/// outputs to the reference.
fn check_hypothesis(param_num: usize, method: Method) -> Result<()> {
    let fix = RegressionFixture::new()?;
    let b0 = RegressionResults::HYPOTHESES[param_num];
    let expected = fix.res.hy_test_beta(param_num);

    let res = fix
        .model
        .test_beta(&[b0], &[param_num])
        .method(method)
        .test()?;
    assert_almost_equal(res.p_value, expected.p_value, 4);
    assert_almost_equal(res.llr, expected.llr, 4);
    assert!(res.weights.is_none());

    let res = fix
        .model
        .test_beta(&[b0], &[param_num])
        .method(method)
        .return_weights()
        .test()?;
    let weights = res
        .weights
        .ok_or_else(|| anyhow::anyhow!("weights were requested"))?;
    assert_array_almost_equal(weights.view(), expected.weights.view(), 4);
    Ok(())
}

mod powell {
    use super::*;

    #[test]
    fn hypothesis_beta0() -> Result<()> {
        check_hypothesis(0, Method::Powell)
    }

    #[test]
    fn hypothesis_beta1() -> Result<()> {
        check_hypothesis(1, Method::Powell)
    }

    #[test]
    fn hypothesis_beta2() -> Result<()> {
        check_hypothesis(2, Method::Powell)
    }

    #[test]
    fn hypothesis_beta3() -> Result<()> {
        check_hypothesis(3, Method::Powell)
    }

    #[test]
    fn ci_beta0() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(0).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 0, ci, Method::Powell)
    }

    #[test]
    fn ci_beta1() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(1).method(Method::Powell).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 1, ci, Method::Powell)
    }

    #[test]
    fn ci_beta2() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(2).method(Method::Powell).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 2, ci, Method::Powell)
    }

    #[test]
    fn ci_beta3() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(3).method(Method::Powell).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 3, ci, Method::Powell)
    }
}

mod nelder_mead {
    use super::*;

    #[test]
    fn hypothesis_beta0() -> Result<()> {
        check_hypothesis(0, Method::NelderMead)
    }

    #[test]
    fn hypothesis_beta1() -> Result<()> {
        check_hypothesis(1, Method::NelderMead)
    }

    #[test]
    fn hypothesis_beta2() -> Result<()> {
        check_hypothesis(2, Method::NelderMead)
    }

    #[test]
    fn hypothesis_beta3() -> Result<()> {
        check_hypothesis(3, Method::NelderMead)
    }

    #[test]
    // The default lower search bound does not bracket the endpoint reliably
    // with the simplex, so the search starts further out.
    fn ci_beta0() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix
            .model
            .ci_beta(0)
            .method(Method::NelderMead)
            .lower_bound(-60.)
            .ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 0, ci, Method::NelderMead)
    }

    #[test]
    fn ci_beta1() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(1).method(Method::NelderMead).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 1, ci, Method::NelderMead)
    }

    #[test]
    fn ci_beta2() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(2).method(Method::NelderMead).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 2, ci, Method::NelderMead)
    }

    #[test]
    fn ci_beta3() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(3).method(Method::NelderMead).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 3, ci, Method::NelderMead)
    }

    #[test]
    // An interval profiled with Powell is still an interval when the
    // endpoints are re-tested with the simplex.
    fn ci_beta3_powell_interval() -> Result<()> {
        let fix = RegressionFixture::new()?;
        let ci = fix.model.ci_beta(3).ci()?;
        assert_ci_endpoints_pvalue(&fix.model, 3, ci, Method::NelderMead)
    }
}

#[test]
fn repeated_calls_agree() -> Result<()> {
    let fix = RegressionFixture::new()?;
    let b0 = RegressionResults::HYPOTHESES[1];
    for &method in &[Method::Powell, Method::NelderMead] {
        let first = fix
            .model
            .test_beta(&[b0], &[1])
            .method(method)
            .return_weights()
            .test()?;
        let second = fix
            .model
            .test_beta(&[b0], &[1])
            .method(method)
            .return_weights()
            .test()?;
        assert_eq!(first, second);
    }
    let first = fix.model.ci_beta(2).ci()?;
    let second = fix.model.ci_beta(2).ci()?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn methods_agree() -> Result<()> {
    let fix = RegressionFixture::new()?;
    for (param_num, &b0) in RegressionResults::HYPOTHESES.iter().enumerate() {
        let powell = fix.model.test_beta(&[b0], &[param_num]).test()?;
        let simplex = fix
            .model
            .test_beta(&[b0], &[param_num])
            .method(Method::NelderMead)
            .test()?;
        assert_almost_equal(powell.llr, simplex.llr, 5);
    }
    Ok(())
}

#[test]
// Wider intervals have lower significance.
fn interval_nesting() -> Result<()> {
    let fix = RegressionFixture::new()?;
    let (lo95, hi95) = fix.model.ci_beta(1).ci()?;
    let (lo90, hi90) = fix.model.ci_beta(1).sig(0.1).ci()?;
    assert!(lo95 < lo90 && hi90 < hi95);
    Ok(())
}
