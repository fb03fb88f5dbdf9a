//! Fixtures and assertion helpers shared by the integration tests
// Each test binary uses a different subset of these.
#![allow(dead_code)]
use anyhow::{anyhow, Result};
use ndarray::{Array1, ArrayView1};
use ndarray_emplike::{
    datasets::{mtcars, stackloss},
    utility::add_constant,
    ElAnova, ElRegression, Method,
};
use num_traits::Float;
use std::{
    error::Error,
    fs::File,
    io::{BufRead, BufReader},
    str::FromStr,
};

/// Read a flat array from a text file
#[cfg(test)]
pub fn array_from_csv<X>(file: &str) -> Result<Array1<X>>
where
    X: Float + FromStr,
    <X as FromStr>::Err: 'static + Error + Send + Sync,
{
    let file = File::open(file)?;
    let reader = BufReader::new(file);
    let mut x_vec: Vec<X> = Vec::new();
    for line_result in reader.lines() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }
        let x_parsed: X = line.trim().parse()?;
        x_vec.push(x_parsed);
    }
    let x: Array1<X> = x_vec.into();
    Ok(x)
}

/// Read a file holding a single number
#[cfg(test)]
pub fn scalar_from_csv(file: &str) -> Result<f64> {
    let values = array_from_csv::<f64>(file)?;
    match values.len() {
        1 => Ok(values[0]),
        n => Err(anyhow!("Expected one entry in {}, found {}", file, n)),
    }
}

/// Stored outputs of a single test call.
#[derive(Clone, Debug)]
pub struct Reference {
    pub p_value: f64,
    pub llr: f64,
    pub weights: Array1<f64>,
    /// only stored for the ANOVA
    pub mu: Option<f64>,
}

impl Reference {
    fn load(name: &str) -> Result<Self> {
        let dir = format!("tests/reference/{}", name);
        let mu_file = format!("{}/mu.csv", dir);
        let mu = if std::path::Path::new(&mu_file).exists() {
            Some(scalar_from_csv(&mu_file)?)
        } else {
            None
        };
        Ok(Self {
            p_value: scalar_from_csv(&format!("{}/p_value.csv", dir))?,
            llr: scalar_from_csv(&format!("{}/llr.csv", dir))?,
            weights: array_from_csv(&format!("{}/weights.csv", dir))?,
            mu,
        })
    }
}

/// Reference results for testing each coefficient of the stack loss
/// regression at the value in `HYPOTHESES`.
#[derive(Clone, Debug)]
pub struct RegressionResults {
    pub hy_test_beta0: Reference,
    pub hy_test_beta1: Reference,
    pub hy_test_beta2: Reference,
    pub hy_test_beta3: Reference,
}

impl RegressionResults {
    /// The values tested for coefficients 0 through 3.
    pub const HYPOTHESES: [f64; 4] = [-30., 0.5, 1., 0.];

    pub fn load() -> Result<Self> {
        Ok(Self {
            hy_test_beta0: Reference::load("hy_test_beta0")?,
            hy_test_beta1: Reference::load("hy_test_beta1")?,
            hy_test_beta2: Reference::load("hy_test_beta2")?,
            hy_test_beta3: Reference::load("hy_test_beta3")?,
        })
    }

    pub fn hy_test_beta(&self, param_num: usize) -> &Reference {
        match param_num {
            0 => &self.hy_test_beta0,
            1 => &self.hy_test_beta1,
            2 => &self.hy_test_beta2,
            _ => &self.hy_test_beta3,
        }
    }
}

/// The stack loss regression with an intercept, together with its reference
/// results.
pub struct RegressionFixture {
    pub model: ElRegression,
    pub res: RegressionResults,
}

impl RegressionFixture {
    pub fn new() -> Result<Self> {
        let data = stackloss();
        let exog = add_constant(data.exog.view());
        let model = ElRegression::new(data.endog.view(), exog.view())?;
        Ok(Self {
            model,
            res: RegressionResults::load()?,
        })
    }
}

/// ANOVA comparing the rear axle ratio and weight columns over the first 30
/// rows of the Motor Trend data.
pub struct AnovaFixture {
    pub anova: ElAnova,
    pub res: Reference,
}

impl AnovaFixture {
    pub fn new() -> Result<Self> {
        let data = mtcars();
        let cols = data.columns(0..30, 1..3)?;
        let groups: Vec<Array1<f64>> = cols.columns().into_iter().map(|c| c.to_owned()).collect();
        Ok(Self {
            anova: ElAnova::new(groups)?,
            res: Reference::load("compute_anova")?,
        })
    }
}

/// Check that `actual` and `expected` agree to `decimal` places, in the sense
/// |actual - expected| < 1.5 * 10^(-decimal).
pub fn assert_almost_equal(actual: f64, expected: f64, decimal: i32) {
    let tol = 1.5 * 10f64.powi(-decimal);
    assert!(
        (actual - expected).abs() < tol,
        "{} and {} differ by more than {}",
        actual,
        expected,
        tol
    );
}

/// Element-wise version of [`assert_almost_equal`].
pub fn assert_array_almost_equal(actual: ArrayView1<f64>, expected: ArrayView1<f64>, decimal: i32) {
    assert_eq!(actual.len(), expected.len(), "array lengths differ");
    for (&a, &e) in actual.iter().zip(expected.iter()) {
        assert_almost_equal(a, e, decimal);
    }
}

/// Re-test the coefficient at both endpoints of a 95% interval. Each must sit
/// exactly at the 0.05 significance level.
pub fn assert_ci_endpoints_pvalue(
    model: &ElRegression,
    param_num: usize,
    ci: (f64, f64),
    method: Method,
) -> Result<()> {
    let (lower, upper) = ci;
    assert!(lower < model.params()[param_num] && model.params()[param_num] < upper);
    for &endpoint in &[lower, upper] {
        let p_value = model
            .test_beta(&[endpoint], &[param_num])
            .method(method)
            .test()?
            .p_value;
        assert_almost_equal(p_value, 0.05, 4);
    }
    Ok(())
}
