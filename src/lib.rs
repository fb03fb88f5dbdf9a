//! Empirical likelihood inference for linear regression coefficients and for
//! the equality of group means.
//!
//! The profile empirical likelihood ratio is computed by solving the convex
//! dual for the Lagrange multiplier and minimizing over nuisance parameters
//! with derivative-free methods. Confidence intervals invert the hypothesis
//! test, so the p-value at each endpoint equals the significance level.

pub mod anova;
pub mod datasets;
pub mod dual;
pub mod error;
pub mod ols;
pub mod optimize;
pub mod regression;
pub mod utility;

pub use anova::{AnovaResult, ElAnova};
pub use dual::DualOptions;
pub use error::{ElError, ElResult};
pub use optimize::{Method, OptimOptions};
pub use regression::{ElRegression, ElTest};
