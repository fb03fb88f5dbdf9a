//! utility functions for internal library use

use ndarray::{concatenate, Array2, ArrayView2, Axis};
use num_traits::identities::One;

/// Prepend the covariates with a column of ones.
/// Used to incorporate a constant intercept term in a regression.
pub fn add_constant<T>(exog: ArrayView2<T>) -> Array2<T>
where
    T: Copy + One,
{
    let ones: Array2<T> = Array2::ones((exog.nrows(), 1));
    concatenate![Axis(1), ones, exog]
}
