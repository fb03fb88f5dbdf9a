//! Small reference datasets bundled with the crate.

use crate::error::{ElError, ElResult};
use ndarray::{s, Array1, Array2};
use std::ops::Range;

/// A response vector together with the covariates it was observed with.
#[derive(Clone, Debug)]
pub struct Dataset {
    /// The response variable, one entry per observation.
    pub endog: Array1<f64>,
    /// The covariates with observations in rows. No intercept column is
    /// included.
    pub exog: Array2<f64>,
    pub endog_name: &'static str,
    pub exog_names: Vec<&'static str>,
}

impl Dataset {
    pub fn nobs(&self) -> usize {
        self.endog.len()
    }

    /// Copy a rectangular block of the covariates.
    pub fn columns(&self, rows: Range<usize>, cols: Range<usize>) -> ElResult<Array2<f64>> {
        if rows.end > self.exog.nrows() || cols.end > self.exog.ncols() {
            return Err(ElError::BadInput(format!(
                "slice [{:?}, {:?}] out of bounds for data of shape {:?}",
                rows,
                cols,
                self.exog.dim()
            )));
        }
        Ok(self.exog.slice(s![rows, cols]).to_owned())
    }
}

/// Stack loss plant data (Brownlee, 1965): operation of a plant oxidizing
/// ammonia to nitric acid over 21 days.
///
/// The response is the stack loss (ten times the percentage of ammonia
/// escaping unabsorbed). The covariates are the air flow, the cooling water
/// inlet temperature and the acid concentration.
pub fn stackloss() -> Dataset {
    #[rustfmt::skip]
    const DATA: [[f64; 4]; 21] = [
        // STACKLOSS, AIRFLOW, WATERTEMP, ACIDCONC
        [42., 80., 27., 89.],
        [37., 80., 27., 88.],
        [37., 75., 25., 90.],
        [28., 62., 24., 87.],
        [18., 62., 22., 87.],
        [18., 62., 23., 87.],
        [19., 62., 24., 93.],
        [20., 62., 24., 93.],
        [15., 58., 23., 87.],
        [14., 58., 18., 80.],
        [14., 58., 18., 89.],
        [13., 58., 17., 88.],
        [11., 58., 18., 82.],
        [12., 58., 19., 93.],
        [8., 50., 18., 89.],
        [7., 50., 18., 86.],
        [8., 50., 19., 72.],
        [8., 50., 19., 79.],
        [9., 50., 20., 80.],
        [15., 56., 20., 82.],
        [15., 70., 20., 91.],
    ];
    let endog: Array1<f64> = DATA.iter().map(|row| row[0]).collect();
    let exog = Array2::from_shape_fn((DATA.len(), 3), |(i, j)| DATA[i][j + 1]);
    Dataset {
        endog,
        exog,
        endog_name: "STACKLOSS",
        exog_names: vec!["AIRFLOW", "WATERTEMP", "ACIDCONC"],
    }
}

/// Motor Trend road tests (Henderson and Velleman, 1981) of 32 automobiles
/// from the 1973-74 model year.
///
/// The response is the fuel consumption in miles per US gallon. The covariates
/// are the gross horsepower, the rear axle ratio, the weight in thousands of
/// pounds and the quarter mile time in seconds.
pub fn mtcars() -> Dataset {
    #[rustfmt::skip]
    const DATA: [[f64; 5]; 32] = [
        // MPG, HP, DRAT, WT, QSEC
        [21.0, 110.0, 3.9, 2.62, 16.46],
        [21.0, 110.0, 3.9, 2.875, 17.02],
        [22.8, 93.0, 3.85, 2.32, 18.61],
        [21.4, 110.0, 3.08, 3.215, 19.44],
        [18.7, 175.0, 3.15, 3.44, 17.02],
        [18.1, 105.0, 2.76, 3.46, 20.22],
        [14.3, 245.0, 3.21, 3.57, 15.84],
        [24.4, 62.0, 3.69, 3.19, 20.0],
        [22.8, 95.0, 3.92, 3.15, 22.9],
        [19.2, 123.0, 3.92, 3.44, 18.3],
        [17.8, 123.0, 3.92, 3.44, 18.9],
        [16.4, 180.0, 3.07, 4.07, 17.4],
        [17.3, 180.0, 3.07, 3.73, 17.6],
        [15.2, 180.0, 3.07, 3.78, 18.0],
        [10.4, 205.0, 2.93, 5.25, 17.98],
        [10.4, 215.0, 3.0, 5.424, 17.82],
        [14.7, 230.0, 3.23, 5.345, 17.42],
        [32.4, 66.0, 4.08, 2.2, 19.47],
        [30.4, 52.0, 4.93, 1.615, 18.52],
        [33.9, 65.0, 4.22, 1.835, 19.9],
        [21.5, 97.0, 3.7, 2.465, 20.01],
        [15.5, 150.0, 2.76, 3.52, 16.87],
        [15.2, 150.0, 3.15, 3.435, 17.3],
        [13.3, 245.0, 3.73, 3.84, 15.41],
        [19.2, 175.0, 3.08, 3.845, 17.05],
        [27.3, 66.0, 4.08, 1.935, 18.9],
        [26.0, 91.0, 4.43, 2.14, 16.7],
        [30.4, 113.0, 3.77, 1.513, 16.9],
        [15.8, 264.0, 4.22, 3.17, 14.5],
        [19.7, 175.0, 3.62, 2.77, 15.5],
        [15.0, 335.0, 3.54, 3.57, 14.6],
        [21.4, 109.0, 4.11, 2.78, 18.6],
    ];
    let endog: Array1<f64> = DATA.iter().map(|row| row[0]).collect();
    let exog = Array2::from_shape_fn((DATA.len(), 4), |(i, j)| DATA[i][j + 1]);
    Dataset {
        endog,
        exog,
        endog_name: "MPG",
        exog_names: vec!["HP", "DRAT", "WT", "QSEC"],
    }
}
