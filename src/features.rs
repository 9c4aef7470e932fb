//! Feature assembly and log conditioning.
//!
//! The regression artifacts were fit on a fixed column layout with five
//! right-skewed columns replaced by `ln(x + 1)`. Both facts are load-bearing:
//! reordering columns or drifting from the fit-time transform silently
//! degrades predictions without any error being raised.

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 11;

/// Model column order. Not the form display order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "fixed_acidity",
    "volatile_acidity",
    "citric_acid",
    "residual_sugar",
    "chlorides",
    "free_sulfur_dioxide",
    "total_sulfur_dioxide",
    "density",
    "ph",
    "sulphates",
    "alcohol",
];

/// Columns conditioned with `ln(x + 1)` before scaling, as indices into
/// [`FEATURE_NAMES`]: residual sugar, chlorides, free/total sulfur dioxide,
/// sulphates.
pub const LOG_CONDITIONED: [usize; 5] = [3, 4, 5, 6, 9];

/// One submission from the capture form, eleven named measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub fixed_acidity: f64,
    pub volatile_acidity: f64,
    pub citric_acid: f64,
    pub residual_sugar: f64,
    pub chlorides: f64,
    pub free_sulfur_dioxide: f64,
    pub total_sulfur_dioxide: f64,
    pub density: f64,
    #[serde(alias = "pH")]
    pub ph: f64,
    pub sulphates: f64,
    pub alcohol: f64,
}

impl Default for RawSample {
    /// The slider defaults from the capture form.
    fn default() -> Self {
        Self {
            fixed_acidity: 7.5,
            volatile_acidity: 0.70,
            citric_acid: 0.0,
            residual_sugar: 0.6,
            chlorides: 0.9,
            free_sulfur_dioxide: 15.0,
            total_sulfur_dioxide: 98.0,
            density: 1.0,
            ph: 3.0,
            sulphates: 0.6,
            alcohol: 11.5,
        }
    }
}

/// Ordered feature row in model column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(pub [f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Pure assembly, fixed column order.
    pub fn from_raw(raw: &RawSample) -> Self {
        Self([
            raw.fixed_acidity,
            raw.volatile_acidity,
            raw.citric_acid,
            raw.residual_sugar,
            raw.chlorides,
            raw.free_sulfur_dioxide,
            raw.total_sulfur_dioxide,
            raw.density,
            raw.ph,
            raw.sulphates,
            raw.alcohol,
        ])
    }

    /// `ln(x + 1)` on exactly the [`LOG_CONDITIONED`] columns, identity
    /// elsewhere. Applied once, before scaling.
    pub fn log_conditioned(&self) -> Self {
        let mut out = self.0;
        for &i in &LOG_CONDITIONED {
            out[i] = out[i].ln_1p();
        }
        Self(out)
    }

    pub fn as_array(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }
}
