//! # Input Fields
//!
//! Descriptors for the eleven chemistry sliders shown on the capture form.
//! Each field carries the bounded range and default the form renders with;
//! the `/fields` endpoint serves this table so the UI and the API share one
//! source of truth.
//!
//! Display order here follows the form layout. The column order the model
//! was fit on lives in [`crate::features`].

use serde::Serialize;

/// One bounded, real-valued slider on the capture form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldSpec {
    /// JSON key used in `POST /predict` bodies.
    pub key: &'static str,
    /// Human-readable label.
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl FieldSpec {
    /// Inclusive range check.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// The eleven measurements, in form display order.
pub const FIELDS: [FieldSpec; 11] = [
    FieldSpec {
        key: "fixed_acidity",
        label: "Fixed Acidity",
        min: 0.0,
        max: 20.0,
        default: 7.5,
    },
    FieldSpec {
        key: "volatile_acidity",
        label: "Volatile Acidity",
        min: 0.0,
        max: 2.0,
        default: 0.70,
    },
    FieldSpec {
        key: "citric_acid",
        label: "Citric Acid",
        min: 0.0,
        max: 1.0,
        default: 0.0,
    },
    FieldSpec {
        key: "ph",
        label: "pH Level",
        min: 0.0,
        max: 14.0,
        default: 3.0,
    },
    FieldSpec {
        key: "free_sulfur_dioxide",
        label: "Free Sulfur Dioxide",
        min: 0.0,
        max: 100.0,
        default: 15.0,
    },
    FieldSpec {
        key: "total_sulfur_dioxide",
        label: "Total Sulfur Dioxide",
        min: 0.0,
        max: 300.0,
        default: 98.0,
    },
    FieldSpec {
        key: "chlorides",
        label: "Chlorides",
        min: 0.0,
        max: 2.0,
        default: 0.9,
    },
    FieldSpec {
        key: "sulphates",
        label: "Sulphates",
        min: 0.0,
        max: 10.0,
        default: 0.6,
    },
    FieldSpec {
        key: "residual_sugar",
        label: "Residual Sugar",
        min: 0.0,
        max: 15.0,
        default: 0.6,
    },
    FieldSpec {
        key: "density",
        label: "Density",
        min: 0.0,
        max: 5.0,
        default: 1.0,
    },
    FieldSpec {
        key: "alcohol",
        label: "Alcohol (%)",
        min: 0.0,
        max: 20.0,
        default: 11.5,
    },
];

/// Lookup by JSON key.
pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}
