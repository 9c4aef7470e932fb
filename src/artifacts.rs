//! # Artifacts
//!
//! Loading of the pre-fit scaler/model pair. Both objects are opaque to the
//! rest of the pipeline: the scaler exposes `transform`, the model exposes
//! `predict`, and nothing else is inspected. Each artifact is a serde-tagged
//! JSON blob with one variant per supported serialized format.
//!
//! Resolution tries a primary file name and falls back to a secondary name
//! when the primary is absent. Any read, parse, or shape failure means the
//! whole system is unavailable; there is no partial degradation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::config::ArtifactPaths;
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Why the system is offline. Every variant is terminal for the process'
/// prediction capability; callers render the offline state and stop.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{name} artifact unreadable at {path}: {source}")]
    Io {
        name: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{name} artifact failed to deserialize: {source}")]
    Deserialize {
        name: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{name} artifact rejected: {reason}")]
    Shape { name: &'static str, reason: String },
}

/// Fitted column-wise scaler.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerArtifact {
    /// Standardization: `(x - mean) / scale` per column.
    Standard { mean: Vec<f64>, scale: Vec<f64> },
}

impl ScalerArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Standard { .. } => "standard",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Standard { mean, scale } => {
                expect_width("mean", mean)?;
                expect_width("scale", scale)?;
                if let Some(i) = scale.iter().position(|s| *s == 0.0) {
                    return Err(format!("scale[{i}] is zero"));
                }
                Ok(())
            }
        }
    }

    /// Normalize a conditioned feature row into model space.
    pub fn transform(&self, v: &FeatureVector) -> [f64; FEATURE_COUNT] {
        match self {
            Self::Standard { mean, scale } => {
                let mut out = *v.as_array();
                for i in 0..FEATURE_COUNT {
                    out[i] = (out[i] - mean[i]) / scale[i];
                }
                out
            }
        }
    }
}

/// Fitted regression model.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    /// `intercept + Σ coefficient · x`.
    Linear {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    /// Ensemble of regression trees; prediction is the mean of the trees.
    Forest { trees: Vec<Tree> },
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linear { .. } => "linear",
            Self::Forest { .. } => "forest",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Linear {
                intercept,
                coefficients,
            } => {
                expect_width("coefficients", coefficients)?;
                if !intercept.is_finite() {
                    return Err("intercept is not finite".into());
                }
                Ok(())
            }
            Self::Forest { trees } => {
                if trees.is_empty() {
                    return Err("forest has no trees".into());
                }
                for (t, tree) in trees.iter().enumerate() {
                    tree.validate().map_err(|e| format!("tree {t}: {e}"))?;
                }
                Ok(())
            }
        }
    }

    /// Score a scaled feature row.
    pub fn predict(&self, scaled: &[f64; FEATURE_COUNT]) -> f64 {
        match self {
            Self::Linear {
                intercept,
                coefficients,
            } => intercept + coefficients.iter().zip(scaled).map(|(c, x)| c * x).sum::<f64>(),
            Self::Forest { trees } => {
                let sum: f64 = trees.iter().map(|t| t.eval(scaled)).sum();
                sum / trees.len() as f64
            }
        }
    }
}

/// One regression tree as a node arena rooted at index 0.
#[derive(Debug, Clone, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl Tree {
    /// Children must point forward in the arena, so a validated tree cannot
    /// loop during evaluation.
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty node arena".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("node {i}: leaf value is not finite"));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(format!("node {i}: feature {feature} out of range"));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {i}: threshold is not finite"));
                    }
                    for (side, child) in [("left", *left), ("right", *right)] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i}: {side} child {child} invalid"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn eval(&self, x: &[f64; FEATURE_COUNT]) -> f64 {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    i = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

fn expect_width(which: &str, xs: &[f64]) -> Result<(), String> {
    if xs.len() != FEATURE_COUNT {
        return Err(format!(
            "{which} has {} entries, expected {FEATURE_COUNT}",
            xs.len()
        ));
    }
    if let Some(i) = xs.iter().position(|x| !x.is_finite()) {
        return Err(format!("{which}[{i}] is not finite"));
    }
    Ok(())
}

/// The matched pre-fit pair plus load metadata for introspection.
#[derive(Debug)]
pub struct Artifacts {
    pub scaler: ScalerArtifact,
    pub model: ModelArtifact,
    pub scaler_fingerprint: String,
    pub model_fingerprint: String,
}

/// Process-lifetime artifact cache. Loads from disk exactly once; later
/// calls hand out the same pair without touching the filesystem.
pub struct ArtifactStore {
    paths: ArtifactPaths,
    cell: OnceCell<Arc<Artifacts>>,
}

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            cell: OnceCell::new(),
        }
    }

    /// Idempotent load. A failed first load is not cached, so a later call
    /// can retry after the operator restores the files.
    pub fn load(&self) -> Result<Arc<Artifacts>, ArtifactError> {
        self.cell
            .get_or_try_init(|| {
                let (scaler, scaler_fingerprint) = read_artifact::<ScalerArtifact>(
                    "scaler",
                    &self.paths.scaler_primary,
                    &self.paths.scaler_fallback,
                )?;
                let (model, model_fingerprint) = read_artifact::<ModelArtifact>(
                    "model",
                    &self.paths.model_primary,
                    &self.paths.model_fallback,
                )?;
                info!(
                    scaler = scaler.kind(),
                    model = model.kind(),
                    "artifact pair ready"
                );
                Ok(Arc::new(Artifacts {
                    scaler,
                    model,
                    scaler_fingerprint,
                    model_fingerprint,
                }))
            })
            .cloned()
    }
}

trait ArtifactBlob: serde::de::DeserializeOwned {
    fn kind(&self) -> &'static str;
    fn validate(&self) -> Result<(), String>;
}

impl ArtifactBlob for ScalerArtifact {
    fn kind(&self) -> &'static str {
        ScalerArtifact::kind(self)
    }
    fn validate(&self) -> Result<(), String> {
        ScalerArtifact::validate(self)
    }
}

impl ArtifactBlob for ModelArtifact {
    fn kind(&self) -> &'static str {
        ModelArtifact::kind(self)
    }
    fn validate(&self) -> Result<(), String> {
        ModelArtifact::validate(self)
    }
}

fn read_artifact<T: ArtifactBlob>(
    name: &'static str,
    primary: &Path,
    fallback: &Path,
) -> Result<(T, String), ArtifactError> {
    let path = if primary.exists() { primary } else { fallback };
    let bytes = fs::read(path).map_err(|source| ArtifactError::Io {
        name,
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: T =
        serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Deserialize { name, source })?;
    parsed
        .validate()
        .map_err(|reason| ArtifactError::Shape { name, reason })?;

    let fp = fingerprint(&bytes);
    info!(
        artifact = name,
        kind = parsed.kind(),
        fingerprint = %fp,
        path = %path.display(),
        "artifact loaded"
    );
    Ok((parsed, fp))
}

/// Short content digest for log correlation and `/debug/artifacts`.
pub fn fingerprint(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scaler(v: serde_json::Value) -> Result<ScalerArtifact, String> {
        let s: ScalerArtifact = serde_json::from_value(v).map_err(|e| e.to_string())?;
        s.validate().map(|_| s)
    }

    fn model(v: serde_json::Value) -> Result<ModelArtifact, String> {
        let m: ModelArtifact = serde_json::from_value(v).map_err(|e| e.to_string())?;
        m.validate().map(|_| m)
    }

    #[test]
    fn standard_scaler_transforms_per_column() {
        let s = scaler(json!({
            "kind": "standard",
            "mean": [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "scale": [2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        }))
        .unwrap();
        let v = FeatureVector([3.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let out = s.transform(&v);
        assert_eq!(out[0], 1.0); // (3 - 1) / 2
        assert_eq!(out[1], 1.0);
    }

    #[test]
    fn scaler_rejects_wrong_width_and_zero_scale() {
        assert!(scaler(json!({
            "kind": "standard",
            "mean": [0.0, 0.0],
            "scale": [1.0, 1.0]
        }))
        .unwrap_err()
        .contains("expected 11"));

        assert!(scaler(json!({
            "kind": "standard",
            "mean": [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            "scale": [1.0, 1.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0]
        }))
        .unwrap_err()
        .contains("zero"));
    }

    #[test]
    fn linear_model_is_a_dot_product() {
        let m = model(json!({
            "kind": "linear",
            "intercept": 1.5,
            "coefficients": [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0]
        }))
        .unwrap();
        let x = [3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.25];
        assert_eq!(m.predict(&x), 1.5 + 3.0 + 0.5);
    }

    #[test]
    fn forest_predicts_the_tree_mean() {
        let m = model(json!({
            "kind": "forest",
            "trees": [
                { "nodes": [
                    { "node": "split", "feature": 10, "threshold": 0.0, "left": 1, "right": 2 },
                    { "node": "leaf", "value": 4.0 },
                    { "node": "leaf", "value": 6.0 }
                ]},
                { "nodes": [ { "node": "leaf", "value": 5.0 } ] }
            ]
        }))
        .unwrap();

        let mut low = [0.0; FEATURE_COUNT];
        low[10] = -1.0;
        let mut high = [0.0; FEATURE_COUNT];
        high[10] = 1.0;

        assert_eq!(m.predict(&low), (4.0 + 5.0) / 2.0);
        assert_eq!(m.predict(&high), (6.0 + 5.0) / 2.0);
    }

    #[test]
    fn split_boundary_goes_left() {
        let m = model(json!({
            "kind": "forest",
            "trees": [
                { "nodes": [
                    { "node": "split", "feature": 0, "threshold": 1.0, "left": 1, "right": 2 },
                    { "node": "leaf", "value": 3.0 },
                    { "node": "leaf", "value": 8.0 }
                ]}
            ]
        }))
        .unwrap();
        let mut x = [0.0; FEATURE_COUNT];
        x[0] = 1.0;
        assert_eq!(m.predict(&x), 3.0);
    }

    #[test]
    fn forest_rejects_malformed_arenas() {
        // Empty forest.
        assert!(model(json!({ "kind": "forest", "trees": [] }))
            .unwrap_err()
            .contains("no trees"));

        // Backward child could loop forever.
        assert!(model(json!({
            "kind": "forest",
            "trees": [
                { "nodes": [
                    { "node": "split", "feature": 0, "threshold": 0.5, "left": 0, "right": 1 },
                    { "node": "leaf", "value": 5.0 }
                ]}
            ]
        }))
        .unwrap_err()
        .contains("child"));

        // Feature index beyond the vector width.
        assert!(model(json!({
            "kind": "forest",
            "trees": [
                { "nodes": [
                    { "node": "split", "feature": 11, "threshold": 0.5, "left": 1, "right": 2 },
                    { "node": "leaf", "value": 5.0 },
                    { "node": "leaf", "value": 6.0 }
                ]}
            ]
        }))
        .unwrap_err()
        .contains("out of range"));
    }

    #[test]
    fn linear_rejects_short_coefficients() {
        assert!(model(json!({
            "kind": "linear",
            "intercept": 0.0,
            "coefficients": [1.0, 2.0, 3.0]
        }))
        .unwrap_err()
        .contains("expected 11"));
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        assert!(model(json!({ "kind": "svm", "support_vectors": [] })).is_err());
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        let a = fingerprint(b"artifact bytes");
        let b = fingerprint(b"artifact bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
        assert_ne!(a, fingerprint(b"other bytes"));
    }
}
