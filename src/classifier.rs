use std::fs;
use std::path::Path;

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PredictorError, Result};
use crate::features::{FEATURE_LEN, FeatureVector};
use crate::outcome::Prob3;

/// Outcome model boundary. Callers hand over every feature vector of a batch in one call.
pub trait Classifier {
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<Prob3>>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<Prob3>> {
        (**self).predict(features)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    /// Row-major `[outputs][inputs]`.
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn apply(&self, input: &[f64], relu: bool) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.biases)
            .map(|(row, bias)| {
                let z = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
                if relu { z.max(0.0) } else { z }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseNetArtifact {
    #[serde(default)]
    pub name: Option<String>,
    pub layers: Vec<DenseLayer>,
}

/// Feed-forward network with relu hidden layers and a softmax head, evaluated from exported
/// weights. Training happens elsewhere.
#[derive(Debug, Clone)]
pub struct DenseNet {
    layers: Vec<DenseLayer>,
}

impl DenseNet {
    pub fn new(layers: Vec<DenseLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(PredictorError::invalid("model", "no layers"));
        }
        let mut width = FEATURE_LEN;
        for (idx, layer) in layers.iter().enumerate() {
            if layer.inputs() != width || layer.weights.iter().any(|row| row.len() != width) {
                return Err(PredictorError::invalid(
                    "model",
                    format!("layer {idx} expects {width} inputs"),
                ));
            }
            if layer.biases.len() != layer.outputs() {
                return Err(PredictorError::invalid(
                    "model",
                    format!(
                        "layer {idx} has {} biases for {} outputs",
                        layer.biases.len(),
                        layer.outputs()
                    ),
                ));
            }
            width = layer.outputs();
        }
        if width != 3 {
            return Err(PredictorError::invalid(
                "model",
                format!("output layer must have 3 units, has {width}"),
            ));
        }
        Ok(Self { layers })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read model weights {}", path.display()))?;
        let artifact: DenseNetArtifact =
            serde_json::from_str(&raw).context("parse model weights")?;
        if let Some(name) = &artifact.name {
            log::info!("loaded model '{name}' from {}", path.display());
        }
        Ok(Self::new(artifact.layers)?)
    }

    pub fn forward(&self, input: &[f64]) -> Prob3 {
        let last = self.layers.len() - 1;
        let mut activations = input.to_vec();
        for (idx, layer) in self.layers.iter().enumerate() {
            activations = layer.apply(&activations, idx != last);
        }
        softmax3(&activations)
    }
}

impl Classifier for DenseNet {
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<Prob3>> {
        Ok(features
            .par_iter()
            .map(|row| self.forward(row.values()))
            .collect())
    }
}

fn softmax3(logits: &[f64]) -> Prob3 {
    let mx = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let e: Vec<f64> = logits.iter().map(|z| (z - mx).exp()).collect();
    let den = e.iter().sum::<f64>().max(1e-12);
    Prob3 {
        home: e[0] / den,
        draw: e[1] / den,
        away: e[2] / den,
    }
}
