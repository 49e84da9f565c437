//! Feed-forward Q-network policy.
//!
//! Weights are read from a JSON document of the form
//! `{"layers": [{"weights": [[..], ..], "bias": [..]}, ..]}` where every
//! `weights` matrix is stored row-per-output-neuron. ReLU is applied between
//! layers, the last layer is linear and yields one Q-value per action.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::{PolicyError, PolicyOracle};
use crate::domain::State;

/// Input width: `(indoor_temperature, ac_status, window_status)`
pub const STATE_DIM: usize = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    fn inputs(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    fn outputs(&self) -> usize {
        self.weights.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    layers: Vec<DenseLayer>,
}

#[derive(Debug, Clone)]
pub struct QNetworkPolicy {
    layers: Vec<DenseLayer>,
}

impl QNetworkPolicy {
    /// Build from layers, checking they chain from the state vector to
    /// `num_actions` outputs.
    pub fn from_layers(layers: Vec<DenseLayer>, num_actions: usize) -> Result<Self, PolicyError> {
        if layers.is_empty() {
            return Err(PolicyError::Shape("model has no layers".into()));
        }

        let mut width = STATE_DIM;
        for (i, layer) in layers.iter().enumerate() {
            if layer.outputs() == 0 {
                return Err(PolicyError::Shape(format!("layer {i} has no outputs")));
            }
            if layer.weights.iter().any(|row| row.len() != width) {
                return Err(PolicyError::Shape(format!(
                    "layer {i} expects {width} inputs per row"
                )));
            }
            if layer.bias.len() != layer.outputs() {
                return Err(PolicyError::Shape(format!(
                    "layer {i} has {} bias terms for {} outputs",
                    layer.bias.len(),
                    layer.outputs()
                )));
            }
            width = layer.outputs();
        }

        if width != num_actions {
            return Err(PolicyError::Shape(format!(
                "model produces {width} Q-values, catalog has {num_actions} actions"
            )));
        }
        Ok(Self { layers })
    }

    pub fn from_file(path: impl AsRef<Path>, num_actions: usize) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let model: ModelFile = serde_json::from_str(&raw)?;
        let policy = Self::from_layers(model.layers, num_actions)?;
        info!(
            path = %path.display(),
            layers = policy.layers.len(),
            input_dim = policy.layers[0].inputs(),
            "loaded Q-network policy"
        );
        Ok(policy)
    }

    pub fn q_values(&self, state: &State) -> Vec<f64> {
        let last = self.layers.len() - 1;
        let mut activations = state.to_vector().to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if i != last {
                activations.iter_mut().for_each(|a| *a = a.max(0.0));
            }
        }
        activations
    }
}

/// Index of the largest value; ties go to the lowest index, NaN never wins
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
            if v > best_v {
                (i, v)
            } else {
                (best_i, best_v)
            }
        })
        .0
}

impl PolicyOracle for QNetworkPolicy {
    fn decide(&self, state: &State) -> usize {
        argmax(&self.q_values(state))
    }

    fn name(&self) -> &'static str {
        "q_network"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// One-hot output layer: action `k` scores `temperature * scale[k]`
    fn linear_model(scales: &[f64]) -> Vec<DenseLayer> {
        vec![DenseLayer {
            weights: scales.iter().map(|s| vec![*s, 0.0, 0.0]).collect(),
            bias: vec![0.0; scales.len()],
        }]
    }

    #[test]
    fn test_argmax_ties_and_nan() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[f64::NAN, -1.0, -2.0]), 1);
        assert_eq!(argmax(&[f64::NAN, f64::NAN]), 0);
    }

    #[test]
    fn test_linear_network_picks_highest_q() {
        let mut scales = vec![0.0; 14];
        scales[6] = 1.0;
        let policy = QNetworkPolicy::from_layers(linear_model(&scales), 14).unwrap();
        assert_eq!(policy.decide(&State::new(30.0, 0, 0)), 6);
        // Negative temperature flips every score, the zero rows win
        assert_eq!(policy.decide(&State::new(-5.0, 0, 0)), 0);
    }

    #[test]
    fn test_hidden_layer_applies_relu() {
        // hidden = relu(temp - 24), out[0] = 1, out[1] = hidden
        let layers = vec![
            DenseLayer {
                weights: vec![vec![1.0, 0.0, 0.0]],
                bias: vec![-24.0],
            },
            DenseLayer {
                weights: vec![vec![0.0], vec![1.0]],
                bias: vec![1.0, 0.0],
            },
        ];
        let policy = QNetworkPolicy::from_layers(layers, 2).unwrap();
        assert_eq!(policy.q_values(&State::new(20.0, 0, 0)), vec![1.0, 0.0]);
        assert_eq!(policy.decide(&State::new(30.0, 0, 0)), 1);
    }

    #[test]
    fn test_shape_validation() {
        assert!(matches!(
            QNetworkPolicy::from_layers(vec![], 14),
            Err(PolicyError::Shape(_))
        ));
        assert!(matches!(
            QNetworkPolicy::from_layers(linear_model(&[1.0; 13]), 14),
            Err(PolicyError::Shape(_))
        ));
        let bad_bias = vec![DenseLayer {
            weights: vec![vec![1.0, 0.0, 0.0]; 14],
            bias: vec![0.0; 3],
        }];
        assert!(matches!(
            QNetworkPolicy::from_layers(bad_bias, 14),
            Err(PolicyError::Shape(_))
        ));
        let bad_width = vec![DenseLayer {
            weights: vec![vec![1.0, 0.0]; 14],
            bias: vec![0.0; 14],
        }];
        assert!(matches!(
            QNetworkPolicy::from_layers(bad_width, 14),
            Err(PolicyError::Shape(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut scales = vec![0.0; 14];
        scales[3] = 2.0;
        let layers: Vec<serde_json::Value> = linear_model(&scales)
            .into_iter()
            .map(|l| serde_json::json!({ "weights": l.weights, "bias": l.bias }))
            .collect();
        let doc = serde_json::json!({ "layers": layers });

        let path = std::env::temp_dir().join(format!("qnet-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(doc.to_string().as_bytes()).unwrap();

        let policy = QNetworkPolicy::from_file(&path, 14).unwrap();
        assert_eq!(policy.decide(&State::new(25.0, 0, 0)), 3);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            QNetworkPolicy::from_file(&path, 14),
            Err(PolicyError::Io(_))
        ));
    }
}
