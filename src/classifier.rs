use rand::Rng;

use crate::config::Hyperparameters;
use crate::dataset::class_labels;
use crate::error::{Error, Result};
use crate::math::Matrix;
use crate::network::{Network, OutputActivation};
use crate::trainer;

/// Feed-forward network classifier. Immutable once fitted; the hyperparameters
/// it was trained with travel with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpClassifier {
    hyperparameters: Hyperparameters,
    classes: Vec<String>,
    n_features_in: usize,
    network: Network,
    n_iter: usize,
    loss: f64,
    loss_curve: Vec<f64>,
    best_loss: Option<f64>,
    validation_scores: Vec<f64>,
    best_validation_score: Option<f64>,
}

impl MlpClassifier {
    /// Fits a new classifier on scaled `features` and their `labels`.
    pub fn fit<R: Rng>(
        features: &Matrix,
        labels: &[String],
        hyperparameters: &Hyperparameters,
        rng: &mut R,
    ) -> Result<Self> {
        hyperparameters.validate()?;
        if features.rows == 0 {
            return Err(Error::EmptyDataset);
        }
        if features.rows != labels.len() {
            return Err(Error::Training(format!(
                "{} feature rows but {} labels",
                features.rows,
                labels.len()
            )));
        }

        let classes = class_labels(labels);
        if classes.len() < 2 {
            return Err(Error::Training(format!(
                "need at least two classes to train, found {:?}",
                classes
            )));
        }
        let class_indices: Vec<usize> = labels
            .iter()
            .map(|label| classes.iter().position(|c| c == label).unwrap_or(0))
            .collect();

        let (n_outputs, output_activation) = if classes.len() == 2 {
            (1, OutputActivation::Logistic)
        } else {
            (classes.len(), OutputActivation::Softmax)
        };
        let mut layer_sizes = vec![features.cols];
        layer_sizes.extend_from_slice(&hyperparameters.hidden_layer_sizes);
        layer_sizes.push(n_outputs);

        info!(
            "Training MLP {:?} ({:?}, {:?}) on {} rows, {} classes",
            layer_sizes,
            hyperparameters.activation,
            hyperparameters.solver,
            features.rows,
            classes.len()
        );

        let mut network = Network::new(&layer_sizes, hyperparameters.activation, output_activation, rng);
        let outcome = trainer::fit(
            &mut network,
            features,
            &class_indices,
            classes.len(),
            hyperparameters,
            rng,
        )?;

        Ok(MlpClassifier {
            hyperparameters: hyperparameters.clone(),
            classes,
            n_features_in: features.cols,
            network,
            n_iter: outcome.n_iter,
            loss: outcome.loss,
            loss_curve: outcome.loss_curve,
            best_loss: outcome.best_loss,
            validation_scores: outcome.validation_scores,
            best_validation_score: outcome.best_validation_score,
        })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_features_in(&self) -> usize {
        self.n_features_in
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn loss(&self) -> f64 {
        self.loss
    }

    pub fn loss_curve(&self) -> &[f64] {
        &self.loss_curve
    }

    pub fn best_loss(&self) -> Option<f64> {
        self.best_loss
    }

    pub fn validation_scores(&self) -> &[f64] {
        &self.validation_scores
    }

    pub fn best_validation_score(&self) -> Option<f64> {
        self.best_validation_score
    }

    fn check_features(&self, features: &Matrix) -> Result<()> {
        if features.cols != self.n_features_in {
            return Err(Error::DimensionMismatch {
                expected: self.n_features_in,
                found: features.cols,
            });
        }

        Ok(())
    }

    /// Class probabilities, one column per entry of `classes()`.
    pub fn predict_proba(&self, features: &Matrix) -> Result<Matrix> {
        self.check_features(features)?;
        let outputs = self.network.predict(features);
        if outputs.cols != 1 {
            return Ok(outputs);
        }

        let mut proba = Matrix::new(outputs.rows, 2);
        for &p in &outputs.mem {
            proba.mem.push(1.0 - p);
            proba.mem.push(p);
        }

        Ok(proba)
    }

    pub fn predict(&self, features: &Matrix) -> Result<Vec<String>> {
        self.check_features(features)?;
        let outputs = self.network.predict(features);
        Ok(trainer::decode_outputs(&outputs)
            .into_iter()
            .map(|class| self.classes[class].clone())
            .collect())
    }

    /// Mean accuracy on the given rows.
    pub fn score(&self, features: &Matrix, labels: &[String]) -> Result<f64> {
        let predicted = self.predict(features)?;
        if labels.is_empty() {
            return Ok(0.0);
        }

        let hits = predicted.iter().zip(labels).filter(|(p, l)| p == l).count();
        Ok(hits as f64 / labels.len() as f64)
    }
}
