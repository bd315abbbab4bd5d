use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    Logistic,
    Tanh,
    Relu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solver {
    Sgd,
    Adam,
}

/// Step-size schedule. Only the SGD solver follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRate {
    Constant,
    InvScaling,
    Adaptive,
}

/// Training hyperparameters. Missing fields in a config file take these
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparameters {
    pub hidden_layer_sizes: Vec<usize>,
    pub activation: Activation,
    pub solver: Solver,
    /// L2 penalty.
    pub alpha: f64,
    /// `None` means min(200, n_samples).
    pub batch_size: Option<usize>,
    pub learning_rate: LearningRate,
    pub learning_rate_init: f64,
    pub power_t: f64,
    pub max_iter: usize,
    pub shuffle: bool,
    pub tol: f64,
    pub momentum: f64,
    pub nesterovs_momentum: bool,
    pub early_stopping: bool,
    pub validation_fraction: f64,
    pub beta_1: f64,
    pub beta_2: f64,
    pub epsilon: f64,
    pub n_iter_no_change: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Hyperparameters {
            hidden_layer_sizes: vec![100],
            activation: Activation::Relu,
            solver: Solver::Adam,
            alpha: 0.0001,
            batch_size: None,
            learning_rate: LearningRate::Constant,
            learning_rate_init: 0.001,
            power_t: 0.5,
            max_iter: 200,
            shuffle: true,
            tol: 1e-4,
            momentum: 0.9,
            nesterovs_momentum: true,
            early_stopping: false,
            validation_fraction: 0.1,
            beta_1: 0.9,
            beta_2: 0.999,
            epsilon: 1e-8,
            n_iter_no_change: 10,
        }
    }
}

impl Hyperparameters {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let hyperparameters: Hyperparameters = serde_json::from_reader(BufReader::new(file))?;
        hyperparameters.validate()?;
        Ok(hyperparameters)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::InvalidConfig(msg));

        if self.hidden_layer_sizes.iter().any(|&s| s == 0) {
            return fail(format!(
                "hidden_layer_sizes must be positive, got {:?}",
                self.hidden_layer_sizes
            ));
        }
        if !(self.alpha >= 0.0) {
            return fail(format!("alpha must be non-negative, got {}", self.alpha));
        }
        if self.batch_size == Some(0) {
            return fail("batch_size must be positive".to_string());
        }
        if !(self.learning_rate_init > 0.0) {
            return fail(format!(
                "learning_rate_init must be positive, got {}",
                self.learning_rate_init
            ));
        }
        if self.max_iter == 0 {
            return fail("max_iter must be positive".to_string());
        }
        if self.n_iter_no_change == 0 {
            return fail("n_iter_no_change must be positive".to_string());
        }
        if !(self.momentum >= 0.0 && self.momentum <= 1.0) {
            return fail(format!("momentum must be in [0, 1], got {}", self.momentum));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return fail(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            ));
        }
        if !(self.beta_1 >= 0.0 && self.beta_1 < 1.0) {
            return fail(format!("beta_1 must be in [0, 1), got {}", self.beta_1));
        }
        if !(self.beta_2 >= 0.0 && self.beta_2 < 1.0) {
            return fail(format!("beta_2 must be in [0, 1), got {}", self.beta_2));
        }
        if !(self.epsilon > 0.0) {
            return fail(format!("epsilon must be positive, got {}", self.epsilon));
        }

        Ok(())
    }
}

/// Which of the two command-line workflows is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Seeded; holds out rows for a validation report; predicts every row.
    Holdout,
    /// Unseeded; trains on every row; predicts a single instance.
    Single,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub variant: Variant,
    pub hyperparameters: Hyperparameters,
    /// Share of rows held out before scaling, for the validation report.
    pub holdout_fraction: Option<f64>,
    pub seed: u64,
}

impl RunConfig {
    pub fn holdout(seed: u64) -> Self {
        RunConfig {
            variant: Variant::Holdout,
            hyperparameters: Hyperparameters {
                hidden_layer_sizes: vec![64, 32],
                activation: Activation::Relu,
                solver: Solver::Adam,
                alpha: 0.001,
                batch_size: Some(32),
                learning_rate: LearningRate::Adaptive,
                max_iter: 1000,
                early_stopping: true,
                validation_fraction: 0.2,
                n_iter_no_change: 20,
                ..Hyperparameters::default()
            },
            holdout_fraction: Some(0.2),
            seed,
        }
    }

    pub fn single(seed: u64) -> Self {
        RunConfig {
            variant: Variant::Single,
            hyperparameters: Hyperparameters {
                hidden_layer_sizes: vec![100],
                max_iter: 500,
                ..Hyperparameters::default()
            },
            holdout_fraction: None,
            seed,
        }
    }

    pub fn with_hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }
}
