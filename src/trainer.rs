use rand::Rng;

use crate::config::Hyperparameters;
use crate::error::{Error, Result};
use crate::math::{max_component, Matrix};
use crate::network::Network;
use crate::optimizer;
use crate::split;
use crate::timing::Timing;

/// What a finished stochastic fit leaves behind besides the weights.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingOutcome {
    pub n_iter: usize,
    pub loss: f64,
    pub loss_curve: Vec<f64>,
    /// Set when training loss drove convergence.
    pub best_loss: Option<f64>,
    /// Per-epoch accuracy on the early-stopping split.
    pub validation_scores: Vec<f64>,
    pub best_validation_score: Option<f64>,
    pub converged: bool,
}

/// Targets in the shape of the network output: a single 0/1 column for two
/// classes, one-hot rows otherwise.
pub fn encode_targets(classes: &[usize], n_classes: usize) -> Matrix {
    if n_classes == 2 {
        let mem = classes.iter().map(|&c| c as f64).collect();
        return Matrix::from_vec(classes.len(), 1, mem);
    }

    let mut targets = Matrix::zeros(classes.len(), n_classes);
    for (row, &class) in classes.iter().enumerate() {
        targets.row_mut(row)[class] = 1.0;
    }

    return targets;
}

/// Inverse of `encode_targets` for network outputs.
pub fn decode_outputs(outputs: &Matrix) -> Vec<usize> {
    (0..outputs.rows)
        .map(|row| {
            let out = outputs.row(row);
            if out.len() == 1 {
                if out[0] > 0.5 {
                    1
                } else {
                    0
                }
            } else {
                max_component(out).0
            }
        })
        .collect()
}

pub fn accuracy(predicted: &[usize], truth: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }

    let hits = predicted.iter().zip(truth).filter(|(p, t)| p == t).count();
    hits as f64 / truth.len() as f64
}

/// Minibatch training of `network` on already scaled `inputs`.
///
/// `classes[i]` is the class index of row i. With early stopping a stratified
/// slice of the rows is held out, scored every epoch, and the best-scoring
/// weights are restored at the end; otherwise the training loss decides when
/// the fit has converged.
pub fn fit<R: Rng>(
    network: &mut Network,
    inputs: &Matrix,
    classes: &[usize],
    n_classes: usize,
    hp: &Hyperparameters,
    rng: &mut R,
) -> Result<TrainingOutcome> {
    assert!(
        inputs.rows == classes.len(),
        "Invalid training data. Labels count != inputs count"
    );
    if inputs.rows == 0 {
        return Err(Error::EmptyDataset);
    }

    let targets = encode_targets(classes, n_classes);
    let mut validation = None;
    let (train_inputs, train_targets) = if hp.early_stopping {
        let (train_idx, val_idx) =
            split::stratified_indices(classes, n_classes, hp.validation_fraction, rng);
        if val_idx.is_empty() {
            warn!(
                "Too few rows ({}) to hold out a validation set; early stopping disabled",
                inputs.rows
            );
            (inputs.clone(), targets)
        } else {
            debug!(
                "Early stopping: {} training rows, {} validation rows",
                train_idx.len(),
                val_idx.len()
            );
            let val_classes: Vec<usize> = val_idx.iter().map(|&i| classes[i]).collect();
            validation = Some((inputs.select_rows(&val_idx), val_classes));
            (inputs.select_rows(&train_idx), targets.select_rows(&train_idx))
        }
    } else {
        (inputs.clone(), targets)
    };

    let n_samples = train_inputs.rows;
    let batch_size = match hp.batch_size {
        Some(size) => {
            if size > n_samples {
                warn!(
                    "batch_size {} is larger than the {} training rows; clipping",
                    size, n_samples
                );
            }
            size.max(1).min(n_samples)
        }
        None => n_samples.min(200),
    };

    let mut optimizer = optimizer::from_hyperparameters(hp, &network.parameter_sizes());
    let mut indices: Vec<usize> = (0..n_samples).collect();
    let mut outcome = TrainingOutcome {
        n_iter: 0,
        loss: 0.0,
        loss_curve: Vec::new(),
        best_loss: None,
        validation_scores: Vec::new(),
        best_validation_score: None,
        converged: false,
    };
    let mut best_loss = f64::INFINITY;
    let mut best_validation_score = f64::NEG_INFINITY;
    let mut best_network = None;
    let mut no_improvement_count = 0;
    let mut time_step = 0;
    let mut timing = Timing::new();

    for _ in 0..hp.max_iter {
        timing.start("epoch");
        if hp.shuffle {
            rng.shuffle(&mut indices);
        }

        let mut accumulated_loss = 0.0;
        for batch in indices.chunks(batch_size) {
            let batch_inputs = train_inputs.select_rows(batch);
            let batch_targets = train_targets.select_rows(batch);
            let activations = network.forward(&batch_inputs);
            let (batch_loss, grads) = network.backward(&activations, &batch_targets, hp.alpha);
            accumulated_loss += batch_loss * batch.len() as f64;
            optimizer.update_params(network.parameters_mut(), &grads.slices());
        }
        timing.stop("epoch");

        outcome.n_iter += 1;
        let loss = accumulated_loss / n_samples as f64;
        if !loss.is_finite() {
            return Err(Error::Training(format!(
                "loss diverged at iteration {}; try a smaller learning_rate_init",
                outcome.n_iter
            )));
        }
        outcome.loss = loss;
        outcome.loss_curve.push(loss);
        time_step += n_samples;
        debug!(
            "Iteration {}, loss = {:.8}, learning rate = {}",
            outcome.n_iter,
            loss,
            optimizer.learning_rate()
        );

        if let Some((val_inputs, val_classes)) = &validation {
            let score = accuracy(&decode_outputs(&network.predict(val_inputs)), val_classes);
            outcome.validation_scores.push(score);
            debug!("Validation score: {:.6}", score);

            if score < best_validation_score + hp.tol {
                no_improvement_count += 1;
            } else {
                no_improvement_count = 0;
            }
            if score > best_validation_score {
                best_validation_score = score;
                best_network = Some(network.clone());
            }
        } else {
            if loss > best_loss - hp.tol {
                no_improvement_count += 1;
            } else {
                no_improvement_count = 0;
            }
            if loss < best_loss {
                best_loss = loss;
            }
        }

        optimizer.iteration_ends(time_step);

        if no_improvement_count > hp.n_iter_no_change {
            let reason = if validation.is_some() {
                format!(
                    "Validation score did not improve more than tol={} for {} consecutive epochs",
                    hp.tol, hp.n_iter_no_change
                )
            } else {
                format!(
                    "Training loss did not improve more than tol={} for {} consecutive epochs",
                    hp.tol, hp.n_iter_no_change
                )
            };

            if optimizer.trigger_stopping(&reason) {
                outcome.converged = true;
                break;
            }
            no_improvement_count = 0;
        }
    }

    if !outcome.converged {
        warn!(
            "Maximum iterations ({}) reached and the optimization hasn't converged yet",
            hp.max_iter
        );
    }

    if let Some(best) = best_network {
        *network = best;
        outcome.best_validation_score = Some(best_validation_score);
    } else {
        outcome.best_loss = Some(best_loss);
    }

    debug!("{}", timing);
    info!(
        "Training finished after {} iterations, loss = {:.6}",
        outcome.n_iter, outcome.loss
    );

    Ok(outcome)
}
