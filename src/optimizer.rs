use crate::config::{Hyperparameters, LearningRate, Solver};

/// Smallest learning rate the adaptive schedule decays to before giving up.
const MIN_ADAPTIVE_LEARNING_RATE: f64 = 1e-6;

pub trait Optimizer {
    /// Applies one step to `params` given matching `grads`.
    fn update_params(&mut self, params: Vec<&mut [f64]>, grads: &[&[f64]]);

    /// Called after every epoch with the number of samples seen so far.
    fn iteration_ends(&mut self, _time_step: usize) {}

    /// Called when training stalls. Returns true when training should stop.
    fn trigger_stopping(&mut self, reason: &str) -> bool;

    fn learning_rate(&self) -> f64;
}

pub fn from_hyperparameters(hp: &Hyperparameters, parameter_sizes: &[usize]) -> Box<dyn Optimizer> {
    match hp.solver {
        Solver::Adam => Box::new(Adam::new(
            parameter_sizes,
            hp.learning_rate_init,
            hp.beta_1,
            hp.beta_2,
            hp.epsilon,
        )),
        Solver::Sgd => Box::new(Sgd::new(
            parameter_sizes,
            hp.learning_rate_init,
            hp.learning_rate,
            hp.momentum,
            hp.nesterovs_momentum,
            hp.power_t,
        )),
    }
}

fn apply_updates(params: Vec<&mut [f64]>, updates: &[Vec<f64>]) {
    assert!(
        params.len() == updates.len(),
        "Invalid parameter groups: {} != {}",
        params.len(),
        updates.len()
    );

    for (param, update) in params.into_iter().zip(updates) {
        for (p, u) in param.iter_mut().zip(update) {
            *p += *u;
        }
    }
}

pub struct Sgd {
    learning_rate_init: f64,
    learning_rate: f64,
    schedule: LearningRate,
    momentum: f64,
    nesterov: bool,
    power_t: f64,
    velocities: Vec<Vec<f64>>,
    updates: Vec<Vec<f64>>,
}

impl Sgd {
    pub fn new(
        parameter_sizes: &[usize],
        learning_rate_init: f64,
        schedule: LearningRate,
        momentum: f64,
        nesterov: bool,
        power_t: f64,
    ) -> Self {
        Sgd {
            learning_rate_init,
            learning_rate: learning_rate_init,
            schedule,
            momentum,
            nesterov,
            power_t,
            velocities: parameter_sizes.iter().map(|&n| vec![0.0; n]).collect(),
            updates: parameter_sizes.iter().map(|&n| vec![0.0; n]).collect(),
        }
    }
}

impl Optimizer for Sgd {
    fn update_params(&mut self, params: Vec<&mut [f64]>, grads: &[&[f64]]) {
        let lr = self.learning_rate;
        for (group, grad) in grads.iter().enumerate() {
            let velocity = &mut self.velocities[group];
            let update = &mut self.updates[group];
            for i in 0..grad.len() {
                velocity[i] = self.momentum * velocity[i] - lr * grad[i];
                update[i] = if self.nesterov {
                    self.momentum * velocity[i] - lr * grad[i]
                } else {
                    velocity[i]
                };
            }
        }

        apply_updates(params, &self.updates);
    }

    fn iteration_ends(&mut self, time_step: usize) {
        if self.schedule == LearningRate::InvScaling {
            self.learning_rate =
                self.learning_rate_init / ((time_step + 1) as f64).powf(self.power_t);
        }
    }

    fn trigger_stopping(&mut self, reason: &str) -> bool {
        if self.schedule != LearningRate::Adaptive {
            info!("{}. Stopping.", reason);
            return true;
        }

        if self.learning_rate <= MIN_ADAPTIVE_LEARNING_RATE {
            info!("{}. Learning rate too small. Stopping.", reason);
            return true;
        }

        self.learning_rate /= 5.0;
        info!("{}. Setting learning rate to {}", reason, self.learning_rate);
        return false;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}

pub struct Adam {
    learning_rate_init: f64,
    learning_rate: f64,
    beta_1: f64,
    beta_2: f64,
    epsilon: f64,
    t: i32,
    ms: Vec<Vec<f64>>,
    vs: Vec<Vec<f64>>,
    updates: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(parameter_sizes: &[usize], learning_rate_init: f64, beta_1: f64, beta_2: f64, epsilon: f64) -> Self {
        let zeros = || -> Vec<Vec<f64>> { parameter_sizes.iter().map(|&n| vec![0.0; n]).collect() };
        Adam {
            learning_rate_init,
            learning_rate: learning_rate_init,
            beta_1,
            beta_2,
            epsilon,
            t: 0,
            ms: zeros(),
            vs: zeros(),
            updates: zeros(),
        }
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: Vec<&mut [f64]>, grads: &[&[f64]]) {
        self.t += 1;
        self.learning_rate = self.learning_rate_init * (1.0 - self.beta_2.powi(self.t)).sqrt()
            / (1.0 - self.beta_1.powi(self.t));

        for (group, grad) in grads.iter().enumerate() {
            let m = &mut self.ms[group];
            let v = &mut self.vs[group];
            let update = &mut self.updates[group];
            for i in 0..grad.len() {
                m[i] = self.beta_1 * m[i] + (1.0 - self.beta_1) * grad[i];
                v[i] = self.beta_2 * v[i] + (1.0 - self.beta_2) * grad[i] * grad[i];
                update[i] = -self.learning_rate * m[i] / (v[i].sqrt() + self.epsilon);
            }
        }

        apply_updates(params, &self.updates);
    }

    fn trigger_stopping(&mut self, reason: &str) -> bool {
        info!("{}. Stopping.", reason);
        return true;
    }

    fn learning_rate(&self) -> f64 {
        self.learning_rate
    }
}
