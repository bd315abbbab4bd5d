use rand::Rng;

use crate::config::Activation;
use crate::math::Matrix;

/// Output non-linearity, fixed by the number of classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputActivation {
    /// One unit, two classes.
    Logistic,
    Softmax,
}

/// Weights are stored fan_in x fan_out so that a batch of activations
/// (rows = samples) multiplies them directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub weights: Matrix,
    pub biases: Vec<f64>,
}

impl Layer {
    fn zeros_like(layer: &Layer) -> Self {
        Layer {
            weights: Matrix::new_same_dim(&layer.weights),
            biases: vec![0.0; layer.biases.len()],
        }
    }

    fn fan_in(&self) -> usize {
        self.weights.rows
    }

    fn fan_out(&self) -> usize {
        self.weights.cols
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    layers: Vec<Layer>,
    activation: Activation,
    output_activation: OutputActivation,
}

/// Per-layer gradients, shaped exactly like the network's layers.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub layers: Vec<Layer>,
}

impl Gradients {
    /// Flat views in the order used by `Network::parameters_mut`.
    pub fn slices(&self) -> Vec<&[f64]> {
        let mut res = Vec::with_capacity(self.layers.len() * 2);
        for layer in &self.layers {
            res.push(&layer.weights.mem[..]);
            res.push(&layer.biases[..]);
        }

        return res;
    }
}

impl Network {
    /// `layer_sizes` runs from the input width to the output width.
    pub fn new<R: Rng>(
        layer_sizes: &[usize],
        activation: Activation,
        output_activation: OutputActivation,
        rng: &mut R,
    ) -> Self {
        assert!(
            layer_sizes.len() >= 2,
            "Network needs input and output layers, got {:?}",
            layer_sizes
        );

        // Glorot uniform; logistic units get the narrower bound.
        let factor = if activation == Activation::Logistic {
            2.0
        } else {
            6.0
        };

        let mut layers = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let bound = (factor / (fan_in + fan_out) as f64).sqrt();
            let weights = Matrix::new(fan_in, fan_out).init_uniform(bound, rng);
            let biases = Matrix::new(1, fan_out).init_uniform(bound, rng).mem;
            layers.push(Layer { weights, biases });
        }

        Network {
            layers,
            activation,
            output_activation,
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers[0].fan_in()
    }

    pub fn output_size(&self) -> usize {
        self.layers[self.layers.len() - 1].fan_out()
    }

    /// Activations of every layer, input included.
    pub fn forward(&self, inputs: &Matrix) -> Vec<Matrix> {
        assert!(
            inputs.cols == self.input_size(),
            "Invalid input width: {} != {}",
            inputs.cols,
            self.input_size()
        );

        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(inputs.clone());
        let last = self.layers.len() - 1;
        for (i, layer) in self.layers.iter().enumerate() {
            let mut z = activations[i].dot(&layer.weights);
            z.add_row_vec(&layer.biases);
            if i == last {
                apply_output(self.output_activation, &mut z);
            } else {
                apply_hidden(self.activation, &mut z);
            }
            activations.push(z);
        }

        return activations;
    }

    pub fn predict(&self, inputs: &Matrix) -> Matrix {
        let mut activations = self.forward(inputs);
        activations.pop().unwrap_or_else(|| Matrix::zeros(inputs.rows, 0))
    }

    /// Loss over the batch and the gradients of every parameter. `targets` is
    /// one-hot (or a single 0/1 column for the logistic output).
    pub fn backward(&self, activations: &[Matrix], targets: &Matrix, alpha: f64) -> (f64, Gradients) {
        let outputs = &activations[activations.len() - 1];
        assert!(
            outputs.rows == targets.rows && outputs.cols == targets.cols,
            "Invalid targets: {}x{} != {}x{}",
            targets.rows,
            targets.cols,
            outputs.rows,
            outputs.cols
        );

        let n_samples = outputs.rows as f64;
        let penalty: f64 = self.layers.iter().map(|l| l.weights.sum_squares()).sum();
        let loss = log_loss(self.output_activation, targets, outputs) + 0.5 * alpha * penalty / n_samples;

        let mut grads: Vec<Layer> = self.layers.iter().map(Layer::zeros_like).collect();

        // Both output activations pair with log-loss so the output delta is p - y.
        let mut delta = outputs.clone();
        delta.sub(targets);

        for i in (0..self.layers.len()).rev() {
            let layer = &self.layers[i];
            let mut weights_grad = activations[i].t_dot(&delta);
            weights_grad.add_scaled(alpha, &layer.weights);
            weights_grad.apply(|v| v / n_samples);
            grads[i].weights = weights_grad;
            grads[i].biases = delta.mean_rows();

            if i > 0 {
                delta = delta.dot_t(&layer.weights);
                hidden_derivative(self.activation, &activations[i], &mut delta);
            }
        }

        (loss, Gradients { layers: grads })
    }

    /// Mutable flat views: weights then biases, layer by layer.
    pub fn parameters_mut(&mut self) -> Vec<&mut [f64]> {
        let mut res = Vec::with_capacity(self.layers.len() * 2);
        for layer in self.layers.iter_mut() {
            let Layer { weights, biases } = layer;
            res.push(&mut weights.mem[..]);
            res.push(&mut biases[..]);
        }

        return res;
    }

    pub fn parameter_sizes(&self) -> Vec<usize> {
        let mut res = Vec::with_capacity(self.layers.len() * 2);
        for layer in &self.layers {
            res.push(layer.weights.mem.len());
            res.push(layer.biases.len());
        }

        return res;
    }
}

fn apply_hidden(activation: Activation, z: &mut Matrix) {
    match activation {
        Activation::Identity => {}
        Activation::Logistic => z.apply(sigmoid),
        Activation::Tanh => z.apply(f64::tanh),
        Activation::Relu => z.apply(|x| if x > 0.0 { x } else { 0.0 }),
    }
}

fn apply_output(output_activation: OutputActivation, z: &mut Matrix) {
    match output_activation {
        OutputActivation::Logistic => z.apply(sigmoid),
        OutputActivation::Softmax => {
            for row in 0..z.rows {
                let row = z.row_mut(row);
                let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for val in row.iter_mut() {
                    *val = (*val - max).exp();
                    sum += *val;
                }
                for val in row.iter_mut() {
                    *val /= sum;
                }
            }
        }
    }
}

/// Multiplies `delta` by the activation derivative, expressed on the
/// activated values `a`.
fn hidden_derivative(activation: Activation, a: &Matrix, delta: &mut Matrix) {
    for (d, &act) in delta.mem.iter_mut().zip(&a.mem) {
        match activation {
            Activation::Identity => {}
            Activation::Logistic => *d *= act * (1.0 - act),
            Activation::Tanh => *d *= 1.0 - act * act,
            Activation::Relu => {
                if act == 0.0 {
                    *d = 0.0;
                }
            }
        }
    }
}

fn log_loss(output_activation: OutputActivation, targets: &Matrix, outputs: &Matrix) -> f64 {
    let eps = f64::EPSILON;
    let n_samples = outputs.rows as f64;
    let mut total = 0.0;
    for (&y, &p) in targets.mem.iter().zip(&outputs.mem) {
        let p = p.max(eps).min(1.0 - eps);
        total += match output_activation {
            OutputActivation::Logistic => y * p.ln() + (1.0 - y) * (1.0 - p).ln(),
            OutputActivation::Softmax => y * p.ln(),
        };
    }

    -total / n_samples
}

fn sigmoid(x: f64) -> f64 {
    1.0 / ((-x).exp() + 1.0)
}
