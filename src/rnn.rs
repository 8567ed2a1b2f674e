//! Trainable Character-Level RNN
//!
//! This module implements the complete numeric core of the network: the
//! parameter store, the forward pass through time, the cross-entropy loss,
//! and a hand-coded backward pass (backpropagation through time).
//!
//! ## Architecture
//!
//! A single tanh recurrence over one-hot byte inputs:
//!
//! ```text
//! h[t] = tanh(Wxh x[t] + Whh h[t-1] + bh)
//! y[t] = Why h[t] + by
//! ```
//!
//! where `x[t]` is the one-hot encoding of input byte t, `h` is the hidden
//! state of width `hidden_size`, and `y[t]` are unnormalized logits over the
//! vocabulary.
//!
//! ## Backpropagation Through Time
//!
//! Backpropagation is the chain rule applied recursively. The recurrence
//! makes each hidden state depend on the previous one, so the backward pass
//! runs time in reverse and carries a hidden-state gradient `dh_next` from
//! each timestep to the one before it:
//!
//! ```text
//! dy[t]   = softmax(y[t]) - onehot(target[t])      (scaled by 1/L, mean loss)
//! dWhy   += dy[t] (x) h[t]          dby += dy[t]
//! dh      = Why^T dy[t] + dh_next
//! draw    = (1 - h[t]^2) * dh                      (tanh derivative)
//! dbh    += draw
//! dWxh   += draw (x) x[t]           dWhh += draw (x) h[t-1]
//! dh_next = Whh^T draw
//! ```
//!
//! `(x)` is the outer product. The forward pass caches the input symbols and
//! every hidden state exactly because this reverse sweep needs them.
//!
//! ## Educational Focus
//!
//! Unlike an autograd framework, every gradient is computed explicitly. The
//! code is longer but you can see exactly how gradients flow through the
//! recurrence.

use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::Config;
use crate::error::{PuckError, Result};
use crate::tensor::Tensor;

/// Standard deviation for weight initialization
const INIT_STD: f32 = 0.01;

/// Draw `size` values from N(0, std_dev) using the caller's random source
fn random_init(size: usize, std_dev: f32, rng: &mut impl Rng) -> Vec<f32> {
    let normal = Normal::new(0.0, std_dev).unwrap();
    (0..size).map(|_| normal.sample(&mut *rng)).collect()
}

/// Magic header identifying a checkpoint file
const CHECKPOINT_MAGIC: &[u8; 9] = b"PUCK_CKPT";

/// Checkpoint format version
const CHECKPOINT_VERSION: u8 = 1;

/// The parameter store: weights and biases of the recurrence
///
/// Owns the five parameter tensors. Forward and backward passes borrow the
/// store immutably; only the optimizer mutates it, strictly between passes.
///
/// # Shapes
///
/// - `wxh`: `[hidden_size, vocab_size]` input-to-hidden
/// - `whh`: `[hidden_size, hidden_size]` hidden-to-hidden
/// - `why`: `[vocab_size, hidden_size]` hidden-to-output
/// - `bh`:  `[hidden_size]` hidden bias
/// - `by`:  `[vocab_size]` output bias
pub struct CharRnn {
    pub(crate) wxh: Tensor,
    pub(crate) whh: Tensor,
    pub(crate) why: Tensor,
    pub(crate) bh: Tensor,
    pub(crate) by: Tensor,
    config: Config,
}

/// Cached forward-pass values for one window
///
/// Holds the input symbols and the full chain of hidden states, including
/// the initial one: `hidden[t]` is the state *entering* timestep t, and
/// `hidden[t + 1]` is the state it produced. Dropping this cache makes the
/// backward pass impossible, so [`CharRnn::forward`] always returns it.
pub struct RnnCache {
    inputs: Vec<u8>,
    hidden: Vec<Tensor>,
}

/// Gradient accumulators, one per parameter tensor
///
/// Constructed zeroed at the start of each backward pass, filled during the
/// reverse sweep, consumed by the optimizer, then dropped. Nothing carries
/// over between training steps.
pub struct RnnGradients {
    pub wxh: Tensor,
    pub whh: Tensor,
    pub why: Tensor,
    pub bh: Tensor,
    pub by: Tensor,
}

impl RnnGradients {
    /// Create zeroed accumulators for the given dimensions
    pub fn zeros(vocab_size: usize, hidden_size: usize) -> Self {
        Self {
            wxh: Tensor::zeros(vec![hidden_size, vocab_size]),
            whh: Tensor::zeros(vec![hidden_size, hidden_size]),
            why: Tensor::zeros(vec![vocab_size, hidden_size]),
            bh: Tensor::zeros(vec![hidden_size]),
            by: Tensor::zeros(vec![vocab_size]),
        }
    }

    /// All five accumulators, in a fixed order
    pub fn tensors(&self) -> [&Tensor; 5] {
        [&self.wxh, &self.whh, &self.why, &self.bh, &self.by]
    }

    /// All five accumulators mutably, in the same fixed order
    pub fn tensors_mut(&mut self) -> [&mut Tensor; 5] {
        [
            &mut self.wxh,
            &mut self.whh,
            &mut self.why,
            &mut self.bh,
            &mut self.by,
        ]
    }
}

impl CharRnn {
    /// Create a model with small random weights and zero biases
    ///
    /// Weights are drawn from N(0, 0.01) using the caller's random source,
    /// so construction is reproducible from a seeded generator.
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Config`] if the configuration fails validation.
    pub fn new(config: &Config, rng: &mut impl Rng) -> Result<Self> {
        config.validate()?;

        let vocab = config.vocab_size;
        let hidden = config.hidden_size;

        Ok(Self {
            wxh: Tensor::new(random_init(hidden * vocab, INIT_STD, rng), vec![hidden, vocab]),
            whh: Tensor::new(random_init(hidden * hidden, INIT_STD, rng), vec![hidden, hidden]),
            why: Tensor::new(random_init(vocab * hidden, INIT_STD, rng), vec![vocab, hidden]),
            bh: Tensor::zeros(vec![hidden]),
            by: Tensor::zeros(vec![vocab]),
            config: config.clone(),
        })
    }

    /// The configuration this model was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A zeroed hidden state, the starting point of every independent pass
    pub fn zero_hidden(&self) -> Tensor {
        Tensor::zeros(vec![self.config.hidden_size])
    }

    /// All five parameter tensors, in the same fixed order as
    /// [`RnnGradients::tensors`]
    pub(crate) fn tensors_mut(&mut self) -> [&mut Tensor; 5] {
        [
            &mut self.wxh,
            &mut self.whh,
            &mut self.why,
            &mut self.bh,
            &mut self.by,
        ]
    }

    /// Advance the hidden state by one input symbol
    ///
    /// Computes `tanh(Wxh x + Whh h + bh)` where `x` is the one-hot encoding
    /// of `symbol`. Because `x` is one-hot, `Wxh x` reduces to selecting one
    /// column of `Wxh`.
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Encoding`] if `symbol` is outside the
    /// vocabulary.
    pub fn step(&self, hidden: &Tensor, symbol: u8) -> Result<Tensor> {
        let vocab = self.config.vocab_size;
        if (symbol as usize) >= vocab {
            return Err(PuckError::Encoding {
                symbol,
                vocab_size: vocab,
            });
        }

        let raw = self
            .whh
            .matvec(hidden)
            .add(&self.wxh.column(symbol as usize))
            .add(&self.bh);
        Ok(raw.tanh())
    }

    /// Project a hidden state to vocabulary logits: `Why h + by`
    pub fn logits(&self, hidden: &Tensor) -> Tensor {
        self.why.matvec(hidden).add(&self.by)
    }

    /// Forward pass over a full input window
    ///
    /// Runs the recurrence once per input symbol starting from `h0` and
    /// collects the per-timestep logits. Parameters are not mutated; the
    /// returned cache retains everything the backward pass needs.
    ///
    /// # Returns
    ///
    /// Tuple of (logits, cache) where logits has shape
    /// `[inputs.len(), vocab_size]`.
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Encoding`] on the first input symbol outside the
    /// vocabulary.
    pub fn forward(&self, inputs: &[u8], h0: &Tensor) -> Result<(Tensor, RnnCache)> {
        assert_eq!(
            h0.shape,
            vec![self.config.hidden_size],
            "initial hidden state has shape {:?}, model expects [{}]",
            h0.shape,
            self.config.hidden_size
        );

        let vocab = self.config.vocab_size;
        let mut hidden = Vec::with_capacity(inputs.len() + 1);
        hidden.push(h0.clone());

        let mut logits_data = Vec::with_capacity(inputs.len() * vocab);
        for (t, &symbol) in inputs.iter().enumerate() {
            let h = self.step(&hidden[t], symbol)?;
            logits_data.extend_from_slice(&self.logits(&h).data);
            hidden.push(h);
        }

        let logits = Tensor::new(logits_data, vec![inputs.len(), vocab]);
        let cache = RnnCache {
            inputs: inputs.to_vec(),
            hidden,
        };
        Ok((logits, cache))
    }

    /// Mean cross-entropy loss over one window
    ///
    /// For each timestep the logits row is normalized with the stabilized
    /// softmax and the negative log-probability of the target symbol is
    /// accumulated; the total is averaged over the window length.
    pub fn compute_loss(&self, logits: &Tensor, targets: &[u8]) -> f32 {
        let seq_len = targets.len();
        let vocab = self.config.vocab_size;
        assert_eq!(
            logits.shape,
            vec![seq_len, vocab],
            "logits shape {:?} does not match {} targets over vocab {}",
            logits.shape,
            seq_len,
            vocab
        );

        let mut total_loss = 0.0;
        for (t, &target) in targets.iter().enumerate() {
            let target = target as usize;
            assert!(
                target < vocab,
                "target symbol {} outside vocabulary of size {}",
                target,
                vocab
            );

            let row = &logits.data[t * vocab..(t + 1) * vocab];
            let max_logit = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let exp_sum: f32 = row.iter().map(|&x| (x - max_logit).exp()).sum();

            // log softmax(row)[target], written to avoid the intermediate division
            let log_prob = (row[target] - max_logit) - exp_sum.ln();
            total_loss -= log_prob;
        }

        total_loss / seq_len as f32
    }

    /// Backward pass: gradients of the mean loss for all five parameters
    ///
    /// Runs time in reverse over the cached window, carrying the
    /// hidden-state gradient `dh_next` backward through the recurrence. The
    /// gradient with respect to the initial hidden state is computed on the
    /// last step and discarded: windows are independent, nothing upstream
    /// consumes it.
    ///
    /// The returned gradients are raw; clamping them to a bounded range
    /// before the parameter update is the caller's job (see
    /// [`clip_gradients`](crate::gradients::clip_gradients)).
    ///
    /// # Panics
    ///
    /// Panics if the cache, targets, and logits disagree on the window
    /// length. That is a bug in the calling code, not a recoverable input
    /// error.
    pub fn backward(&self, logits: &Tensor, targets: &[u8], cache: &RnnCache) -> RnnGradients {
        let seq_len = targets.len();
        let vocab = self.config.vocab_size;
        let hidden_size = self.config.hidden_size;

        assert_eq!(
            cache.inputs.len(),
            seq_len,
            "cache holds {} inputs but {} targets were given",
            cache.inputs.len(),
            seq_len
        );
        assert_eq!(
            cache.hidden.len(),
            seq_len + 1,
            "cache holds {} hidden states, expected {}",
            cache.hidden.len(),
            seq_len + 1
        );
        assert_eq!(
            logits.shape,
            vec![seq_len, vocab],
            "logits shape {:?} does not match cached window",
            logits.shape
        );

        let mut grads = RnnGradients::zeros(vocab, hidden_size);
        let mut dh_next = Tensor::zeros(vec![hidden_size]);

        for t in (0..seq_len).rev() {
            let target = targets[t] as usize;
            assert!(
                target < vocab,
                "target symbol {} outside vocabulary of size {}",
                target,
                vocab
            );

            // Softmax cross-entropy seed gradient, scaled by 1/L because the
            // loss is the mean over the window
            let row = &logits.data[t * vocab..(t + 1) * vocab];
            let max_logit = row.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
            let exp_vals: Vec<f32> = row.iter().map(|&x| (x - max_logit).exp()).collect();
            let sum: f32 = exp_vals.iter().sum();

            let mut dy = Tensor::new(
                exp_vals.iter().map(|&e| e / sum).collect(),
                vec![vocab],
            );
            dy.data[target] -= 1.0;
            for g in dy.data.iter_mut() {
                *g /= seq_len as f32;
            }

            let h_t = &cache.hidden[t + 1];
            let h_prev = &cache.hidden[t];

            // Output projection
            grads.why.add_outer(&dy, h_t);
            for (acc, &g) in grads.by.data.iter_mut().zip(&dy.data) {
                *acc += g;
            }

            // Hidden gradient: output path plus the recurrence path from t+1
            let dh = self.why.matvec_t(&dy).add(&dh_next);

            // Through the tanh: d/dx tanh(x) = 1 - tanh(x)^2
            let draw = Tensor::new(
                dh.data
                    .iter()
                    .zip(&h_t.data)
                    .map(|(&d, &h)| d * (1.0 - h * h))
                    .collect(),
                vec![hidden_size],
            );

            for (acc, &g) in grads.bh.data.iter_mut().zip(&draw.data) {
                *acc += g;
            }
            // One-hot input: the outer product touches a single column
            grads.wxh.add_to_column(cache.inputs[t] as usize, &draw);
            grads.whh.add_outer(&draw, h_prev);

            dh_next = self.whh.matvec_t(&draw);
        }

        grads
    }

    /// Save the five parameter tensors plus the configuration to a file
    ///
    /// Binary format: magic header, version byte, length-prefixed JSON
    /// config, then each tensor as shape dims and little-endian f32 data.
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        use std::fs::File;
        use std::io::Write;

        let mut file = File::create(path)?;

        file.write_all(CHECKPOINT_MAGIC)?;
        file.write_all(&[CHECKPOINT_VERSION])?;

        let config_json = serde_json::to_string(&self.config)?;
        let config_bytes = config_json.as_bytes();
        file.write_all(&(config_bytes.len() as u32).to_le_bytes())?;
        file.write_all(config_bytes)?;

        let write_tensor = |file: &mut File, tensor: &Tensor| -> std::io::Result<()> {
            file.write_all(&(tensor.shape.len() as u32).to_le_bytes())?;
            for &dim in &tensor.shape {
                file.write_all(&(dim as u32).to_le_bytes())?;
            }
            file.write_all(&(tensor.data.len() as u32).to_le_bytes())?;
            for &val in &tensor.data {
                file.write_all(&val.to_le_bytes())?;
            }
            Ok(())
        };

        write_tensor(&mut file, &self.wxh)?;
        write_tensor(&mut file, &self.whh)?;
        write_tensor(&mut file, &self.why)?;
        write_tensor(&mut file, &self.bh)?;
        write_tensor(&mut file, &self.by)?;

        Ok(())
    }

    /// Load a model saved by [`CharRnn::save_to_file`]
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Io`] on malformed or truncated files,
    /// [`PuckError::Config`] if the stored configuration is invalid, and
    /// [`PuckError::ShapeMismatch`] if a stored tensor does not match the
    /// shape the stored configuration demands.
    pub fn load_from_file(path: &str) -> Result<Self> {
        use std::fs::File;
        use std::io::Read;

        let mut file = File::open(path)?;

        let mut magic = [0u8; 9];
        file.read_exact(&mut magic)?;
        if &magic != CHECKPOINT_MAGIC {
            return Err(PuckError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid checkpoint header",
            )));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != CHECKPOINT_VERSION {
            return Err(PuckError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unsupported checkpoint version: {}", version[0]),
            )));
        }

        let mut config_len_bytes = [0u8; 4];
        file.read_exact(&mut config_len_bytes)?;
        let config_len = u32::from_le_bytes(config_len_bytes) as usize;

        let mut config_bytes = vec![0u8; config_len];
        file.read_exact(&mut config_bytes)?;
        let config_json = String::from_utf8(config_bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let config: Config = serde_json::from_str(&config_json)?;
        config.validate()?;

        let read_tensor = |file: &mut File| -> std::io::Result<Tensor> {
            let mut shape_len_bytes = [0u8; 4];
            file.read_exact(&mut shape_len_bytes)?;
            let shape_len = u32::from_le_bytes(shape_len_bytes) as usize;

            let mut shape = Vec::with_capacity(shape_len);
            for _ in 0..shape_len {
                let mut dim_bytes = [0u8; 4];
                file.read_exact(&mut dim_bytes)?;
                shape.push(u32::from_le_bytes(dim_bytes) as usize);
            }

            let mut data_len_bytes = [0u8; 4];
            file.read_exact(&mut data_len_bytes)?;
            let data_len = u32::from_le_bytes(data_len_bytes) as usize;
            if data_len != shape.iter().product::<usize>() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "tensor data length does not match its shape",
                ));
            }

            let mut data = Vec::with_capacity(data_len);
            for _ in 0..data_len {
                let mut val_bytes = [0u8; 4];
                file.read_exact(&mut val_bytes)?;
                data.push(f32::from_le_bytes(val_bytes));
            }

            Ok(Tensor::new(data, shape))
        };

        let wxh = read_tensor(&mut file)?;
        let whh = read_tensor(&mut file)?;
        let why = read_tensor(&mut file)?;
        let bh = read_tensor(&mut file)?;
        let by = read_tensor(&mut file)?;

        let vocab = config.vocab_size;
        let hidden = config.hidden_size;
        let expected: [(&Tensor, Vec<usize>); 5] = [
            (&wxh, vec![hidden, vocab]),
            (&whh, vec![hidden, hidden]),
            (&why, vec![vocab, hidden]),
            (&bh, vec![hidden]),
            (&by, vec![vocab]),
        ];
        for (tensor, expected_shape) in &expected {
            if &tensor.shape != expected_shape {
                return Err(PuckError::ShapeMismatch {
                    expected: format!("{:?}", expected_shape),
                    actual: format!("{:?}", tensor.shape),
                });
            }
        }

        Ok(Self {
            wxh,
            whh,
            why,
            bh,
            by,
            config,
        })
    }
}
