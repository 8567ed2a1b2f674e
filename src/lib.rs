//! Puck: Educational Character-Level RNN Implementation
//!
//! A complete single-layer recurrent network implemented from scratch in
//! Rust for educational purposes, trained with truncated backpropagation
//! through time. Named after Shakespeare's mischievous sprite from
//! *A Midsummer Night's Dream*.
//!
//! The model reads a byte stream, learns the distribution of the next byte
//! given a window of preceding bytes, and generates new text by sampling
//! from its own predictions. Every gradient is computed by hand; there is no
//! autograd anywhere, which keeps the chain rule through the recurrence
//! visible in the code.
//!
//! # Modules
//!
//! - [`tensor`] - Minimal matrix/vector operations
//! - [`config`] - Hyperparameter bundle
//! - [`rnn`] - Parameter store, forward pass, loss, backward pass
//! - [`gradients`] - Gradient clamping and norm monitoring
//! - [`optimizer`] - Plain gradient descent update
//! - [`trainer`] - Random-window training loop and CSV logger
//! - [`sampler`] - Seed priming and multinomial text generation
//! - [`error`] - Crate error type
//!
//! # Example
//!
//! ```rust,no_run
//! use puck::{CharRnn, Config, Trainer};
//!
//! let config = Config::default();
//! let corpus = b"an in-memory byte corpus, supplied by the caller".to_vec();
//!
//! let mut rng = rand::rng();
//! let mut model = CharRnn::new(&config, &mut rng).unwrap();
//!
//! let trainer = Trainer::new(config, &corpus).unwrap();
//! trainer
//!     .run(&mut model, &mut rng, |iteration, loss| {
//!         println!("iter {iteration}: loss {loss:.4}");
//!     })
//!     .unwrap();
//!
//! let text = puck::generate(&model, b"once", 100, 1.0, &mut rng).unwrap();
//! println!("{}", String::from_utf8_lossy(&text));
//! ```

pub mod config;
pub mod error;
pub mod gradients;
pub mod optimizer;
pub mod rnn;
pub mod sampler;
pub mod tensor;
pub mod trainer;

// Re-export main types for convenience
pub use config::Config;
pub use error::{PuckError, Result};
pub use gradients::{clip_gradients, compute_grad_norm};
pub use optimizer::sgd_update;
pub use rnn::{CharRnn, RnnCache, RnnGradients};
pub use sampler::{generate, prime};
pub use tensor::Tensor;
pub use trainer::{window_at, Trainer, TrainingLogger};
