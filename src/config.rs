//! Model and Training Configuration
//!
//! Hyperparameters for the character-level RNN. The same bundle configures
//! model construction (vocabulary and hidden sizes), the trainer (sequence
//! length, learning rate, iteration count, report cadence) and checkpoint
//! validation on reload.

use serde::{Deserialize, Serialize};

use crate::error::{PuckError, Result};

/// Hyperparameter bundle
///
/// # Fields
///
/// - `vocab_size`: Number of distinct byte symbols (at most 256)
/// - `hidden_size`: Width of the recurrent hidden state
/// - `seq_length`: Length of one training window
/// - `learning_rate`: Step size for gradient descent
/// - `iterations`: Number of training windows to process
/// - `report_interval`: Emit a loss report every this many iterations
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub seq_length: usize,
    pub learning_rate: f32,
    pub iterations: usize,
    pub report_interval: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vocab_size: 128,     // Simple ASCII
            hidden_size: 64,     // Hidden state width
            seq_length: 30,      // Training window length
            learning_rate: 0.01, // Plain gradient descent step
            iterations: 5000,    // Training windows per run
            report_interval: 100,
        }
    }
}

impl Config {
    /// Create a tiny config for quick experiments and tests
    ///
    /// Small enough that a few hundred iterations finish in well under a
    /// second, while still covering the full ASCII byte range.
    pub fn tiny() -> Self {
        Self {
            vocab_size: 128,
            hidden_size: 16,
            seq_length: 8,
            learning_rate: 0.1,
            iterations: 200,
            report_interval: 50,
        }
    }

    /// Check the bundle for values the engine cannot work with
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Config`] for non-positive sizes, a vocabulary
    /// larger than the byte range, a zero report interval, or a learning
    /// rate that is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 || self.vocab_size > 256 {
            return Err(PuckError::Config(format!(
                "vocab_size must be in 1..=256, got {}",
                self.vocab_size
            )));
        }
        if self.hidden_size == 0 {
            return Err(PuckError::Config("hidden_size must be positive".into()));
        }
        if self.seq_length == 0 {
            return Err(PuckError::Config("seq_length must be positive".into()));
        }
        if self.report_interval == 0 {
            return Err(PuckError::Config("report_interval must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(PuckError::Config(format!(
                "learning_rate must be a positive finite number, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
        assert!(Config::tiny().validate().is_ok());
    }

    #[test]
    fn rejects_zero_sizes() {
        let mut config = Config::tiny();
        config.hidden_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::tiny();
        config.vocab_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::tiny();
        config.seq_length = 0;
        assert!(config.validate().is_err());

        let mut config = Config::tiny();
        config.report_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_vocab_beyond_byte_range() {
        let mut config = Config::tiny();
        config.vocab_size = 257;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_learning_rate() {
        let mut config = Config::tiny();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        config.learning_rate = f32::NAN;
        assert!(config.validate().is_err());
    }
}
