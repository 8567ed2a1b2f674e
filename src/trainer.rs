//! Training Loop and Reporting
//!
//! The trainer draws fixed-length windows from a corpus at uniformly random
//! offsets and runs one full step per window:
//!
//! ```text
//! select window -> forward -> loss -> backward -> clamp -> update -> report
//! ```
//!
//! ## How Windows Are Selected
//!
//! A window at offset `o` pairs each input byte with the byte that follows
//! it:
//!
//! ```text
//! Corpus:  [c0, c1, c2, c3, c4, c5, ...]
//! Window at offset 1, length 3:
//!   Input:  [c1, c2, c3]
//!   Target: [c2, c3, c4]
//! ```
//!
//! so an offset is valid exactly when `offset + length + 1 <= corpus len`.
//! Windows are treated as independent: the hidden state is reset to zero for
//! every iteration and no gradient flows across window boundaries.
//!
//! ## Reporting
//!
//! Every `report_interval` iterations the trainer hands (iteration, loss) to
//! an observer callback. [`TrainingLogger`] is one such observer, writing a
//! CSV file and a console line per report; any `FnMut(usize, f32)` works.

use std::fs::File;
use std::io::Write;
use std::time::Instant;

use rand::Rng;

use crate::config::Config;
use crate::error::{PuckError, Result};
use crate::gradients::clip_gradients;
use crate::optimizer::sgd_update;
use crate::rnn::CharRnn;

/// Bound applied elementwise to gradients before each update
const GRADIENT_CLIP: f32 = 5.0;

/// Slice one training window out of a corpus
///
/// Returns `(inputs, targets)` where `targets` is `inputs` shifted forward
/// by one byte.
///
/// # Errors
///
/// Returns [`PuckError::InvalidParameter`] when the window would run past
/// the end of the corpus, i.e. when `offset + seq_length + 1 > corpus.len()`.
/// The boundary case `offset + seq_length + 1 == corpus.len()` is valid.
pub fn window_at(corpus: &[u8], offset: usize, seq_length: usize) -> Result<(&[u8], &[u8])> {
    if offset + seq_length + 1 > corpus.len() {
        return Err(PuckError::InvalidParameter(format!(
            "window at offset {} with length {} runs past corpus of {} bytes",
            offset,
            seq_length,
            corpus.len()
        )));
    }
    let inputs = &corpus[offset..offset + seq_length];
    let targets = &corpus[offset + 1..offset + seq_length + 1];
    Ok((inputs, targets))
}

/// Drives repeated training steps over an in-memory corpus
///
/// The trainer borrows the corpus for its lifetime and validates the
/// configuration against it once, at construction. It owns no model; the
/// model to train is passed to [`Trainer::run`] and mutated in place.
pub struct Trainer<'a> {
    config: Config,
    corpus: &'a [u8],
}

impl<'a> Trainer<'a> {
    /// Create a trainer over a corpus
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Config`] if the configuration fails validation
    /// or the corpus is too short to hold even one window: training needs
    /// `corpus.len() > seq_length + 1` so the random offset has room to
    /// vary.
    pub fn new(config: Config, corpus: &'a [u8]) -> Result<Self> {
        config.validate()?;
        if corpus.len() <= config.seq_length + 1 {
            return Err(PuckError::Config(format!(
                "corpus of {} bytes is too short for seq_length {} (need at least {})",
                corpus.len(),
                config.seq_length,
                config.seq_length + 2
            )));
        }
        Ok(Self { config, corpus })
    }

    /// Run the configured number of training iterations
    ///
    /// Each iteration selects a random window, resets the hidden state to
    /// zero, runs forward/loss/backward, clamps the gradients and applies
    /// one gradient descent step. Every `report_interval` iterations the
    /// observer receives (iteration index, loss). The run never stops early;
    /// it always completes `iterations` steps unless an error aborts it.
    ///
    /// A non-finite loss is reported to stderr and that window's update is
    /// skipped; persistent non-finite losses indicate a learning rate far
    /// too large for the data.
    ///
    /// # Returns
    ///
    /// The loss of the last completed window.
    ///
    /// # Errors
    ///
    /// Returns [`PuckError::Encoding`] as soon as a window contains a byte
    /// outside the configured vocabulary.
    pub fn run(
        &self,
        model: &mut CharRnn,
        rng: &mut impl Rng,
        mut on_report: impl FnMut(usize, f32),
    ) -> Result<f32> {
        assert_eq!(
            (model.config().vocab_size, model.config().hidden_size),
            (self.config.vocab_size, self.config.hidden_size),
            "model was built for a different configuration"
        );

        let seq_length = self.config.seq_length;
        let vocab = self.config.vocab_size;
        let max_offset = self.corpus.len() - seq_length - 1;

        let mut last_loss = (vocab as f32).ln();

        for iteration in 0..self.config.iterations {
            let offset = rng.random_range(0..=max_offset);
            let (inputs, targets) = window_at(self.corpus, offset, seq_length)?;

            // Reject the whole window up front so no half-applied step can
            // happen on a bad corpus
            let window = &self.corpus[offset..offset + seq_length + 1];
            if let Some(&symbol) = window.iter().find(|&&s| (s as usize) >= vocab) {
                return Err(PuckError::Encoding {
                    symbol,
                    vocab_size: vocab,
                });
            }

            let h0 = model.zero_hidden();
            let (logits, cache) = model.forward(inputs, &h0)?;
            let loss = model.compute_loss(&logits, targets);

            if !loss.is_finite() {
                eprintln!(
                    "warning: non-finite loss at iteration {}, skipping update",
                    iteration
                );
                continue;
            }

            let mut grads = model.backward(&logits, targets, &cache);
            clip_gradients(&mut grads, GRADIENT_CLIP);
            sgd_update(model, &grads, self.config.learning_rate);

            last_loss = loss;
            if iteration % self.config.report_interval == 0 {
                on_report(iteration, loss);
            }
        }

        Ok(last_loss)
    }
}

/// Training logger writing metrics to CSV and console
///
/// The CSV file gets one row per report with the iteration index, elapsed
/// seconds, raw loss and perplexity (`exp(loss)`, a more interpretable
/// number: a model guessing uniformly over 128 symbols sits at perplexity
/// 128, a perfect model at 1). Rows are flushed immediately so a crashed
/// run keeps its history.
pub struct TrainingLogger {
    log_file: File,
    start_time: Instant,
    last_log_time: Instant,
}

impl TrainingLogger {
    /// Create a logger, writing the CSV header
    pub fn new(log_path: &str) -> std::io::Result<Self> {
        let mut log_file = File::create(log_path)?;
        writeln!(log_file, "iteration,elapsed_seconds,loss,perplexity,sample")?;

        let now = Instant::now();
        Ok(Self {
            log_file,
            start_time: now,
            last_log_time: now,
        })
    }

    /// Log one report, optionally with a generated text sample
    pub fn log(&mut self, iteration: usize, loss: f32, sample: Option<&str>) -> std::io::Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let perplexity = loss.exp();

        // Escape quotes so samples can't break the CSV format
        let sample_escaped = sample.map(|s| s.replace('"', "\"\"")).unwrap_or_default();

        writeln!(
            self.log_file,
            "{},{:.2},{:.4},{:.2},\"{}\"",
            iteration, elapsed, loss, perplexity, sample_escaped
        )?;
        self.log_file.flush()?;

        let step_time = self.last_log_time.elapsed().as_secs_f32();
        println!(
            "Iter {:5} | Time: {:6.1}s (+{:.1}s) | Loss: {:.4} | Perplexity: {:.2}",
            iteration, elapsed, step_time, loss, perplexity
        );
        if let Some(text) = sample {
            println!("  Sample: \"{}\"", text);
        }

        self.last_log_time = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn overfit_config() -> Config {
        Config {
            vocab_size: 128,
            hidden_size: 8,
            seq_length: 4,
            learning_rate: 0.5,
            iterations: 300,
            report_interval: 50,
        }
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let corpus = b"0123456789";

        // offset + seq_length + 1 == corpus length: the last valid window
        let (inputs, targets) = window_at(corpus, 5, 4).unwrap();
        assert_eq!(inputs, b"5678");
        assert_eq!(targets, b"6789");

        // One past the boundary must be rejected
        assert!(window_at(corpus, 6, 4).is_err());
    }

    #[test]
    fn targets_are_inputs_shifted_by_one() {
        let corpus = b"abcdef";
        let (inputs, targets) = window_at(corpus, 1, 3).unwrap();
        assert_eq!(inputs, b"bcd");
        assert_eq!(targets, b"cde");
    }

    #[test]
    fn trainer_rejects_too_short_corpus() {
        let config = overfit_config();

        // seq_length + 1 bytes: exactly one window exists, but the random
        // offset has no room and training is rejected
        let corpus = vec![b'a'; config.seq_length + 1];
        assert!(matches!(
            Trainer::new(config.clone(), &corpus),
            Err(PuckError::Config(_))
        ));

        // One more byte and it works
        let corpus = vec![b'a'; config.seq_length + 2];
        assert!(Trainer::new(config, &corpus).is_ok());
    }

    #[test]
    fn trainer_surfaces_out_of_vocab_corpus() {
        let mut config = overfit_config();
        config.iterations = 5;

        let corpus = vec![200u8; 32];
        let trainer = Trainer::new(config.clone(), &corpus).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let mut model = CharRnn::new(&config, &mut rng).unwrap();
        let result = trainer.run(&mut model, &mut rng, |_, _| {});
        assert!(matches!(result, Err(PuckError::Encoding { symbol: 200, .. })));
    }

    #[test]
    fn repeated_training_on_a_repetitive_corpus_drives_loss_down() {
        let config = overfit_config();
        let corpus = vec![b'a'; 64];
        let trainer = Trainer::new(config.clone(), &corpus).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let mut model = CharRnn::new(&config, &mut rng).unwrap();

        let mut reports = Vec::new();
        let final_loss = trainer
            .run(&mut model, &mut rng, |iteration, loss| {
                reports.push((iteration, loss));
            })
            .unwrap();

        assert_eq!(reports.len(), 6); // iterations 0, 50, ..., 250
        let first_loss = reports[0].1;

        // The corpus is a single repeated byte, so the model must overfit to
        // near-certainty: loss collapses from ln(128) toward zero
        assert!(first_loss > 1.0, "first loss {} suspiciously low", first_loss);
        assert!(final_loss < 0.05, "final loss {} did not collapse", final_loss);
        assert!(final_loss < first_loss);
    }

    #[test]
    fn report_cadence_follows_the_interval() {
        let mut config = overfit_config();
        config.iterations = 101;
        config.report_interval = 25;

        let corpus = vec![b'b'; 32];
        let trainer = Trainer::new(config.clone(), &corpus).unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let mut model = CharRnn::new(&config, &mut rng).unwrap();

        let mut reported = Vec::new();
        trainer
            .run(&mut model, &mut rng, |iteration, _| reported.push(iteration))
            .unwrap();

        assert_eq!(reported, vec![0, 25, 50, 75, 100]);
    }

    #[test]
    fn logger_writes_csv_rows() {
        let path = std::env::temp_dir().join("puck_training_log_test.csv");
        let path = path.to_str().unwrap();

        {
            let mut logger = TrainingLogger::new(path).unwrap();
            logger.log(0, 4.85, None).unwrap();
            logger.log(100, 2.5, Some("hello \"world\"")).unwrap();
        }

        let contents = std::fs::read_to_string(path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "iteration,elapsed_seconds,loss,perplexity,sample"
        );
        assert!(lines.next().unwrap().starts_with("0,"));
        let row = lines.next().unwrap();
        assert!(row.starts_with("100,"));
        assert!(row.contains("hello \"\"world\"\""));

        std::fs::remove_file(path).ok();
    }
}
