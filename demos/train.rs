//! Training Demonstration
//!
//! Trains the character-level RNN on a small inline corpus, logs the loss
//! curve to CSV, saves a checkpoint, and prints a generated sample.
//!
//! The corpus lives in the source as a string literal: corpus acquisition is
//! the caller's problem, the engine only ever sees a byte buffer.
//!
//! Run with: `cargo run --release --example train`

use puck::{generate, CharRnn, Config, Trainer, TrainingLogger};

/// Puck's epilogue, repeated into a workable corpus
const EPILOGUE: &str = "If we shadows have offended,\n\
    Think but this, and all is mended,\n\
    That you have but slumber'd here\n\
    While these visions did appear.\n\
    And this weak and idle theme,\n\
    No more yielding but a dream,\n\
    Gentles, do not reprehend:\n\
    If you pardon, we will mend.\n";

const CHECKPOINT_PATH: &str = "puck_model.bin";
const LOG_PATH: &str = "training_log.csv";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Character-Level RNN Training ===\n");

    let corpus = EPILOGUE.repeat(20).into_bytes();
    println!("Corpus: {} bytes\n", corpus.len());

    let config = Config::default();
    println!(
        "Model: vocab {}, hidden {}, window {}, lr {}, {} iterations\n",
        config.vocab_size,
        config.hidden_size,
        config.seq_length,
        config.learning_rate,
        config.iterations
    );

    let mut rng = rand::rng();
    let mut model = CharRnn::new(&config, &mut rng)?;
    let trainer = Trainer::new(config, &corpus)?;

    let mut logger = TrainingLogger::new(LOG_PATH)?;
    let final_loss = trainer.run(&mut model, &mut rng, |iteration, loss| {
        logger
            .log(iteration, loss, None)
            .expect("failed to write training log");
    })?;

    println!("\nTraining complete, final loss {:.4}", final_loss);

    model.save_to_file(CHECKPOINT_PATH)?;
    println!("Checkpoint saved to {}", CHECKPOINT_PATH);

    let sample = generate(&model, b"If we ", 200, 1.0, &mut rng)?;
    println!("\nGenerated sample:\n{}", String::from_utf8_lossy(&sample));

    Ok(())
}
