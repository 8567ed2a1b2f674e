//! Generation Demonstration
//!
//! Loads the checkpoint written by the `train` demo and generates text from
//! a seed at a few temperatures.
//!
//! Run with: `cargo run --release --example generate`

use puck::{generate, CharRnn};

const CHECKPOINT_PATH: &str = "puck_model.bin";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let model = CharRnn::load_from_file(CHECKPOINT_PATH)
        .map_err(|e| format!("{} (run the train demo first): {}", CHECKPOINT_PATH, e))?;

    println!(
        "Loaded model: vocab {}, hidden {}\n",
        model.config().vocab_size,
        model.config().hidden_size
    );

    let mut rng = rand::rng();
    let seed = b"If we shadows ";

    for temperature in [0.7, 1.0, 1.3] {
        let text = generate(&model, seed, 200, temperature, &mut rng)?;
        println!("--- temperature {} ---", temperature);
        println!("{}\n", String::from_utf8_lossy(&text));
    }

    Ok(())
}
