//! Text Generation
//!
//! Autoregressive sampling from a trained model, in two phases:
//!
//! 1. **Priming**: the seed bytes are pushed through the recurrence one at a
//!    time, starting from a zero hidden state. Logits are not needed here,
//!    only the final hidden state.
//! 2. **Generation**: from the primed state, compute logits, normalize with
//!    the stabilized softmax, draw one symbol from the resulting
//!    distribution, append it, and feed it back through the same recurrence.
//!    Repeat until the output reaches the requested length.
//!
//! Sampling is multinomial (inverse CDF over the cumulative distribution),
//! not greedy argmax: a uniform draw in [0, 1) walks the cumulative
//! probabilities and the first symbol to cross it is selected. Greedy
//! selection would collapse the output into loops; drawing from the full
//! distribution is what makes the generated text vary.
//!
//! Every function takes the random source as an argument, so generation is
//! reproducible from a seeded generator.

use rand::Rng;

use crate::error::{PuckError, Result};
use crate::rnn::CharRnn;
use crate::tensor::Tensor;

/// Run the recurrence over a seed and return the resulting hidden state
///
/// Starts from a zero hidden state and advances once per seed byte, in
/// order. Output projections are skipped entirely; priming only exists to
/// put history into the hidden state before generation begins.
///
/// # Errors
///
/// Returns [`PuckError::Encoding`] if a seed byte is outside the
/// vocabulary.
pub fn prime(model: &CharRnn, seed: &[u8]) -> Result<Tensor> {
    let mut hidden = model.zero_hidden();
    for &symbol in seed {
        hidden = model.step(&hidden, symbol)?;
    }
    Ok(hidden)
}

/// Generate a byte sequence of exactly `length` symbols
///
/// The output starts with the seed and is extended one sampled symbol at a
/// time. `temperature` divides the logits before the softmax: values below
/// 1.0 sharpen the distribution, values above flatten it, and 1.0 samples
/// from the model's raw distribution.
///
/// # Arguments
///
/// * `model` - Trained model to sample from
/// * `seed` - Starting bytes, included verbatim at the front of the output
/// * `length` - Total output length, seed included
/// * `temperature` - Logit divisor, must be positive and finite
/// * `rng` - Random source for the sampling draws
///
/// # Errors
///
/// Returns [`PuckError::InvalidParameter`] if `length` is shorter than the
/// seed or the temperature is unusable, and [`PuckError::Encoding`] if a
/// seed byte is outside the vocabulary.
pub fn generate(
    model: &CharRnn,
    seed: &[u8],
    length: usize,
    temperature: f32,
    rng: &mut impl Rng,
) -> Result<Vec<u8>> {
    if length < seed.len() {
        return Err(PuckError::InvalidParameter(format!(
            "requested length {} is shorter than the {}-byte seed",
            length,
            seed.len()
        )));
    }
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(PuckError::InvalidParameter(format!(
            "temperature must be a positive finite number, got {}",
            temperature
        )));
    }

    let mut output = seed.to_vec();
    let mut hidden = prime(model, seed)?;

    while output.len() < length {
        let mut logits = model.logits(&hidden);
        if temperature != 1.0 {
            for v in logits.data.iter_mut() {
                *v /= temperature;
            }
        }
        let probs = logits.softmax();

        let next = sample_from_probs(&probs.data, rng) as u8;
        output.push(next);
        hidden = model.step(&hidden, next)?;
    }

    Ok(output)
}

/// Draw one index from a probability vector by inverse CDF
///
/// Walks the cumulative distribution until it crosses a uniform draw in
/// [0, 1). If the probabilities are degenerate (all zero, or NaN from an
/// upstream numerical failure) no entry ever crosses the draw and the last
/// index is returned as the defined fallback.
fn sample_from_probs(probs: &[f32], rng: &mut impl Rng) -> usize {
    let r: f32 = rng.random();

    let mut cumsum = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }
    probs.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_model(seed: u64) -> CharRnn {
        let mut rng = StdRng::seed_from_u64(seed);
        CharRnn::new(&Config::tiny(), &mut rng).unwrap()
    }

    #[test]
    fn output_has_requested_length_and_seed_prefix() {
        let model = test_model(1);
        let mut rng = StdRng::seed_from_u64(100);

        let seed = b"once upon";
        let out = generate(&model, seed, 40, 1.0, &mut rng).unwrap();

        assert_eq!(out.len(), 40);
        assert_eq!(&out[..seed.len()], seed);
    }

    #[test]
    fn generation_is_deterministic_under_a_fixed_rng_seed() {
        let model = test_model(2);

        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);

        let out_a = generate(&model, b"to be", 60, 1.0, &mut rng_a).unwrap();
        let out_b = generate(&model, b"to be", 60, 1.0, &mut rng_b).unwrap();

        assert_eq!(out_a, out_b);
    }

    #[test]
    fn length_equal_to_seed_returns_the_seed() {
        let model = test_model(3);
        let mut rng = StdRng::seed_from_u64(7);

        let out = generate(&model, b"verbatim", 8, 1.0, &mut rng).unwrap();
        assert_eq!(out, b"verbatim");
    }

    #[test]
    fn rejects_length_shorter_than_seed() {
        let model = test_model(4);
        let mut rng = StdRng::seed_from_u64(7);

        let result = generate(&model, b"too long a seed", 4, 1.0, &mut rng);
        assert!(matches!(result, Err(PuckError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_non_positive_temperature() {
        let model = test_model(5);
        let mut rng = StdRng::seed_from_u64(7);

        assert!(generate(&model, b"x", 4, 0.0, &mut rng).is_err());
        assert!(generate(&model, b"x", 4, f32::NAN, &mut rng).is_err());
    }

    #[test]
    fn rejects_seed_outside_vocabulary() {
        let model = test_model(6);
        let mut rng = StdRng::seed_from_u64(7);

        let result = generate(&model, &[200u8], 4, 1.0, &mut rng);
        assert!(matches!(result, Err(PuckError::Encoding { .. })));
    }

    #[test]
    fn priming_empty_seed_leaves_state_at_zero() {
        let model = test_model(7);
        let hidden = prime(&model, b"").unwrap();
        assert!(hidden.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn sampling_follows_a_concentrated_distribution() {
        let mut rng = StdRng::seed_from_u64(9);
        let probs = [0.0f32, 1.0, 0.0, 0.0];
        for _ in 0..50 {
            assert_eq!(sample_from_probs(&probs, &mut rng), 1);
        }
    }

    #[test]
    fn degenerate_probabilities_fall_back_to_the_last_symbol() {
        let mut rng = StdRng::seed_from_u64(10);

        let zeros = [0.0f32; 5];
        assert_eq!(sample_from_probs(&zeros, &mut rng), 4);

        let nans = [f32::NAN; 5];
        assert_eq!(sample_from_probs(&nans, &mut rng), 4);
    }
}
