//! Gradient Descent Parameter Update
//!
//! Plain fixed-learning-rate gradient descent:
//!
//! ```text
//! W -= learning_rate * dW    for every parameter tensor
//! ```
//!
//! There is deliberately no momentum, no adaptive per-parameter scaling and
//! no weight decay here; the update is the textbook step. It must run
//! exactly once per training step, after the backward pass has filled (and
//! the caller has clamped) a fresh set of gradient accumulators.

use rayon::prelude::*;

use crate::rnn::{CharRnn, RnnGradients};

/// Apply one gradient descent step to the model, in place
///
/// # Arguments
///
/// * `model` - Model to update
/// * `grads` - Gradients from one backward pass; consumed conceptually, the
///   caller must not reuse them for a second update
/// * `learning_rate` - Fixed step size
///
/// # Panics
///
/// Panics if any gradient tensor's shape differs from its parameter, which
/// means the accumulators were built for a different model.
pub fn sgd_update(model: &mut CharRnn, grads: &RnnGradients, learning_rate: f32) {
    let params = model.tensors_mut();
    for (param, grad) in params.into_iter().zip(grads.tensors()) {
        assert_eq!(
            param.shape, grad.shape,
            "parameter/gradient shape mismatch: {:?} vs {:?}",
            param.shape, grad.shape
        );

        // Parallelize for large tensors, sequential for small ones to avoid
        // parallel dispatch overhead
        if param.data.len() > 1000 {
            param
                .data
                .par_iter_mut()
                .zip(grad.data.par_iter())
                .for_each(|(p, &g)| *p -= learning_rate * g);
        } else {
            for (p, &g) in param.data.iter_mut().zip(&grad.data) {
                *p -= learning_rate * g;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn update_moves_parameters_by_lr_times_gradient() {
        let config = Config {
            vocab_size: 4,
            hidden_size: 3,
            seq_length: 2,
            learning_rate: 0.5,
            iterations: 1,
            report_interval: 1,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let mut model = CharRnn::new(&config, &mut rng).unwrap();

        let before = model.tensors_mut().map(|t| t.data.clone());

        let mut grads = RnnGradients::zeros(4, 3);
        grads.wxh.data[0] = 2.0;
        grads.bh.data[2] = -1.0;

        sgd_update(&mut model, &grads, 0.5);

        let after = model.tensors_mut().map(|t| t.data.clone());
        assert!((after[0][0] - (before[0][0] - 1.0)).abs() < 1e-6);
        assert!((after[3][2] - (before[3][2] + 0.5)).abs() < 1e-6);

        // Untouched elements stay put
        assert_eq!(after[1], before[1]);
        assert_eq!(after[2], before[2]);
        assert_eq!(after[4], before[4]);
    }
}
