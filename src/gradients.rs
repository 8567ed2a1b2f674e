//! Gradient Utilities
//!
//! Utilities for working with gradients during training: clamping for
//! stability and norm computation for monitoring.
//!
//! ## Why Clamp Gradients?
//!
//! The hidden-to-hidden matrix is applied once per timestep, so the backward
//! pass multiplies through it once per timestep too. When its spectral
//! radius is unfavorable the carried hidden-state gradient grows
//! geometrically over the window and a single bad window can blow the
//! parameters apart:
//!
//! ```text
//! Iter 1000: Loss = 2.1
//! Iter 1001: Loss = 94.7   (gradient explosion)
//! Iter 1002: Loss = NaN    (training failed)
//! ```
//!
//! Clamping every gradient element into a fixed range before the update
//! bounds the worst case while leaving typical updates untouched.

use rayon::prelude::*;

use crate::rnn::RnnGradients;

/// Clamp every gradient element into `[-limit, limit]`
///
/// Applied after the backward pass and before the parameter update. Unlike
/// norm-based clipping this does not preserve gradient direction; it is the
/// blunt elementwise bound that keeps a runaway recurrent gradient from
/// destroying the parameters.
///
/// # Arguments
///
/// * `grads` - Gradients to clamp (modified in place)
/// * `limit` - Bound for the absolute value of every element
pub fn clip_gradients(grads: &mut RnnGradients, limit: f32) {
    for tensor in grads.tensors_mut() {
        if tensor.data.len() > 1000 {
            tensor
                .data
                .par_iter_mut()
                .for_each(|g| *g = g.clamp(-limit, limit));
        } else {
            for g in tensor.data.iter_mut() {
                *g = g.clamp(-limit, limit);
            }
        }
    }
}

/// Compute the L2 norm of all gradients
///
/// The square root of the sum of squared gradient values across all five
/// accumulators. A single number summarizing the update magnitude, useful
/// for spotting instability before it reaches the parameters.
pub fn compute_grad_norm(grads: &RnnGradients) -> f32 {
    let sum_sq: f32 = grads
        .tensors()
        .iter()
        .map(|tensor| {
            if tensor.data.len() > 1000 {
                tensor.data.par_iter().map(|&v| v * v).sum::<f32>()
            } else {
                tensor.data.iter().map(|&v| v * v).sum::<f32>()
            }
        })
        .sum();
    sum_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_bounds_every_element() {
        let mut grads = RnnGradients::zeros(4, 3);
        grads.wxh.data[0] = 42.0;
        grads.whh.data[1] = -42.0;
        grads.by.data[2] = 4.9;

        clip_gradients(&mut grads, 5.0);

        assert_eq!(grads.wxh.data[0], 5.0);
        assert_eq!(grads.whh.data[1], -5.0);
        assert_eq!(grads.by.data[2], 4.9);
        for tensor in grads.tensors() {
            assert!(tensor.data.iter().all(|g| g.abs() <= 5.0));
        }
    }

    #[test]
    fn grad_norm_of_known_values() {
        let mut grads = RnnGradients::zeros(2, 2);
        grads.bh.data[0] = 3.0;
        grads.by.data[1] = 4.0;

        let norm = compute_grad_norm(&grads);
        assert!((norm - 5.0).abs() < 1e-6);
    }

    #[test]
    fn grad_norm_of_zeros_is_zero() {
        let grads = RnnGradients::zeros(8, 8);
        assert_eq!(compute_grad_norm(&grads), 0.0);
    }
}
