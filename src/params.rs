use burn::prelude::*;

use crate::config::MdnConfig;
use crate::error::{MdnError, Result};

/// Floor added by the scale activation so sigmas stay strictly positive
/// even for strongly negative raw activations.
pub const SIGMA_EPSILON: f32 = 1e-7;

/// ELU shifted by one plus a small epsilon.
///
/// Maps any real input to a strictly positive scale: `x + 1 + eps` for
/// `x > 0`, `exp(x) + eps` otherwise. Monotonic, so ordering of raw scale
/// activations is preserved.
pub fn elu_plus_one_plus_epsilon(x: f32) -> f32 {
    let elu = if x > 0.0 { x } else { x.exp_m1() };
    elu + 1.0 + SIGMA_EPSILON
}

/// Tensor form of the scale activation, applied to the raw scale block of a
/// parameter head output. Differentiable on autodiff backends.
pub fn elu_plus_one_plus_epsilon_tensor<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let positive = x.clone().greater_elem(0.0).float();
    let negative = positive.clone().neg().add_scalar(1.0);
    // exp only sees the non-positive branch, so it cannot overflow
    let elu = positive * x.clone() + negative * (x.clamp_max(0.0).exp().sub_scalar(1.0));
    elu.add_scalar(1.0 + SIGMA_EPSILON)
}

/// Splits one flat parameter row into its mean, scale, and weight-logit
/// blocks: `[means(K*D) | scales(K*D) | logits(K)]`.
///
/// Borrows only; the scale block is returned as stored. Whether it has been
/// through the positive activation is the producer's contract.
pub fn split_mixture_params<'a>(
    params: &'a [f32],
    config: &MdnConfig,
) -> Result<(&'a [f32], &'a [f32], &'a [f32])> {
    if params.len() != config.param_size() {
        return Err(MdnError::ParamLength {
            expected: config.param_size(),
            got: params.len(),
        });
    }
    let (mus, rest) = params.split_at(config.mixture_len());
    let (sigmas, pi_logits) = rest.split_at(config.mixture_len());
    Ok((mus, sigmas, pi_logits))
}

/// Same partition on a `[rows, 2*K*D + K]` tensor.
pub fn split_param_tensor<B: Backend>(
    y_pred: Tensor<B, 2>,
    config: &MdnConfig,
) -> Result<(Tensor<B, 2>, Tensor<B, 2>, Tensor<B, 2>)> {
    let [rows, cols] = y_pred.dims();
    if cols != config.param_size() {
        return Err(MdnError::ParamLength {
            expected: config.param_size(),
            got: cols,
        });
    }
    let m = config.mixture_len();
    let k = config.num_mixes;
    let mus = y_pred.clone().slice([0..rows, 0..m]);
    let sigmas = y_pred.clone().slice([0..rows, m..2 * m]);
    let pi_logits = y_pred.slice([0..rows, 2 * m..2 * m + k]);
    Ok((mus, sigmas, pi_logits))
}

/// A flat buffer viewed as rows of a fixed length.
///
/// Construction is the reshape step: a buffer that does not divide evenly
/// into rows is rejected here, before any per-row numeric work starts.
#[derive(Debug, Clone, Copy)]
pub struct RowBatch<'a> {
    data: &'a [f32],
    row_len: usize,
}

impl<'a> RowBatch<'a> {
    pub fn new(data: &'a [f32], row_len: usize) -> Result<Self> {
        if row_len == 0 || data.len() % row_len != 0 {
            return Err(MdnError::RaggedBatch {
                len: data.len(),
                row_len,
            });
        }
        Ok(Self { data, row_len })
    }

    pub fn num_rows(&self) -> usize {
        self.data.len() / self.row_len
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> std::slice::ChunksExact<'a, f32> {
        self.data.chunks_exact(self.row_len)
    }
}
