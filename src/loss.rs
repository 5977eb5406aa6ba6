use burn::prelude::*;
use burn::tensor::activation::log_softmax;

use crate::config::MdnConfig;
use crate::error::{MdnError, Result};
use crate::params::{split_param_tensor, SIGMA_EPSILON};

/// Negative log-likelihood of targets under the mixtures described by a
/// batched parameter tensor.
///
/// Closed over the `(output_dim, num_mixes)` layout. All math is tensor ops
/// (log-softmax weights, per-component diagonal Gaussian log densities,
/// log-sum-exp), so gradients flow to the raw parameters on an autodiff
/// backend.
#[derive(Debug, Clone)]
pub struct MdnLoss {
    config: MdnConfig,
}

impl MdnLoss {
    pub fn new(config: MdnConfig) -> Self {
        Self { config }
    }

    /// Mean negative log-likelihood over all rows.
    ///
    /// `y_pred` must reshape to `[rows, 2*K*D + K]` and `y_true` to
    /// `[rows, D]` with matching row counts, so sequence-shaped batches
    /// flatten to rows the same way. Scales are expected positive already
    /// (the head's activation contract); they are floored at the activation
    /// epsilon before entering the densities.
    pub fn forward<B: Backend>(
        &self,
        y_true: Tensor<B, 2>,
        y_pred: Tensor<B, 2>,
    ) -> Result<Tensor<B, 1>> {
        let (y_true, y_pred) = self.reshape_rows(y_true, y_pred)?;
        let [rows, _] = y_pred.dims();
        let d = self.config.output_dim;

        let (mus, sigmas, pi_logits) = split_param_tensor(y_pred, &self.config)?;
        let sigmas = sigmas.clamp_min(SIGMA_EPSILON);
        let log_weights = log_softmax(pi_logits, 1);

        let log_two_pi = (2.0 * std::f32::consts::PI).ln();

        // One weighted log-density column per component; combined below with
        // log-sum-exp rather than summing raw densities.
        let mut log_terms: Vec<Tensor<B, 2>> = Vec::with_capacity(self.config.num_mixes);
        for i in 0..self.config.num_mixes {
            let mu_i = mus.clone().slice([0..rows, i * d..(i + 1) * d]);
            let sigma_i = sigmas.clone().slice([0..rows, i * d..(i + 1) * d]);
            let log_w_i = log_weights.clone().slice([0..rows, i..i + 1]);

            let z = (y_true.clone() - mu_i) / sigma_i.clone();
            let quad = z.powf_scalar(2.0).sum_dim(1);
            let log_det = sigma_i.log().sum_dim(1);
            let log_density = (quad.mul_scalar(0.5) + log_det)
                .neg()
                .sub_scalar(0.5 * d as f32 * log_two_pi);

            log_terms.push(log_w_i + log_density);
        }

        let stacked = Tensor::cat(log_terms, 1);
        let max = stacked.clone().max_dim(1);
        let log_prob = (stacked - max.clone()).exp().sum_dim(1).log() + max;

        Ok(log_prob.neg().mean())
    }

    fn reshape_rows<B: Backend>(
        &self,
        y_true: Tensor<B, 2>,
        y_pred: Tensor<B, 2>,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 2>)> {
        let param_size = self.config.param_size();
        let d = self.config.output_dim;

        let pred_len = y_pred.dims().iter().product::<usize>();
        if pred_len % param_size != 0 {
            return Err(MdnError::RaggedBatch {
                len: pred_len,
                row_len: param_size,
            });
        }
        let true_len = y_true.dims().iter().product::<usize>();
        if true_len % d != 0 {
            return Err(MdnError::RaggedBatch {
                len: true_len,
                row_len: d,
            });
        }

        let pred_rows = pred_len / param_size;
        let true_rows = true_len / d;
        if pred_rows != true_rows {
            return Err(MdnError::RowCount {
                pred_rows,
                true_rows,
            });
        }

        Ok((
            y_true.reshape([true_rows, d]),
            y_pred.reshape([pred_rows, param_size]),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixture::MixtureModel;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_standard_normal_loss_matches_closed_form() {
        let device = Default::default();
        let loss = MdnLoss::new(MdnConfig::new(1, 1));

        // mu = 0, sigma = 1, single component; target at the mean
        let y_pred = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0, 0.0]], &device);
        let y_true = Tensor::<TestBackend, 2>::from_floats([[0.0]], &device);

        let value = loss.forward(y_true, y_pred).unwrap().into_scalar().elem::<f32>();
        let expected = 0.5 * (2.0 * std::f32::consts::PI).ln();
        assert!(
            (value - expected).abs() < 1e-5,
            "loss {value} vs closed form {expected}"
        );
    }

    #[test]
    fn test_identical_rows_reduce_to_single_row_loss() {
        let device = Default::default();
        let loss = MdnLoss::new(MdnConfig::new(2, 2));

        let row = [0.5, -1.0, 2.0, 0.0, 1.0, 1.5, 0.8, 1.2, 0.3, -0.3];
        let target = [0.4, -0.6];

        let single = loss
            .forward(
                Tensor::<TestBackend, 2>::from_floats([target], &device),
                Tensor::<TestBackend, 2>::from_floats([row], &device),
            )
            .unwrap()
            .into_scalar()
            .elem::<f32>();

        let batch = loss
            .forward(
                Tensor::<TestBackend, 2>::from_floats([target, target, target, target], &device),
                Tensor::<TestBackend, 2>::from_floats([row, row, row, row], &device),
            )
            .unwrap()
            .into_scalar()
            .elem::<f32>();

        assert!(
            (single - batch).abs() < 1e-5,
            "single-row loss {single} vs batch mean {batch}"
        );
    }

    #[test]
    fn test_agrees_with_scalar_mixture_path() {
        let device = Default::default();
        let config = MdnConfig::new(2, 3);
        let loss = MdnLoss::new(config.clone());

        let rows = [
            [
                0.1, -0.2, 1.3, 0.4, -1.0, 0.9, // mus
                0.7, 1.1, 0.5, 1.9, 0.8, 1.4, // sigmas
                0.2, -0.5, 1.0, // logits
            ],
            [
                -0.6, 0.0, 0.3, 2.1, 0.7, -0.4,
                1.2, 0.6, 1.0, 0.9, 1.5, 0.7,
                -1.0, 0.4, 0.1,
            ],
        ];
        let targets = [[0.2, -0.1], [1.0, 0.5]];

        let tensor_loss = loss
            .forward(
                Tensor::<TestBackend, 2>::from_floats(targets, &device),
                Tensor::<TestBackend, 2>::from_floats(rows, &device),
            )
            .unwrap()
            .into_scalar()
            .elem::<f32>();

        let mut nll_sum = 0.0f32;
        for (row, target) in rows.iter().zip(targets.iter()) {
            let model = MixtureModel::from_params(row, &config, 1.0).unwrap();
            nll_sum -= model.log_likelihood(target).unwrap();
        }
        let scalar_loss = nll_sum / rows.len() as f32;

        assert!(
            (tensor_loss - scalar_loss).abs() < 1e-4,
            "tensor {tensor_loss} vs scalar {scalar_loss}"
        );
    }

    #[test]
    fn test_sequence_shaped_batch_flattens_to_rows() {
        let device = Default::default();
        let loss = MdnLoss::new(MdnConfig::new(1, 1));

        // two sequences of two steps each, flattened against four flat rows
        let seq_pred = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 1.0, 0.0, 0.5, 1.0, 0.0], [1.0, 1.0, 0.0, -0.5, 1.0, 0.0]],
            &device,
        );
        let seq_true = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.5], [1.0, -0.5]], &device);

        let flat_pred = Tensor::<TestBackend, 2>::from_floats(
            [
                [0.0, 1.0, 0.0],
                [0.5, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [-0.5, 1.0, 0.0],
            ],
            &device,
        );
        let flat_true =
            Tensor::<TestBackend, 2>::from_floats([[0.0], [0.5], [1.0], [-0.5]], &device);

        let seq_loss = loss
            .forward(seq_true, seq_pred)
            .unwrap()
            .into_scalar()
            .elem::<f32>();
        let flat_loss = loss
            .forward(flat_true, flat_pred)
            .unwrap()
            .into_scalar()
            .elem::<f32>();

        assert!((seq_loss - flat_loss).abs() < 1e-6);
    }

    #[test]
    fn test_row_count_mismatch_rejected() {
        let device = Default::default();
        let loss = MdnLoss::new(MdnConfig::new(1, 1));

        let y_pred =
            Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0, 0.0], [0.0, 1.0, 0.0]], &device);
        let y_true = Tensor::<TestBackend, 2>::from_floats([[0.0]], &device);

        assert!(matches!(
            loss.forward(y_true, y_pred),
            Err(MdnError::RowCount {
                pred_rows: 2,
                true_rows: 1
            })
        ));
    }
}
