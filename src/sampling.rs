use burn::prelude::*;
use rand::Rng;

use crate::config::{MdnConfig, SamplingConfig};
use crate::error::{MdnError, Result};
use crate::mixture::MixtureModel;
use crate::params::RowBatch;

/// Draws stochastic samples from batched mixture parameters.
///
/// Closed over the `(output_dim, num_mixes)` layout plus the temperature
/// controls. Stateless across calls; randomness is injected so sampling
/// sequences are reproducible under a seeded generator.
#[derive(Debug, Clone)]
pub struct MdnSampler {
    config: MdnConfig,
    sampling: SamplingConfig,
}

impl MdnSampler {
    pub fn new(config: MdnConfig) -> Self {
        Self {
            config,
            sampling: SamplingConfig::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// One stochastic sample per parameter row, aligned to input row order.
    ///
    /// `None` marks rows where the categorical draw failed to select a
    /// component; callers must check before using a row's sample.
    pub fn sample_rows<R: Rng + ?Sized>(
        &self,
        y_pred: &[f32],
        rng: &mut R,
    ) -> Result<Vec<Option<Vec<f32>>>> {
        let rows = RowBatch::new(y_pred, self.config.param_size())?;
        let mut samples = Vec::with_capacity(rows.num_rows());
        for row in rows.iter() {
            let model = MixtureModel::from_params(row, &self.config, self.sampling.temperature)?;
            samples.push(model.sample(self.sampling.sigma_temperature, rng));
        }
        Ok(samples)
    }

    /// Tensor-boundary variant of [`sample_rows`](Self::sample_rows).
    pub fn sample_batch<B: Backend, R: Rng + ?Sized>(
        &self,
        y_pred: Tensor<B, 2>,
        rng: &mut R,
    ) -> Result<Vec<Option<Vec<f32>>>> {
        let data = y_pred.to_data().convert::<f32>();
        let values = data.as_slice::<f32>().unwrap();
        self.sample_rows(values, rng)
    }

    /// Mean over rows of the squared Euclidean distance between each row's
    /// drawn sample and its target.
    ///
    /// Re-evaluating draws fresh samples, so this is a noisy estimator, not
    /// a deterministic score. Rows whose draw fails are skipped and logged;
    /// a batch where every draw fails yields NaN.
    pub fn sampled_mse<B: Backend, R: Rng + ?Sized>(
        &self,
        y_true: Tensor<B, 2>,
        y_pred: Tensor<B, 2>,
        rng: &mut R,
    ) -> Result<f32> {
        let true_data = y_true.to_data().convert::<f32>();
        let targets = RowBatch::new(
            true_data.as_slice::<f32>().unwrap(),
            self.config.output_dim,
        )?;
        let samples = self.sample_batch(y_pred, rng)?;
        if targets.num_rows() != samples.len() {
            return Err(MdnError::RowCount {
                pred_rows: samples.len(),
                true_rows: targets.num_rows(),
            });
        }

        let mut sum = 0.0f64;
        let mut counted = 0usize;
        for (target, sample) in targets.iter().zip(&samples) {
            match sample {
                Some(sample) => {
                    let squared_distance: f32 = target
                        .iter()
                        .zip(sample)
                        .map(|(&t, &s)| (s - t) * (s - t))
                        .sum();
                    sum += squared_distance as f64;
                    counted += 1;
                }
                None => tracing::warn!("skipping row without a sampled component"),
            }
        }

        if counted == 0 {
            tracing::warn!("no row produced a sample; sampled MSE undefined");
            return Ok(f32::NAN);
        }
        Ok((sum / counted as f64) as f32)
    }
}
