use core::marker::PhantomData;

use burn::prelude::*;
use burn::train::metric::{Metric, MetricEntry, MetricMetadata, Numeric};

use crate::config::MdnConfig;
use crate::sampling::MdnSampler;

/// Input type for the sampled MSE metric
pub struct SampledMseInput<B: Backend> {
    /// Target rows, reshapeable to `[rows, output_dim]`
    pub targets: Tensor<B, 2>,
    /// Mixture parameter rows, reshapeable to `[rows, 2*K*D + K]`
    pub predictions: Tensor<B, 2>,
}

impl<B: Backend> SampledMseInput<B> {
    pub fn new(targets: Tensor<B, 2>, predictions: Tensor<B, 2>) -> Self {
        Self {
            targets,
            predictions,
        }
    }
}

/// Accuracy-style metric: draws one sample per row and reports the mean
/// squared Euclidean distance to the targets.
///
/// Inherently stochastic: successive updates on the same batch give
/// different values. Uses the process RNG; seedable sampling lives on
/// `MdnSampler` directly.
pub struct SampledMseMetric<B: Backend> {
    current: f64,
    sampler: MdnSampler,
    _backend: PhantomData<B>,
}

impl<B: Backend> SampledMseMetric<B> {
    pub fn new(config: MdnConfig) -> Self {
        Self {
            current: 0.0,
            sampler: MdnSampler::new(config),
            _backend: PhantomData,
        }
    }
}

impl<B: Backend> Metric for SampledMseMetric<B> {
    type Input = SampledMseInput<B>;

    fn update(&mut self, input: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        let mut rng = rand::rng();
        match self.sampler.sampled_mse(
            input.targets.clone(),
            input.predictions.clone(),
            &mut rng,
        ) {
            Ok(mse) => self.current = mse as f64,
            Err(err) => tracing::warn!("sampled MSE skipped: {err}"),
        }

        let formatted = format!("{:.6}", self.current);
        MetricEntry::new("Sampled MSE".to_string(), formatted.clone(), formatted)
    }

    fn clear(&mut self) {
        self.current = 0.0;
    }

    fn name(&self) -> String {
        "Sampled MSE".to_string()
    }
}

impl<B: Backend> Numeric for SampledMseMetric<B> {
    fn value(&self) -> f64 {
        self.current
    }
}
