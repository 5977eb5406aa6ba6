use core::marker::PhantomData;

use burn::prelude::*;
use burn::train::metric::{Metric, MetricEntry, MetricMetadata, Numeric};

/// Input type for the mixture NLL metric
pub struct MdnLossInput<B: Backend> {
    /// Scalar loss produced by `MdnLoss::forward`
    pub loss: Tensor<B, 1>,
}

impl<B: Backend> MdnLossInput<B> {
    pub fn new(loss: Tensor<B, 1>) -> Self {
        Self { loss }
    }
}

/// Metric tracking the mixture negative log-likelihood during training
#[derive(Default)]
pub struct MdnLossMetric<B: Backend> {
    current: f64,
    _backend: PhantomData<B>,
}

impl<B: Backend> MdnLossMetric<B> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<B: Backend> Metric for MdnLossMetric<B> {
    type Input = MdnLossInput<B>;

    fn update(&mut self, input: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        self.current = input.loss.clone().into_scalar().elem::<f32>() as f64;

        let formatted = format!("{:.6}", self.current);
        MetricEntry::new("Mixture NLL".to_string(), formatted.clone(), formatted)
    }

    fn clear(&mut self) {
        self.current = 0.0;
    }

    fn name(&self) -> String {
        "Mixture NLL".to_string()
    }
}

impl<B: Backend> Numeric for MdnLossMetric<B> {
    fn value(&self) -> f64 {
        self.current
    }
}
