use burn::module::Ignored;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

use crate::config::{MdnConfig, MuActivation};
use crate::params::elu_plus_one_plus_epsilon_tensor;

/// Projects an upstream representation into the flat mixture parameter
/// layout `[means(K*D) | scales(K*D) | weight_logits(K)]`.
///
/// Scales go through the positive activation here, so rows leaving this
/// module satisfy the positivity contract the loss and sampler rely on.
/// Weight logits are left raw; softmax happens at loss/sampling time.
#[derive(Module, Debug)]
pub struct MdnHead<B: Backend> {
    mu_layer: Linear<B>,
    sigma_layer: Linear<B>,
    pi_layer: Linear<B>,
    mu_activation: Ignored<MuActivation>,
}

impl<B: Backend> MdnHead<B> {
    pub fn new(
        device: &Device<B>,
        input_dim: usize,
        config: &MdnConfig,
        mu_activation: MuActivation,
    ) -> Self {
        let mixture_len = config.mixture_len();
        let mu_layer = LinearConfig::new(input_dim, mixture_len).init(device);
        let sigma_layer = LinearConfig::new(input_dim, mixture_len).init(device);
        let pi_layer = LinearConfig::new(input_dim, config.num_mixes).init(device);

        Self {
            mu_layer,
            sigma_layer,
            pi_layer,
            mu_activation: Ignored(mu_activation),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let mus = self.mu_layer.forward(x.clone());
        let mus = match self.mu_activation.0 {
            MuActivation::Identity => mus,
            MuActivation::Tanh => mus.tanh(),
        };
        let sigmas = elu_plus_one_plus_epsilon_tensor(self.sigma_layer.forward(x.clone()));
        let pi_logits = self.pi_layer.forward(x);

        Tensor::cat(vec![mus, sigmas, pi_logits], 1)
    }
}
