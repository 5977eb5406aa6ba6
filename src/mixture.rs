use rand::Rng;
use rand_distr::StandardNormal;
use statrs::distribution::{Continuous, Normal};

use crate::categorical;
use crate::config::MdnConfig;
use crate::error::{MdnError, Result};
use crate::params::split_mixture_params;

/// One diagonal-covariance Gaussian component: mean and scale per dimension.
/// Covariance is implicitly `diag(sigma)^2`.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureComponent {
    pub mu: Vec<f32>,
    pub sigma: Vec<f32>,
}

/// A categorical distribution over K diagonal-Gaussian components.
///
/// Constructed fresh from a parameter row per evaluation; carries no state
/// across calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MixtureModel {
    pub weights: Vec<f32>,
    pub components: Vec<MixtureComponent>,
}

impl MixtureModel {
    /// Builds the mixture from one flat parameter row.
    ///
    /// The weight logits go through a temperature-scaled softmax; means and
    /// scales are grouped into K components of `output_dim` entries each.
    /// Scales are taken as stored; the positive activation is the
    /// producer's contract.
    pub fn from_params(params: &[f32], config: &MdnConfig, temperature: f32) -> Result<Self> {
        let (mus, sigmas, pi_logits) = split_mixture_params(params, config)?;
        let weights = categorical::softmax(pi_logits, temperature)?;

        let components = mus
            .chunks_exact(config.output_dim)
            .zip(sigmas.chunks_exact(config.output_dim))
            .map(|(mu, sigma)| MixtureComponent {
                mu: mu.to_vec(),
                sigma: sigma.to_vec(),
            })
            .collect();

        Ok(Self {
            weights,
            components,
        })
    }

    fn output_dim(&self) -> usize {
        self.components[0].mu.len()
    }

    /// Log-probability of `target` under the mixture.
    ///
    /// Computed as log-sum-exp over per-component `ln(weight) + ln N(target)`
    /// terms; the diagonal covariance makes each component density a sum of
    /// independent 1-D Gaussian log densities.
    pub fn log_likelihood(&self, target: &[f32]) -> Result<f32> {
        if target.len() != self.output_dim() {
            return Err(MdnError::TargetLength {
                expected: self.output_dim(),
                got: target.len(),
            });
        }

        let mut log_terms = Vec::with_capacity(self.components.len());
        for (&weight, component) in self.weights.iter().zip(&self.components) {
            let mut log_density = 0.0f64;
            for ((&t, &mu), &sigma) in target
                .iter()
                .zip(&component.mu)
                .zip(&component.sigma)
            {
                let normal = Normal::new(mu as f64, sigma as f64)
                    .map_err(|_| MdnError::InvalidScale { value: sigma })?;
                log_density += normal.ln_pdf(t as f64);
            }
            log_terms.push((weight as f64).ln() + log_density);
        }

        let max = log_terms
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = log_terms.iter().map(|&t| (t - max).exp()).sum();
        Ok((max + sum.ln()) as f32)
    }

    /// One stochastic draw from the mixture.
    ///
    /// Picks a component by inverse-CDF on the mixture weights, then draws
    /// each dimension independently as `mu + sigma * sigma_temperature * z`
    /// with `z ~ N(0, 1)`. Returns `None` when the categorical draw fails.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        sigma_temperature: f32,
        rng: &mut R,
    ) -> Option<Vec<f32>> {
        let index = categorical::sample_categorical(&self.weights, rng)?;
        let component = &self.components[index];

        Some(
            component
                .mu
                .iter()
                .zip(&component.sigma)
                .map(|(&mu, &sigma)| {
                    let z: f32 = rng.sample(StandardNormal);
                    mu + sigma * sigma_temperature * z
                })
                .collect(),
        )
    }
}
