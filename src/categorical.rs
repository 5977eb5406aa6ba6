use rand::Rng;

use crate::error::{MdnError, Result};

/// Temperature-scaled softmax over raw mixture-weight logits.
///
/// Logits are divided by `temperature` before normalising, so values below
/// 1.0 sharpen the distribution and values above 1.0 flatten it. The max
/// logit is subtracted before exponentiating to protect against overflow.
pub fn softmax(logits: &[f32], temperature: f32) -> Result<Vec<f32>> {
    if !(temperature > 0.0) {
        return Err(MdnError::InvalidTemperature { value: temperature });
    }
    let scaled: Vec<f32> = logits.iter().map(|&l| l / temperature).collect();
    let max = scaled.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scaled.iter().map(|&e| (e - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    Ok(exp.into_iter().map(|e| e / sum).collect())
}

/// Inverse-CDF draw from a categorical distribution.
///
/// Walks the entries in index order, accumulating mass, and returns the
/// first index whose cumulative sum reaches the uniform draw. Returns
/// `None` if rounding leaves the cumulative sum short of the draw; callers
/// must check before indexing components.
pub fn sample_categorical<R: Rng + ?Sized>(dist: &[f32], rng: &mut R) -> Option<usize> {
    let r: f32 = rng.random();
    let mut accumulate = 0.0f32;
    for (i, &p) in dist.iter().enumerate() {
        accumulate += p;
        if accumulate >= r {
            return Some(i);
        }
    }
    tracing::warn!(
        "categorical draw {} exceeded cumulative mass {}",
        r,
        accumulate
    );
    None
}
