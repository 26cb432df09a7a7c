//! Arm reward models: posterior sampling per arm.
//!
//! An arm model turns raw observed rewards into posterior reward-estimate
//! draws. Models are stateless with respect to data: observations are passed
//! in per call and never owned by the model, so one model instance serves
//! every arm of an environment. Hyperparameters are fixed at construction.
//!
//! Three conjugate families are provided:
//!
//! - [`BinomialArm`]: beta-binomial, for 0/1 (or zero/nonzero) rewards.
//! - [`NormalArm`]: normal-inverse-gamma, for real-valued rewards.
//! - [`LogNormalArm`]: normal-inverse-gamma on log-transformed rewards, for
//!   heavy-tailed positive rewards (revenue-like metrics).
//!
//! None of the models validate observation content; negative or non-finite
//! rewards propagate into the math unmodified. Callers own data quality.

use rand::rngs::StdRng;
use rand_distr::{Beta, Distribution};

use crate::posterior::{draw_mus_and_sigmas, NigPrior};
use crate::Error;

/// A reward distribution with a posterior-sampling operation.
pub trait Arm {
    /// Draw `n` reward-estimate samples from the posterior formed by
    /// combining the model's prior with `data`.
    ///
    /// With no observations this draws from the prior alone.
    fn sample(&self, data: &[f64], n: usize, rng: &mut StdRng) -> Result<Vec<f64>, Error>;
}

/// Beta-binomial arm: conjugate `Beta(alpha, beta)` prior over a success
/// rate, where a nonzero observation counts as a success.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinomialArm {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for BinomialArm {
    fn default() -> Self {
        Self {
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

impl Arm for BinomialArm {
    fn sample(&self, data: &[f64], n: usize, rng: &mut StdRng) -> Result<Vec<f64>, Error> {
        let successes = data.iter().filter(|&&x| x != 0.0).count() as f64;
        let trials = data.len() as f64;
        let dist = Beta::new(self.alpha + successes, self.beta + trials - successes)
            .map_err(|e| Error::Sampling(e.to_string()))?;
        Ok((0..n).map(|_| dist.sample(rng)).collect())
    }
}

/// Normal arm: normal-inverse-gamma prior over (mean, variance).
///
/// `sample` returns the posterior mean draws.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormalArm {
    pub prior: NigPrior,
}

impl Arm for NormalArm {
    fn sample(&self, data: &[f64], n: usize, rng: &mut StdRng) -> Result<Vec<f64>, Error> {
        let (mus, _) = draw_mus_and_sigmas(data, self.prior, n, rng)?;
        Ok(mus)
    }
}

/// Log-normal arm: normal-inverse-gamma prior applied to `ln(reward)`.
///
/// Each paired posterior draw `(mu, sig_sq)` is transformed into a log-normal
/// mean estimate `exp(mu + sig_sq / 2)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogNormalArm {
    pub prior: NigPrior,
}

impl Arm for LogNormalArm {
    fn sample(&self, data: &[f64], n: usize, rng: &mut StdRng) -> Result<Vec<f64>, Error> {
        let log_data: Vec<f64> = data.iter().map(|x| x.ln()).collect();
        let (mus, sig_sqs) = draw_mus_and_sigmas(&log_data, self.prior, n, rng)?;
        Ok(mus
            .iter()
            .zip(&sig_sqs)
            .map(|(mu, sig_sq)| (mu + sig_sq / 2.0).exp())
            .collect())
    }
}

/// Closed registry of arm models, selectable by name.
///
/// This is the crate's equivalent of a name→constructor table: variants are
/// enumerated here once, and [`ArmModel::from_name`] resolves configuration
/// strings without any runtime discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "model", rename_all = "lowercase"))]
pub enum ArmModel {
    Binomial(BinomialArm),
    Normal(NormalArm),
    LogNormal(LogNormalArm),
}

impl ArmModel {
    /// Resolve a model by registry name with default hyperparameters.
    ///
    /// Known names: `"binomial"`, `"normal"`, `"lognormal"`.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "binomial" => Ok(Self::Binomial(BinomialArm::default())),
            "normal" => Ok(Self::Normal(NormalArm::default())),
            "lognormal" => Ok(Self::LogNormal(LogNormalArm::default())),
            other => Err(Error::UnknownModel(other.to_string())),
        }
    }

    /// The registry name of this model.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binomial(_) => "binomial",
            Self::Normal(_) => "normal",
            Self::LogNormal(_) => "lognormal",
        }
    }
}

impl Arm for ArmModel {
    fn sample(&self, data: &[f64], n: usize, rng: &mut StdRng) -> Result<Vec<f64>, Error> {
        match self {
            Self::Binomial(a) => a.sample(data, n, rng),
            Self::Normal(a) => a.sample(data, n, rng),
            Self::LogNormal(a) => a.sample(data, n, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn mean(xs: &[f64]) -> f64 {
        xs.iter().sum::<f64>() / xs.len() as f64
    }

    #[test]
    fn binomial_no_data_samples_prior() {
        let mut rng = StdRng::seed_from_u64(1);
        let arm = BinomialArm::default();
        let samples = arm.sample(&[], 4000, &mut rng).unwrap();
        // Beta(1, 1) is uniform on [0, 1].
        assert!((mean(&samples) - 0.5).abs() < 0.05);
        assert!(samples.iter().all(|&s| (0.0..=1.0).contains(&s)));
    }

    #[test]
    fn binomial_counts_nonzero_as_success() {
        let mut rng = StdRng::seed_from_u64(2);
        let arm = BinomialArm::default();
        // 3 successes (nonzero) out of 4 trials, strong prior pull aside.
        let data = [1.0, 2.5, 0.0, -1.0];
        let samples = arm.sample(&data, 5000, &mut rng).unwrap();
        // Posterior mean of Beta(1+3, 1+1) = 4/6.
        assert!((mean(&samples) - 4.0 / 6.0).abs() < 0.05);
    }

    #[test]
    fn normal_posterior_tracks_data() {
        let mut rng = StdRng::seed_from_u64(3);
        let arm = NormalArm::default();
        let data: Vec<f64> = (0..500).map(|i| 20.0 + (i % 5) as f64).collect();
        let samples = arm.sample(&data, 1000, &mut rng).unwrap();
        let data_mean = mean(&data);
        assert!((mean(&samples) - data_mean).abs() < 0.3);
    }

    #[test]
    fn lognormal_transforms_back_to_mean_scale() {
        let mut rng = StdRng::seed_from_u64(4);
        let arm = LogNormalArm::default();
        // ln(data) constant at ln(10): posterior mean estimate near 10.
        let data = vec![10.0; 800];
        let samples = arm.sample(&data, 1000, &mut rng).unwrap();
        assert!(
            (mean(&samples) - 10.0).abs() < 1.0,
            "got {}",
            mean(&samples)
        );
    }

    #[test]
    fn registry_round_trips_names() {
        for name in ["binomial", "normal", "lognormal"] {
            assert_eq!(ArmModel::from_name(name).unwrap().name(), name);
        }
        assert!(matches!(
            ArmModel::from_name("poisson"),
            Err(Error::UnknownModel(_))
        ));
    }
}
