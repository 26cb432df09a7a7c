//! Normal-inverse-gamma posterior sampling.
//!
//! Shared math for the normal and log-normal arm models: combine observed
//! rewards with a conjugate normal-inverse-gamma prior and draw paired
//! (mean, variance) samples from the joint posterior.
//!
//! The update follows the standard conjugate form (Gelman et al., BDA ch. 3):
//!
//! ```text
//! kN          = k0 + N
//! mN          = (k0*m0 + N*x̄) / kN
//! vN          = v0 + N
//! vN * s_sqN  = v0*s_sq0 + SSD + N*k0*(m0 - x̄)^2 / kN
//! ```
//!
//! Variances are drawn via the scaled inverse-gamma identity
//! `b * InvGamma(a, 1) = InvGamma(a, b)`, realized as `b / Gamma(a, 1)`.
//! Each mean draw is conditioned on its paired variance draw, preserving the
//! normal-inverse-gamma joint.

use rand::rngs::StdRng;
use rand_distr::{Distribution, Gamma, Normal};

use crate::Error;

/// Normal-inverse-gamma prior hyperparameters.
///
/// - `m0`: guess about where the mean is.
/// - `k0`: certainty about `m0`; compare with the number of observations.
/// - `s_sq0`: prior scale of the variance.
/// - `v0`: degrees of freedom of the variance; compare with the number of
///   observations.
///
/// Hyperparameters are fixed at construction and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NigPrior {
    pub m0: f64,
    pub k0: f64,
    pub s_sq0: f64,
    pub v0: f64,
}

impl Default for NigPrior {
    fn default() -> Self {
        Self {
            m0: 1.0,
            k0: 1.0,
            s_sq0: 1.0,
            v0: 1.0,
        }
    }
}

fn sampling_err<E: std::fmt::Display>(e: E) -> Error {
    Error::Sampling(e.to_string())
}

/// Draw `n` paired (mean, variance) samples from the posterior of `prior`
/// updated with `data`.
///
/// With no data this draws from the prior alone: means from
/// `Normal(m0, s_sq0)` and variances from `(v0*s_sq0/2) * InvGamma(v0/2, 1)`.
///
/// Observation content is not validated; non-finite rewards propagate into
/// the math unmodified. Malformed hyperparameters (non-positive shapes or
/// scales) fail fast with [`Error::Sampling`].
pub fn draw_mus_and_sigmas(
    data: &[f64],
    prior: NigPrior,
    n: usize,
    rng: &mut StdRng,
) -> Result<(Vec<f64>, Vec<f64>), Error> {
    let NigPrior { m0, k0, s_sq0, v0 } = prior;
    let big_n = data.len();

    if big_n == 0 {
        let mean_dist = Normal::new(m0, s_sq0).map_err(sampling_err)?;
        let gamma = Gamma::new(v0 / 2.0, 1.0).map_err(sampling_err)?;
        let scale = v0 * s_sq0 / 2.0;
        let mut mus = Vec::with_capacity(n);
        let mut sig_sqs = Vec::with_capacity(n);
        for _ in 0..n {
            mus.push(mean_dist.sample(rng));
            sig_sqs.push(scale / gamma.sample(rng));
        }
        return Ok((mus, sig_sqs));
    }

    let nf = big_n as f64;
    let the_mean = data.iter().sum::<f64>() / nf;
    let ssd = data.iter().map(|x| (x - the_mean).powi(2)).sum::<f64>();

    let k_n = k0 + nf;
    let m_n = (k0 / k_n) * m0 + (nf / k_n) * the_mean;
    let v_n = v0 + nf;
    let v_n_times_s_sq_n = v0 * s_sq0 + ssd + (nf * k0 * (m0 - the_mean).powi(2)) / k_n;

    let alpha = v_n / 2.0;
    let beta = v_n_times_s_sq_n / 2.0;

    let gamma = Gamma::new(alpha, 1.0).map_err(sampling_err)?;
    let mut mus = Vec::with_capacity(n);
    let mut sig_sqs = Vec::with_capacity(n);
    for _ in 0..n {
        let sig_sq = beta / gamma.sample(rng);
        let mu_dist = Normal::new(m_n, (sig_sq / k_n).sqrt()).map_err(sampling_err)?;
        mus.push(mu_dist.sample(rng));
        sig_sqs.push(sig_sq);
    }
    Ok((mus, sig_sqs))
}
