//! Campaign orchestration: probe every query index, reconcile each gate,
//! then turn the per-index openings into the secret vector.
//!
//! The gate inputs at query x are `a(x) = prod_{j<9} (v_j + x)` and
//! `b(x) = v9 + x`. Ten reconciled indices give ten exact points of the
//! degree-9 polynomial `a`, whose negated roots are the first nine secrets;
//! each index also casts the vote `b - x` for the out-of-band tenth.

pub mod params;

pub use params::{CampaignParams, ParamsError};

use std::time::Instant;

use lode_field::Fp;
use lode_poly::{extract_roots, FactorError, PolyError, Polynomial};
use lode_probe::{ProbeError, ProbeOracle, ProbeRecord};
use lode_solver::{reconcile, SolveError};
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("configuration: {0}")]
    Params(#[from] ParamsError),
    #[error("reconciliation: {0}")]
    Solve(#[from] SolveError),
    #[error("interpolation: {0}")]
    Poly(#[from] PolyError),
    #[error("root extraction: {0}")]
    Factor(#[from] FactorError),
    #[error("expected a {expected}-value secret, assembled {got}")]
    VectorLengthMismatch { expected: usize, got: usize },
}

/// Probe-count and timing metrics returned alongside the secret.
#[derive(Clone, Debug)]
pub struct CampaignReport {
    pub probes_per_index: Vec<u32>,
    pub probes_total: u32,
    pub recover_ms: f64,
}

/// The recovered secret plus campaign metrics. The voted out-of-band value
/// is always the last element.
#[derive(Clone, Debug)]
pub struct CampaignOutcome {
    pub secret: Vec<Fp>,
    pub report: CampaignReport,
}

/// Majority vote over the per-index candidates for the out-of-band value.
///
/// An explicit frequency count; the sample is one candidate per query
/// index, so there is nothing worth streaming. Ties break toward the
/// candidate seen first.
pub fn majority_vote(votes: &[Fp]) -> Fp {
    assert!(!votes.is_empty(), "majority vote over an empty sample");
    let mut counts: Vec<(Fp, u32)> = Vec::new();
    for &vote in votes {
        match counts.iter_mut().find(|(candidate, _)| *candidate == vote) {
            Some((_, n)) => *n += 1,
            None => counts.push((vote, 1)),
        }
    }
    let mut best = counts[0];
    for &(candidate, n) in &counts[1..] {
        if n > best.1 {
            best = (candidate, n);
        }
    }
    best.0
}

struct CountingProbe<'a, O: ProbeOracle> {
    inner: &'a mut O,
    calls: u32,
}

impl<O: ProbeOracle> ProbeOracle for CountingProbe<'_, O> {
    fn probe(&mut self, x: Fp) -> Result<ProbeRecord, ProbeError> {
        self.calls += 1;
        self.inner.probe(x)
    }
}

/// Run the full recovery against `oracle`.
///
/// Fully sequential: one query index at a time, one oracle call at a time.
/// A reconciliation failure at any index aborts the campaign; every other
/// kind of noise is absorbed below this level.
pub fn run_campaign<O: ProbeOracle>(
    oracle: &mut O,
    params: &CampaignParams,
    rng: &mut impl Rng,
) -> Result<CampaignOutcome, CampaignError> {
    params.validate()?;
    let t0 = Instant::now();
    info!(%params, "starting recovery campaign");

    let xs: Vec<Fp> = (0..params.queries as u64).map(Fp::from_u64).collect();
    let mut a_values = Vec::with_capacity(params.queries);
    let mut votes = Vec::with_capacity(params.queries);
    let mut probes_per_index = Vec::with_capacity(params.queries);

    for &x in &xs {
        let mut counting = CountingProbe {
            inner: &mut *oracle,
            calls: 0,
        };
        let solution = reconcile(&mut counting, x, params.probe_budget)?;
        let vote = solution.b - x;
        info!(
            x = %x,
            a = %solution.a,
            b = %solution.b,
            vote = %vote,
            probes = counting.calls,
            "gate reconciled"
        );
        a_values.push(solution.a);
        votes.push(vote);
        probes_per_index.push(counting.calls);
    }

    let voted = majority_vote(&votes);
    info!(value = %voted, "out-of-band secret voted");

    let poly = Polynomial::interpolate(&xs, &a_values)?;
    let coeffs = poly.coeffs_padded(params.queries);
    let roots = extract_roots(&coeffs, params.secret_len - 1, rng)?;

    let mut secret: Vec<Fp> = roots.iter().map(|&r| -r).collect();
    secret.push(voted);
    if secret.len() != params.secret_len {
        return Err(CampaignError::VectorLengthMismatch {
            expected: params.secret_len,
            got: secret.len(),
        });
    }
    // Repeated secrets are a legitimate instance (the server checks a
    // multiset), but rare enough to be worth flagging.
    if has_repeats(&secret) {
        warn!("recovered vector contains repeated values");
    }

    let probes_total = probes_per_index.iter().sum();
    let report = CampaignReport {
        probes_per_index,
        probes_total,
        recover_ms: t0.elapsed().as_secs_f64() * 1000.0,
    };
    info!(
        probes = report.probes_total,
        elapsed_ms = report.recover_ms,
        "campaign complete"
    );
    Ok(CampaignOutcome { secret, report })
}

fn has_repeats(values: &[Fp]) -> bool {
    values
        .iter()
        .enumerate()
        .any(|(i, v)| values[..i].contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(x: u64) -> Fp {
        Fp::from_u64(x)
    }

    #[test]
    fn majority_wins_over_scattered_noise() {
        // Six agreeing votes against four distinct wrong ones.
        let votes = vec![
            fp(42),
            fp(1),
            fp(42),
            fp(2),
            fp(42),
            fp(3),
            fp(42),
            fp(4),
            fp(42),
            fp(42),
        ];
        assert_eq!(majority_vote(&votes), fp(42));
    }

    #[test]
    fn tie_breaks_toward_first_seen() {
        let votes = vec![fp(7), fp(9), fp(7), fp(9)];
        assert_eq!(majority_vote(&votes), fp(7));
        let votes = vec![fp(9), fp(7), fp(7), fp(9)];
        assert_eq!(majority_vote(&votes), fp(9));
    }

    #[test]
    fn single_vote_carries() {
        assert_eq!(majority_vote(&[fp(5)]), fp(5));
    }

    #[test]
    #[should_panic]
    fn empty_vote_panics() {
        majority_vote(&[]);
    }

    #[test]
    fn repeat_detection() {
        assert!(!has_repeats(&[fp(1), fp(2), fp(3)]));
        assert!(has_repeats(&[fp(1), fp(2), fp(1)]));
        assert!(!has_repeats(&[]));
    }
}
