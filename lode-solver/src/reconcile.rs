//! Probing loop for one query index: accumulate records until some
//! 3-subset yields a verified gate opening.

use itertools::Itertools;
use lode_field::Fp;
use lode_probe::{ProbeOracle, ProbeRecord};
use tracing::{debug, warn};

use crate::{solve_gate_system, GateSolution, SolveError};

/// Search the accumulated records for a 3-subset that solves and passes the
/// product check. Pure in the records; subsets are tried in combination
/// order and the first hit wins.
pub fn solve_from_records(records: &[ProbeRecord]) -> Option<GateSolution> {
    records
        .iter()
        .tuple_combinations()
        .find_map(|(r0, r1, r2)| solve_gate_system([r0, r1, r2]).ok())
}

/// Probe the oracle at `x` until a verified gate opening emerges.
///
/// Every probe attempt consumes one unit of budget whether it helped or
/// not: transport failures and degenerate zero-seed records are logged and
/// skipped, never refunded. The subset search runs after each accepted
/// record once three are available, so earlier corrupted records get
/// re-examined against every newcomer.
pub fn reconcile<O: ProbeOracle>(
    oracle: &mut O,
    x: Fp,
    probe_budget: u32,
) -> Result<GateSolution, SolveError> {
    let mut records: Vec<ProbeRecord> = Vec::new();
    for attempt in 1..=probe_budget {
        let record = match oracle.probe(x) {
            Ok(record) => record,
            Err(err) => {
                warn!(x = %x, attempt, %err, "probe attempt failed");
                continue;
            }
        };
        if record.seed == Fp::ZERO {
            debug!(x = %x, attempt, "dropping degenerate zero-seed record");
            continue;
        }
        records.push(record);
        if records.len() < 3 {
            continue;
        }
        if let Some(solution) = solve_from_records(&records) {
            debug!(x = %x, probes = attempt, "gate system reconciled");
            return Ok(solution);
        }
    }
    Err(SolveError::ReconciliationFailed {
        index: x.as_u64(),
        probes: probe_budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_probe::{FnProbe, ProbeError};
    use rand::Rng;
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};

    fn synth_record(rng: &mut impl Rng, a: Fp, b: Fp) -> ProbeRecord {
        let ka = Fp::random(rng);
        let kb = Fp::random(rng);
        let kc = Fp::random(rng);
        let delta = Fp::random(rng);
        let seed = Fp::random(rng);
        let a1 = kb * a + ka * b + delta * (a * b) - kc;
        ProbeRecord {
            seed,
            v: seed * a1,
            ka,
            kb,
            kc,
            delta,
        }
    }

    #[test]
    fn solve_from_records_skips_corrupted_prefix() {
        let mut rng = ChaCha20Rng::seed_from_u64(41);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        let mut records: Vec<ProbeRecord> = (0..5).map(|_| synth_record(&mut rng, a, b)).collect();
        records[0].v += Fp::ONE;
        records[1].v += Fp::ONE;
        let sol = solve_from_records(&records).unwrap();
        assert_eq!((sol.a, sol.b), (a, b));
    }

    #[test]
    fn solve_from_records_needs_three() {
        let mut rng = ChaCha20Rng::seed_from_u64(43);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        let records: Vec<ProbeRecord> = (0..2).map(|_| synth_record(&mut rng, a, b)).collect();
        assert!(solve_from_records(&records).is_none());
    }

    #[test]
    fn reconcile_survives_noise() {
        let mut rng = ChaCha20Rng::seed_from_u64(47);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        // Attempt 1 fails in transport, attempt 2 returns a zero seed,
        // attempt 3 is corrupted, the rest are clean.
        let mut scripted: Vec<Result<ProbeRecord, ProbeError>> = Vec::new();
        scripted.push(Err(ProbeError::Exhausted { attempts: 6 }));
        let mut zero_seed = synth_record(&mut rng, a, b);
        zero_seed.seed = Fp::ZERO;
        scripted.push(Ok(zero_seed));
        let mut corrupted = synth_record(&mut rng, a, b);
        corrupted.v += Fp::ONE;
        scripted.push(Ok(corrupted));
        for _ in 0..3 {
            scripted.push(Ok(synth_record(&mut rng, a, b)));
        }
        let total = scripted.len();
        let mut oracle = FnProbe::new(|_x| scripted.remove(0));
        let sol = reconcile(&mut oracle, Fp::from_u64(3), 8).unwrap();
        assert_eq!((sol.a, sol.b, sol.prod), (a, b, a * b));
        drop(oracle);
        assert_eq!(total - scripted.len(), 6);
    }

    #[test]
    fn reconcile_exhausts_budget_on_zero_seeds() {
        let mut rng = ChaCha20Rng::seed_from_u64(53);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        let mut template = synth_record(&mut rng, a, b);
        template.seed = Fp::ZERO;
        let mut calls = 0u32;
        let mut oracle = FnProbe::new(|_x| {
            calls += 1;
            Ok(template)
        });
        let err = reconcile(&mut oracle, Fp::from_u64(7), 4).unwrap_err();
        assert!(matches!(
            err,
            SolveError::ReconciliationFailed { index: 7, probes: 4 }
        ));
        drop(oracle);
        assert_eq!(calls, 4);
    }
}
