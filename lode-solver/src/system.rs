//! The 3x3 linear system one gate induces on `(a, b, prod)`.

use lode_field::Fp;
use lode_probe::ProbeRecord;

use crate::SolveError;

/// One linear relation in the unknowns `(a, b, prod)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Equation {
    pub row: [Fp; 3],
    pub rhs: Fp,
}

/// A verified gate opening: `prod` has passed the `a * b` check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSolution {
    pub a: Fp,
    pub b: Fp,
    pub prod: Fp,
}

/// Build the relation `kb*a + ka*b + delta*prod = A1 + kc` contributed by
/// one record. The leaked wire value is `A1 = v * seed^-1`; a zero seed
/// means the record carries no information and is rejected here.
pub fn assemble_equation(record: &ProbeRecord) -> Result<Equation, SolveError> {
    let a1 = record.v * record.seed.inverse()?;
    Ok(Equation {
        row: [record.kb, record.ka, record.delta],
        rhs: a1 + record.kc,
    })
}

/// Gauss-Jordan elimination over the field.
///
/// The pivot is the first nonzero entry at or below the current row; exact
/// arithmetic has no rounding, so magnitude-based pivot selection would be
/// meaningless. No pivot in some column means the matrix is singular.
pub fn solve_3x3(mut rows: [[Fp; 3]; 3], mut rhs: [Fp; 3]) -> Result<[Fp; 3], SolveError> {
    for col in 0..3 {
        let pivot = (col..3)
            .find(|&i| rows[i][col] != Fp::ZERO)
            .ok_or(SolveError::Singular)?;
        rows.swap(col, pivot);
        rhs.swap(col, pivot);

        let inv = rows[col][col].inverse()?;
        for j in col..3 {
            rows[col][j] *= inv;
        }
        rhs[col] *= inv;

        for i in 0..3 {
            if i == col {
                continue;
            }
            let factor = rows[i][col];
            if factor == Fp::ZERO {
                continue;
            }
            for j in col..3 {
                let scaled = factor * rows[col][j];
                rows[i][j] -= scaled;
            }
            let scaled = factor * rhs[col];
            rhs[i] -= scaled;
        }
    }
    Ok(rhs)
}

/// Solve one gate from exactly three records, then verify the quadratic
/// side condition `a * b == prod` that the linear system cannot see.
pub fn solve_gate_system(records: [&ProbeRecord; 3]) -> Result<GateSolution, SolveError> {
    let mut rows = [[Fp::ZERO; 3]; 3];
    let mut rhs = [Fp::ZERO; 3];
    for (i, record) in records.iter().enumerate() {
        let eq = assemble_equation(record)?;
        rows[i] = eq.row;
        rhs[i] = eq.rhs;
    }
    let [a, b, prod] = solve_3x3(rows, rhs)?;
    if a * b != prod {
        return Err(SolveError::Inconsistent);
    }
    Ok(GateSolution { a, b, prod })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lode_field::Fp;
    use rand::Rng;
    use rand_chacha::{rand_core::SeedableRng, ChaCha20Rng};

    fn fp(x: u64) -> Fp {
        Fp::from_u64(x)
    }

    #[test]
    fn solve_3x3_identity() {
        let rows = [
            [Fp::ONE, Fp::ZERO, Fp::ZERO],
            [Fp::ZERO, Fp::ONE, Fp::ZERO],
            [Fp::ZERO, Fp::ZERO, Fp::ONE],
        ];
        let rhs = [fp(4), fp(5), fp(6)];
        assert_eq!(solve_3x3(rows, rhs).unwrap(), rhs);
    }

    #[test]
    fn solve_3x3_needs_row_swap() {
        // First column starts with a zero pivot.
        let rows = [
            [Fp::ZERO, Fp::ONE, Fp::ZERO],
            [Fp::ONE, Fp::ZERO, Fp::ZERO],
            [Fp::ZERO, Fp::ZERO, Fp::ONE],
        ];
        let rhs = [fp(5), fp(4), fp(6)];
        assert_eq!(solve_3x3(rows, rhs).unwrap(), [fp(4), fp(5), fp(6)]);
    }

    #[test]
    fn solve_3x3_recovers_random_solutions() {
        let mut rng = ChaCha20Rng::seed_from_u64(17);
        for _ in 0..20 {
            let rows: [[Fp; 3]; 3] =
                std::array::from_fn(|_| std::array::from_fn(|_| Fp::random(&mut rng)));
            let x: [Fp; 3] = std::array::from_fn(|_| Fp::random(&mut rng));
            let rhs: [Fp; 3] = std::array::from_fn(|i| {
                rows[i][0] * x[0] + rows[i][1] * x[1] + rows[i][2] * x[2]
            });
            match solve_3x3(rows, rhs) {
                Ok(got) => assert_eq!(got, x),
                Err(SolveError::Singular) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn solve_3x3_detects_singular() {
        // Row 1 is twice row 0.
        let rows = [
            [fp(1), fp(2), fp(3)],
            [fp(2), fp(4), fp(6)],
            [Fp::ZERO, Fp::ZERO, Fp::ONE],
        ];
        let rhs = [fp(1), fp(2), fp(3)];
        assert!(matches!(solve_3x3(rows, rhs), Err(SolveError::Singular)));
    }

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
    fn gate_system_recovers_inputs() {
        let mut rng = ChaCha20Rng::seed_from_u64(29);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        let records: [ProbeRecord; 3] = std::array::from_fn(|_| synth_record(&mut rng, a, b));
        let sol = solve_gate_system([&records[0], &records[1], &records[2]]).unwrap();
        assert_eq!(sol.a, a);
        assert_eq!(sol.b, b);
        assert_eq!(sol.prod, a * b);
    }

    #[test]
    fn gate_system_rejects_corrupted_record() {
        let mut rng = ChaCha20Rng::seed_from_u64(31);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        let mut records: [ProbeRecord; 3] = std::array::from_fn(|_| synth_record(&mut rng, a, b));
        records[1].v += Fp::ONE;
        let got = solve_gate_system([&records[0], &records[1], &records[2]]);
        assert!(matches!(got, Err(SolveError::Inconsistent)));
    }

    #[test]
    fn gate_system_rejects_zero_seed() {
        let mut rng = ChaCha20Rng::seed_from_u64(37);
        let a = Fp::random(&mut rng);
        let b = Fp::random(&mut rng);
        let mut records: [ProbeRecord; 3] = std::array::from_fn(|_| synth_record(&mut rng, a, b));
        records[0].seed = Fp::ZERO;
        let got = solve_gate_system([&records[0], &records[1], &records[2]]);
        assert!(matches!(got, Err(SolveError::Field(_))));
    }
}
