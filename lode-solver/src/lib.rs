//! Exact recovery of one multiplication gate from leaked probe records.
//!
//! Each probe run leaks one masked linear observation of the gate inputs
//! `(a, b)` and their product. Three independent observations pin the triple
//! down exactly; the product check `a * b == prod` then rejects triples
//! built from corrupted records. [`reconcile`] drives the probing loop for a
//! single query index under a fixed budget.

pub mod reconcile;
pub mod system;

pub use reconcile::{reconcile, solve_from_records};
pub use system::{assemble_equation, solve_3x3, solve_gate_system, Equation, GateSolution};

use lode_field::FieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("coefficient matrix is singular")]
    Singular,
    #[error("solution fails the product check: prod != a*b")]
    Inconsistent,
    #[error("no consistent gate system for X={index} within {probes} probes")]
    ReconciliationFailed { index: u64, probes: u32 },
}
