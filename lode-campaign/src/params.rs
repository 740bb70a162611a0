//! Typed campaign configuration.
//!
//! The problem shape is fixed by the leak (one probe binary, one masked
//! observation per run, a 10-value secret), so the knobs here are budgets
//! and timeouts, not algebra. `new` validates; the fields stay public so a
//! caller can still build a set by hand and [`CampaignParams::validate`] it.

use core::fmt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lode_probe::{
    DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_SUBMIT_TIMEOUT_SECS, DEFAULT_TRANSPORT_RETRIES,
};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParamsError {
    #[error("invalid parameter: {0}")]
    Invalid(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignParams {
    /// Query indices probed: x = 0, 1, ..., queries-1. Also the number of
    /// interpolation points, so it must equal `secret_len`.
    pub queries: usize,
    /// Length of the recovered secret vector: `secret_len - 1` roots plus
    /// one voted value.
    pub secret_len: usize,
    /// Oracle calls allowed per query index before giving up on it.
    pub probe_budget: u32,
    /// Transport-level retries inside a single oracle call.
    pub transport_retries: u32,
    /// timeout(1) guard around one probe run.
    pub probe_timeout_secs: u64,
    /// timeout(1) guard around the submission run.
    pub submit_timeout_secs: u64,
}

impl CampaignParams {
    pub fn new(
        queries: usize,
        secret_len: usize,
        probe_budget: u32,
        transport_retries: u32,
        probe_timeout_secs: u64,
        submit_timeout_secs: u64,
    ) -> Result<Self, ParamsError> {
        let params = Self {
            queries,
            secret_len,
            probe_budget,
            transport_retries,
            probe_timeout_secs,
            submit_timeout_secs,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.queries == 0 {
            return Err(ParamsError::Invalid("queries must be > 0"));
        }
        if self.secret_len < 2 {
            return Err(ParamsError::Invalid("secret_len must be >= 2"));
        }
        if self.queries != self.secret_len {
            return Err(ParamsError::Invalid("queries must equal secret_len"));
        }
        if self.probe_budget < 3 {
            return Err(ParamsError::Invalid("probe_budget must be >= 3"));
        }
        if self.transport_retries == 0 {
            return Err(ParamsError::Invalid("transport_retries must be > 0"));
        }
        if self.probe_timeout_secs == 0 {
            return Err(ParamsError::Invalid("probe_timeout_secs must be > 0"));
        }
        if self.submit_timeout_secs == 0 {
            return Err(ParamsError::Invalid("submit_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

impl Default for CampaignParams {
    /// The original tool's shape: 10 queries for a 10-value secret, 8
    /// probes per index, 6 transport retries, 420s/240s timeouts.
    fn default() -> Self {
        // new() validates; unwrap() is safe for a known-good preset.
        Self::new(
            10,
            10,
            8,
            DEFAULT_TRANSPORT_RETRIES,
            DEFAULT_PROBE_TIMEOUT_SECS,
            DEFAULT_SUBMIT_TIMEOUT_SECS,
        )
        .unwrap()
    }
}

impl fmt::Display for CampaignParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CampaignParams{{ queries={}, secret_len={}, probe_budget={}, retries={}, probe_timeout={}s, submit_timeout={}s }}",
            self.queries,
            self.secret_len,
            self.probe_budget,
            self.transport_retries,
            self.probe_timeout_secs,
            self.submit_timeout_secs
        )
    }
}
