//! Boundary between the recovery pipeline and the two external binaries: the
//! probe, which runs one leaky proof evaluation and prints a JSON record, and
//! the submitter, which hands the recovered values to the server.
//!
//! Everything above this crate talks to the oracle through [`ProbeOracle`],
//! so the solver and campaign never see a subprocess.

use std::process::Command;

use lode_field::Fp;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Query index handed to the probe binary.
pub const ENV_QUERY: &str = "LODE_X";
/// Comma-joined guesses handed to the submission binary.
pub const ENV_GUESSES: &str = "LODE_GUESSES";
/// Optional service endpoint override, passed through to both binaries.
pub const ENV_HOST: &str = "LODE_HOST";
/// Default marker announcing a successful submission.
pub const SUCCESS_MARKER: &str = "flag{";

pub const DEFAULT_TRANSPORT_RETRIES: u32 = 6;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 420;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 240;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no usable probe record after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// One decoded oracle response.
///
/// The wire object also carries `X` (an echo of the query) and `U` (the
/// unused half of the leak); neither participates in the gate relation, so
/// they are dropped on parse. Field values are reduced mod p on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProbeRecord {
    pub seed: Fp,
    #[serde(rename = "V")]
    pub v: Fp,
    pub ka: Fp,
    pub kb: Fp,
    pub kc: Fp,
    pub delta: Fp,
}

/// Source of probe records for one query index.
pub trait ProbeOracle {
    fn probe(&mut self, x: Fp) -> Result<ProbeRecord, ProbeError>;
}

/// Closure-backed oracle for tests and simulation.
pub struct FnProbe<F>
where
    F: FnMut(Fp) -> Result<ProbeRecord, ProbeError>,
{
    f: F,
}

impl<F> FnProbe<F>
where
    F: FnMut(Fp) -> Result<ProbeRecord, ProbeError>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ProbeOracle for FnProbe<F>
where
    F: FnMut(Fp) -> Result<ProbeRecord, ProbeError>,
{
    fn probe(&mut self, x: Fp) -> Result<ProbeRecord, ProbeError> {
        (self.f)(x)
    }
}

/// Pick the record out of one output burst.
///
/// The probe chats before printing its record ("connected", banner noise),
/// and a flaky service can leave partial lines behind, so the last line that
/// both looks like JSON and parses as a record wins.
pub fn extract_record(output: &str) -> Option<ProbeRecord> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

/// Probe oracle backed by an external binary.
///
/// Runs the program through `bash -lc` under a `timeout(1)` guard with
/// stderr folded into stdout, passing the query index in [`ENV_QUERY`]. A
/// nonzero exit can still carry the record line, so every burst is mined;
/// an attempt without a usable record is retried up to the transport budget.
pub struct CommandProbe {
    program: String,
    host: Option<String>,
    retries: u32,
    timeout_secs: u64,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            host: None,
            retries: DEFAULT_TRANSPORT_RETRIES,
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn run_once(&self, x: Fp) -> Result<String, ProbeError> {
        let output = guarded_command(&self.program, self.timeout_secs)
            .env(ENV_QUERY, x.as_u64().to_string())
            .envs(self.host.iter().map(|h| (ENV_HOST, h.as_str())))
            .output()
            .map_err(|source| ProbeError::Io {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            debug!(status = %output.status, "probe exited nonzero");
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ProbeOracle for CommandProbe {
    fn probe(&mut self, x: Fp) -> Result<ProbeRecord, ProbeError> {
        for attempt in 1..=self.retries {
            let burst = self.run_once(x)?;
            if let Some(record) = extract_record(&burst) {
                return Ok(record);
            }
            warn!(x = %x, attempt, "probe produced no record line");
        }
        Err(ProbeError::Exhausted {
            attempts: self.retries,
        })
    }
}

/// Sink for the recovered values.
pub trait Submitter {
    fn submit(&mut self, values: &[Fp]) -> Result<String, ProbeError>;
}

/// Submitter backed by an external binary; guesses travel comma-joined in
/// [`ENV_GUESSES`]. Returns the full output text, which the caller checks
/// for the success marker.
pub struct CommandSubmit {
    program: String,
    host: Option<String>,
    timeout_secs: u64,
}

impl CommandSubmit {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            host: None,
            timeout_secs: DEFAULT_SUBMIT_TIMEOUT_SECS,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Submitter for CommandSubmit {
    fn submit(&mut self, values: &[Fp]) -> Result<String, ProbeError> {
        let output = guarded_command(&self.program, self.timeout_secs)
            .env(ENV_GUESSES, format_guesses(values))
            .env(ENV_QUERY, "0")
            .envs(self.host.iter().map(|h| (ENV_HOST, h.as_str())))
            .output()
            .map_err(|source| ProbeError::Io {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            warn!(status = %output.status, "submit exited nonzero");
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Comma-joined guesses in the format the submission binary reads.
pub fn format_guesses(values: &[Fp]) -> String {
    values
        .iter()
        .map(|v| v.as_u64().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Whether the submission outcome text announces success.
pub fn outcome_is_success(output: &str, marker: &str) -> bool {
    output.contains(marker)
}

fn guarded_command(program: &str, timeout_secs: u64) -> Command {
    let mut cmd = Command::new("bash");
    cmd.arg("-lc")
        .arg(format!("exec 2>&1; timeout {timeout_secs}s {program}"));
    cmd
}
