use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use lode_campaign::{run_campaign, CampaignParams};
use lode_field::Fp;
use lode_probe::{
    outcome_is_success, CommandProbe, CommandSubmit, Submitter, DEFAULT_PROBE_TIMEOUT_SECS,
    DEFAULT_SUBMIT_TIMEOUT_SECS, DEFAULT_TRANSPORT_RETRIES, SUCCESS_MARKER,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lode", version, about = "Recover a hidden vector from a faulty proof oracle", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the recovery campaign and print the ten values, one per line
    Recover {
        #[command(flatten)]
        probe: ProbeArgs,
        /// Remote host:port exported to the probe binary
        #[arg(long)]
        host: Option<String>,
        /// Also write the recovered values to this file, one per line
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Submit values through the submit binary and check for the success marker
    Submit {
        #[command(flatten)]
        submit: SubmitArgs,
        /// Remote host:port exported to the submit binary
        #[arg(long)]
        host: Option<String>,
        /// Values to submit as a comma-separated list
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        values: Option<String>,
        /// File with one value per line
        #[arg(long = "in", value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Recover the vector, then submit it (the full end-to-end flow)
    Run {
        #[command(flatten)]
        probe: ProbeArgs,
        #[command(flatten)]
        submit: SubmitArgs,
        /// Remote host:port exported to both binaries
        #[arg(long)]
        host: Option<String>,
        /// Also write the recovered values to this file, one per line
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ProbeArgs {
    /// Path to the probe binary oracle queries run through
    #[arg(long = "probe-bin")]
    probe_bin: String,
    /// Probes spent per index before the campaign gives up
    #[arg(long = "probe-budget", default_value_t = CampaignParams::default().probe_budget)]
    probe_budget: u32,
    /// Transport retries inside a single probe
    #[arg(long = "retries", default_value_t = DEFAULT_TRANSPORT_RETRIES)]
    retries: u32,
    /// Timeout for one probe invocation, in seconds
    #[arg(long = "probe-timeout", default_value_t = DEFAULT_PROBE_TIMEOUT_SECS)]
    probe_timeout: u64,
}

#[derive(Args, Debug)]
struct SubmitArgs {
    /// Path to the submit binary guesses are sent through
    #[arg(long = "submit-bin")]
    submit_bin: String,
    /// Success marker looked for in the submit output
    #[arg(long = "marker", default_value = SUCCESS_MARKER)]
    marker: String,
    /// Timeout for the submit invocation, in seconds
    #[arg(long = "submit-timeout", default_value_t = DEFAULT_SUBMIT_TIMEOUT_SECS)]
    submit_timeout: u64,
}

fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the recovered values.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Recover { probe, host, out } => {
            cmd_recover(probe, host, out)?;
            Ok(())
        }
        Commands::Submit {
            submit,
            host,
            values,
            input,
        } => {
            let values = load_values(values, input)?;
            cmd_submit(submit, host, &values)
        }
        Commands::Run {
            probe,
            submit,
            host,
            out,
        } => {
            let secret = cmd_recover(probe, host.clone(), out)?;
            cmd_submit(submit, host, &secret)
        }
    }
}

fn cmd_recover(probe: ProbeArgs, host: Option<String>, out: Option<PathBuf>) -> Result<Vec<Fp>> {
    let params = CampaignParams {
        probe_budget: probe.probe_budget,
        transport_retries: probe.retries,
        probe_timeout_secs: probe.probe_timeout,
        ..CampaignParams::default()
    };
    params.validate()?;

    info!(program = %probe.probe_bin, host = ?host, "probing through command oracle");
    let mut oracle = CommandProbe::new(probe.probe_bin)
        .with_retries(params.transport_retries)
        .with_timeout_secs(params.probe_timeout_secs);
    if let Some(host) = host {
        oracle = oracle.with_host(host);
    }

    let outcome = run_campaign(&mut oracle, &params, &mut rand::rng())?;

    let lines = outcome
        .secret
        .iter()
        .map(|v| v.as_u64().to_string())
        .collect::<Vec<_>>()
        .join("\n");
    println!("{lines}");
    if let Some(path) = out {
        fs::write(&path, format!("{lines}\n"))?;
        info!(path = %path.display(), "wrote recovered values");
    }
    Ok(outcome.secret)
}

fn cmd_submit(args: SubmitArgs, host: Option<String>, values: &[Fp]) -> Result<()> {
    let mut submitter = CommandSubmit::new(args.submit_bin).with_timeout_secs(args.submit_timeout);
    if let Some(host) = host {
        submitter = submitter.with_host(host);
    }

    info!(count = values.len(), "submitting guesses");
    let outcome = submitter.submit(values)?;
    println!("{}", outcome.trim_end());

    if !outcome_is_success(&outcome, &args.marker) {
        anyhow::bail!("submit output does not contain the marker {:?}", args.marker);
    }
    info!("success marker found");
    Ok(())
}

fn load_values(values: Option<String>, input: Option<PathBuf>) -> Result<Vec<Fp>> {
    let parsed = if let Some(csv) = values {
        parse_values(csv.split(','))?
    } else if let Some(path) = input {
        let text = fs::read_to_string(&path)?;
        parse_values(text.lines())?
    } else {
        anyhow::bail!("one of --values or --in is required");
    };
    anyhow::ensure!(!parsed.is_empty(), "no values to submit");
    Ok(parsed)
}

fn parse_values<'a>(tokens: impl Iterator<Item = &'a str>) -> Result<Vec<Fp>> {
    tokens
        .map(str::trim)
        .filter(|tok| !tok.is_empty())
        .map(|tok| {
            let raw: u64 = tok
                .parse()
                .map_err(|_| anyhow::anyhow!("not a field value: {tok:?}"))?;
            Ok(Fp::from_u64(raw))
        })
        .collect()
}
