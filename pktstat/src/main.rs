//! # pktstat - Main Entry Point
//!
//! Parses flags, runs the pre-flight checks, opens the capture backend and
//! drives one session to its final report.
//!
//! Reports go to stdout; diagnostics go to stderr through `env_logger`
//! (`RUST_LOG=info` for lifecycle messages).

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::io::{self, BufWriter};

use pktstat::aggregation::CaptureEnd;
use pktstat::capture::{Backend, FrameSource};
use pktstat::cli::Args;
use pktstat::domain::{CaptureError, OutputMode};
use pktstat::export::render;
use pktstat::lifecycle::{run_session, spawn_signal_watcher, Shutdown};
use pktstat::preflight::run_preflight_checks;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<CaptureError>() {
        Some(CaptureError::PermissionDenied(_)) => EXIT_NOPERM,
        Some(e) if e.is_config() => EXIT_USAGE,
        _ => EXIT_ERROR,
    }
}

fn print_report(report: &pktstat::analysis::Report, mode: OutputMode) {
    let mut out = BufWriter::new(io::stdout().lock());
    if let Err(e) = render(report, mode, &mut out) {
        warn!("Failed to write report: {e}");
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let config = args.capture_config();
    let settings = args.run_settings();

    run_preflight_checks(&config)?;

    info!("Starting on interface {:?}", config.interface);
    let source = Backend::open(&config)
        .with_context(|| format!("Failed to open capture on {}", config.interface))?;
    info!("Capture backend: {} (link type {:?})", source.name(), source.link_type());

    let shutdown = Shutdown::new();
    let _signals = spawn_signal_watcher(shutdown.clone());

    let output = settings.output;
    let outcome = run_session(source, &settings, shutdown, |report| print_report(report, output))
        .await
        .context("Capture session failed")?;

    print_report(&outcome.report, output);

    let capture = outcome.capture;
    info!(
        "Session ended by {}: {} frames accepted, {} rejected",
        outcome.reason, capture.accepted, capture.rejected
    );

    match capture.end {
        CaptureEnd::Failed(e) => Err(anyhow::Error::new(e).context("Capture ended early")),
        CaptureEnd::Cancelled | CaptureEnd::SourceClosed | CaptureEnd::QueueClosed => Ok(()),
    }
}
