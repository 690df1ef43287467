use crate::evaluate;
use crate::metrics;
use crate::model::{
    CycleInterval, MeasurementResult, Phase, RunConfig, RunMode, TestRecord,
    DEFAULT_MONITOR_DURATION,
};
use crate::profiles::{self, ProfileCategory};
use crate::report::{self, ReportContext};
use crate::runner::{TestRunner, TICK};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::io::Write;
use std::time::{Duration, Instant};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// One measurement cycle with an immediate verdict
    Quick,
    /// Repeated cycles under a total duration budget
    Monitor,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Quick => RunMode::Quick,
            ModeArg::Monitor => RunMode::Monitoring,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "speedsim",
    version,
    about = "Synthetic speed test simulator with optional TUI"
)]
pub struct Cli {
    /// Run mode
    #[arg(long, value_enum, default_value = "quick")]
    pub mode: ModeArg,

    /// Measurement profile id (see --list-profiles); defaults per mode
    #[arg(long)]
    pub profile: Option<String>,

    /// Server id the simulated run reports against (display only)
    #[arg(long, default_value = "auto")]
    pub server: String,

    /// Total monitoring duration (e.g. 60m, 4h); defaults to the profile's
    #[arg(long)]
    pub duration: Option<humantime::Duration>,

    /// Pause between monitoring cycles (0s = continuous); defaults to the profile's
    #[arg(long)]
    pub interval: Option<humantime::Duration>,

    /// Include the download measurement
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub measure_download: bool,

    /// Include the upload measurement
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub measure_upload: bool,

    /// Include the latency measurement
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub measure_latency: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Print the JSON result and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// List available profiles and servers, then exit
    #[arg(long)]
    pub list_profiles: bool,

    /// Write the plain-text diagnostic report here after a monitoring run
    #[arg(long)]
    pub export_report: Option<std::path::PathBuf>,

    /// Seed for the measurement synthesizer (reproducible runs)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Automatically start a test when the TUI launches
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub test_on_launch: bool,
}

pub async fn run(args: Cli) -> Result<()> {
    if args.list_profiles {
        print_catalog();
        return Ok(());
    }

    if args.export_report.is_some() && args.mode == ModeArg::Quick {
        return Err(anyhow::anyhow!(
            "--export-report requires --mode monitor; a quick run keeps no history"
        ));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    if args.json {
        return run_json(args).await;
    }

    run_text(args).await
}

/// Resolve CLI arguments into a run mode and a normalized `RunConfig`.
pub(crate) fn build_config(args: &Cli) -> Result<(RunMode, RunConfig)> {
    let mode = RunMode::from(args.mode);

    let profile = match args.profile.as_deref() {
        Some(id) => profiles::find(id)
            .with_context(|| format!("unknown profile id: {id} (see --list-profiles)"))?,
        None => profiles::default_for(mode),
    };
    if profiles::find_server(&args.server).is_none() {
        return Err(anyhow::anyhow!(
            "unknown server id: {} (see --list-profiles)",
            args.server
        ));
    }

    let duration = args.duration.map(Duration::from).unwrap_or(profile.duration);
    let duration = if duration.is_zero() {
        DEFAULT_MONITOR_DURATION
    } else {
        duration
    };
    let interval = match args.interval {
        Some(d) => CycleInterval::from_user_input(d.into()),
        None => profile.interval,
    };

    Ok((
        mode,
        RunConfig {
            server_id: args.server.clone(),
            profile_id: profile.id.to_string(),
            measure_download: args.measure_download,
            measure_upload: args.measure_upload,
            measure_latency: args.measure_latency,
            duration,
            interval,
        },
    ))
}

/// Construct the runner, seeded when the user asked for a reproducible run.
pub(crate) fn make_runner(args: &Cli, cfg: RunConfig, mode: RunMode) -> TestRunner {
    match args.seed {
        Some(seed) => TestRunner::with_rng(cfg, mode, StdRng::seed_from_u64(seed)),
        None => TestRunner::new(cfg, mode),
    }
}

fn print_catalog() {
    println!("Profiles:");
    for mode in [RunMode::Quick, RunMode::Monitoring] {
        for p in profiles::for_mode(mode) {
            println!(
                "  {:<18} {:<24} [{:?}] {} ({}, {})",
                p.id,
                p.name,
                p.connection,
                p.description,
                humantime::format_duration(p.duration),
                p.interval
            );
        }
    }
    println!("Servers:");
    for s in profiles::SERVERS {
        println!(
            "  {:<18} {:<24} {} ({} km)",
            s.id, s.name, s.location, s.distance_km
        );
    }
}

fn profile_display_names(cfg: &RunConfig) -> (&'static str, &'static str) {
    let profile_name = profiles::find(&cfg.profile_id)
        .map(|p| p.name)
        .unwrap_or("Custom");
    let server_name = profiles::find_server(&cfg.server_id)
        .map(|s| s.name)
        .unwrap_or("Unknown");
    (profile_name, server_name)
}

fn category_of(cfg: &RunConfig) -> ProfileCategory {
    profiles::find(&cfg.profile_id)
        .map(|p| p.category)
        .unwrap_or(ProfileCategory::General)
}

async fn run_text(args: Cli) -> Result<()> {
    let (mode, cfg) = build_config(&args)?;
    let (profile_name, server_name) = profile_display_names(&cfg);
    let mut runner = make_runner(&args, cfg.clone(), mode);
    let (out_tx, out_handle) = spawn_output_writer();

    runner.start(Instant::now());
    let mut ticker = tokio::time::interval(TICK);
    let mut last_phase = Phase::Idle;
    let mut seen_records = 0usize;
    let mut dl_points: Vec<f64> = Vec::new();
    let mut ul_points: Vec<f64> = Vec::new();

    loop {
        ticker.tick().await;
        runner.tick(Instant::now());

        let phase = runner.phase();
        if phase != last_phase {
            let _ = out_tx.send(OutputLine::Stderr(format!("== {} ==", phase.label())));
            last_phase = phase;
        }
        match phase {
            Phase::Download => dl_points.push(runner.current_mbps()),
            Phase::Upload => ul_points.push(runner.current_mbps()),
            _ => {}
        }
        for record in &runner.records()[seen_records..] {
            let _ = out_tx.send(OutputLine::Stderr(format!(
                "Cycle {}: ping {:.0} ms, down {:.1} Mb/s, up {:.1} Mb/s [{}]",
                record.id + 1,
                record.ping_ms,
                record.download_mbps,
                record.upload_mbps,
                record.status
            )));
        }
        seen_records = runner.records().len();

        if !runner.is_running() {
            break;
        }
    }

    if let Some((mean, median, p25, p75)) = metrics::compute_metrics(&dl_points) {
        let _ = out_tx.send(OutputLine::Stdout(format!(
            "Download: avg {:.2} med {:.2} p25 {:.2} p75 {:.2} Mb/s",
            mean, median, p25, p75
        )));
    }
    if let Some((mean, median, p25, p75)) = metrics::compute_metrics(&ul_points) {
        let _ = out_tx.send(OutputLine::Stdout(format!(
            "Upload:   avg {:.2} med {:.2} p25 {:.2} p75 {:.2} Mb/s",
            mean, median, p25, p75
        )));
    }

    match mode {
        RunMode::Quick => {
            let results = runner.results();
            let _ = out_tx.send(OutputLine::Stdout(format!(
                "Latency: {:.0} ms (jitter {:.1} ms, loss {:.2}%)",
                results.ping_ms, results.jitter_ms, results.loss_pct
            )));
            let _ = out_tx.send(OutputLine::Stdout(evaluate::evaluate_quick_test(
                results,
                category_of(&cfg),
            )));
        }
        RunMode::Monitoring => {
            let summary = evaluate::summarize_records(runner.records(), profile_name);
            let ctx = ReportContext {
                profile_name,
                server_name,
                config: &cfg,
            };
            let text = report::build_report(runner.records(), &ctx, &summary);
            if let Some(path) = args.export_report.as_deref() {
                report::write_report(path, &text)?;
                let _ = out_tx.send(OutputLine::Stderr(format!(
                    "Report written: {}",
                    path.display()
                )));
            }
            let _ = out_tx.send(OutputLine::Stdout(text));
        }
    }

    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

#[derive(Serialize)]
struct QuickRunOutput<'a> {
    timestamp_utc: String,
    config: &'a RunConfig,
    results: MeasurementResult,
    verdict: String,
}

#[derive(Serialize)]
struct MonitorRunOutput<'a> {
    timestamp_utc: String,
    config: &'a RunConfig,
    records: &'a [TestRecord],
    summary: String,
}

async fn run_json(args: Cli) -> Result<()> {
    let (mode, cfg) = build_config(&args)?;
    let (profile_name, server_name) = profile_display_names(&cfg);
    let mut runner = make_runner(&args, cfg.clone(), mode);

    runner.start(Instant::now());
    let mut ticker = tokio::time::interval(TICK);
    while runner.is_running() {
        ticker.tick().await;
        runner.tick(Instant::now());
    }

    let timestamp_utc = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "now".into());

    let out = match mode {
        RunMode::Quick => {
            let results = *runner.results();
            let verdict = evaluate::evaluate_quick_test(&results, category_of(&cfg));
            serde_json::to_string_pretty(&QuickRunOutput {
                timestamp_utc,
                config: &cfg,
                results,
                verdict,
            })?
        }
        RunMode::Monitoring => {
            let summary = evaluate::summarize_records(runner.records(), profile_name);
            if let Some(path) = args.export_report.as_deref() {
                let ctx = ReportContext {
                    profile_name,
                    server_name,
                    config: &cfg,
                };
                let text = report::build_report(runner.records(), &ctx, &summary);
                report::write_report(path, &text)?;
            }
            serde_json::to_string_pretty(&MonitorRunOutput {
                timestamp_utc,
                config: &cfg,
                records: runner.records(),
                summary,
            })?
        }
    };

    println!("{}", out);
    Ok(())
}
