// session-repair-rs/src/main.rs
// Command line front end for the transcript repair engine.
// Scans session transcripts, reports corruption and optionally rewrites them.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use transcript_repair::discovery;
use transcript_repair::report::{render_fix, render_scan, SessionReport};
use transcript_repair::session::{self, SessionStatus};
use transcript_repair::{init_logging, RepairConfig, RepairError};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "session-repair",
    version,
    about = "Detect and repair corrupted session transcripts"
)]
struct Cli {
    /// Session file or directory of `.jsonl` files (default: the configured agent's sessions)
    #[arg(value_name = "PATH")]
    target: Option<PathBuf>,

    /// Apply repairs (default is a dry run)
    #[arg(long, default_value_t = false)]
    fix: bool,

    /// Show per-line details
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Scan every agent's sessions, not just the configured one
    #[arg(long, default_value_t = false)]
    all_agents: bool,

    /// Emit one JSON report per corrupted session instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn print_report(report: &SessionReport, text: String, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::error!(file = %report.file, error = %e, "Failed to encode report"),
        }
    } else {
        println!("{}\n", text);
    }
}

/// Returns the process exit status
fn run(cli: Cli, config: RepairConfig) -> anyhow::Result<u8> {
    let files = match discovery::discover(cli.target.as_deref(), &config, cli.all_agents) {
        Ok(files) => files,
        Err(RepairError::InvalidTarget(path)) => {
            eprintln!("ERROR: {} is not a file or directory.", path.display());
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    if files.is_empty() {
        println!("No session files found.");
        if cli.target.is_none() && !cli.all_agents {
            println!("  Looked in: {}", config.sessions_dir().display());
            println!("  Try --all-agents to scan all agent directories.");
        }
        return Ok(0);
    }

    if !cli.json {
        let mode = if cli.fix { "FIX" } else { "DRY-RUN (use --fix to apply)" };
        println!("Session Repair - {}", mode);
        println!("Scanning {} session file(s)...\n", files.len());
    }

    let mut corrupted = 0usize;
    for file in &files {
        let result = match session::fix(file, !cli.fix) {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "Failed to process session");
                eprintln!("  ERROR processing {}: {}", file.display(), e);
                continue;
            }
        };

        match &result.status {
            SessionStatus::Clean => {
                tracing::debug!(file = %file.display(), "Session clean");
            }
            SessionStatus::Scanned => {
                corrupted += 1;
                print_report(&result.report, render_scan(&result.report, cli.verbose), cli.json);
            }
            SessionStatus::Fixed { backup, outcome } => {
                corrupted += 1;
                let text = render_fix(&result.report, outcome, &backup.display().to_string());
                print_report(&result.report, text, cli.json);
            }
        }
    }

    if cli.json {
        return Ok(0);
    }
    if corrupted == 0 {
        println!("All sessions are clean. No corruption found.");
    } else {
        println!(
            "{} {} corrupted session(s).",
            if cli.fix { "Fixed" } else { "Found" },
            corrupted
        );
        if !cli.fix {
            println!("\nRun with --fix to apply repairs.");
        }
    }
    Ok(0)
}

fn main() -> anyhow::Result<ExitCode> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = RepairConfig::from_env()?;
    init_logging(&config.logging)?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("session_repair", %run_id, fix = cli.fix);
    let _guard = span.enter();
    Ok(ExitCode::from(run(cli, config)?))
}
