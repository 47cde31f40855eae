//! linecam Simulator CLI
//!
//! Run camera scenarios on a virtual clock, or replay a song fetched from
//! the line store.

use anyhow::{bail, Context};
use clap::Parser;
use linecam_core::{EngineConfig, Song, SongClient, SongSummary};
use linecam_env::{HttpTransport, TransportConfig};
use linecam_sim::{ScenarioId, ScenarioResult, ScenarioRunner, SimExport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// linecam camera engine simulator
#[derive(Parser, Debug)]
#[command(name = "linecam-sim")]
#[command(about = "Run deterministic camera scenarios for linecam", long_about = None)]
struct Args {
    /// Scenario to run (converge, handoff, nan_target, static_line, playback, song_replay, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Engine config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Line store base URL
    #[arg(long, env = "LINECAM_API_URL")]
    api_url: Option<String>,

    /// Fetch this song from the line store and replay it instead of running scenarios
    #[arg(long)]
    song: Option<i32>,

    /// List the songs in the line store and exit
    #[arg(long)]
    list_songs: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export frames of a single scenario (or the replayed song) to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let runner = ScenarioRunner::new().with_config(config);

    if args.list_songs || args.song.is_some() {
        let client = song_client(args.api_url.as_deref())?;
        let rt = tokio::runtime::Runtime::new()?;

        if args.list_songs {
            let songs: Vec<SongSummary> = rt.block_on(client.songs())?;
            for song in &songs {
                println!("{:>4}  {}", song.id, song.name);
            }
            return Ok(());
        }

        if let Some(id) = args.song {
            let song: Song = rt
                .block_on(client.song(id))
                .with_context(|| format!("fetching song {}", id))?;
            drop(rt);

            let (result, export) = runner.replay(&song);
            write_export(args.export.as_ref(), &export)?;
            report(&[result], args.json)?;
            return Ok(());
        }
    }

    if !args.json {
        info!("linecam simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse()?]
    };

    if let Some(path) = &args.export {
        if scenarios.len() > 1 {
            bail!("--export only supports a single scenario, not 'all'");
        }
        let (result, export) = runner.run_with_export(scenarios[0]);
        write_export(Some(path), &export)?;
        return report(&[result], args.json);
    }

    let results: Vec<ScenarioResult> = scenarios.iter().map(|s| runner.run(*s)).collect();
    report(&results, args.json)
}

fn song_client(api_url: Option<&str>) -> anyhow::Result<SongClient<HttpTransport>> {
    let mut config = TransportConfig::default();
    if let Some(url) = api_url {
        config.base_url = url.to_string();
    }
    let transport = HttpTransport::new(&config)
        .with_context(|| format!("invalid line store url {}", config.base_url))?;
    Ok(SongClient::new(Arc::new(transport)))
}

fn write_export(path: Option<&PathBuf>, export: &SimExport) -> anyhow::Result<()> {
    if let Some(path) = path {
        export
            .write_to_file(path)
            .with_context(|| format!("writing export {}", path.display()))?;
        info!("Exported {} frames to {}", export.frames.len(), path.display());
    }
    Ok(())
}

/// Prints the summary and exits non-zero if anything failed.
fn report(results: &[ScenarioResult], json: bool) -> anyhow::Result<()> {
    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed.len(),
            "failed": failed.len(),
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "drives_started": r.metrics.drives_started,
                    "drives_converged": r.metrics.drives_converged,
                    "drives_cancelled": r.metrics.drives_cancelled,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for result in results {
            if result.passed {
                info!(
                    "✓ {} PASSED ({} ticks, {:.1}s virtual)",
                    result.scenario.name(),
                    result.total_ticks,
                    result.final_time_secs
                );
            } else {
                error!(
                    "✗ {} FAILED: {}",
                    result.scenario.name(),
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", results.len());
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), results.len());
        }
    }

    // Exit with proper code for CI
    if !failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
