use anyhow::Context;
use clap::Parser;
use generator::profile::{build_dataset, write_dataset, GeneratorConfig};
use gui_bridge::bridge::{default_bind_address, GuiBridge};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use tourcore::dataset::fallback_table;
use tourcore::model::DatasetTable;
use workflow::config::SessionConfig;
use workflow::runner::SessionRunner;

mod generator;
mod gui_bridge;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Headless reader-session driver for the tourism story page")]
struct Args {
    /// Load a session (story config + scripted steps) from YAML
    #[arg(long)]
    session: Option<PathBuf>,
    /// Monthly dataset JSON; the built-in fallback tables are used when absent
    #[arg(long)]
    dataset: Option<PathBuf>,
    #[arg(long, default_value_t = 3000)]
    playback_ms: u64,
    /// Simulated fetch latencies in ms, used round-robin
    #[arg(long, value_delimiter = ',')]
    latency_ms: Vec<u64>,
    /// Write a synthetic dataset to this path before running
    #[arg(long)]
    emit_dataset: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Append the session report (JSON lines) to this file
    #[arg(long)]
    report: Option<PathBuf>,
    /// Keep the HTTP bridge alive for the visualizer
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long, default_value_t = default_bind_address())]
    bind: SocketAddr,
}

fn load_served_dataset(path: Option<&PathBuf>) -> anyhow::Result<DatasetTable> {
    match path {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading dataset {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("parsing dataset {}", path.display()))
        }
        None => Ok(fallback_table()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut session = if let Some(path) = args.session {
        SessionConfig::load(path)?
    } else {
        SessionConfig::from_args(args.playback_ms, args.latency_ms.clone(), args.dataset.clone())
    };

    if let Some(path) = &args.emit_dataset {
        let generator = GeneratorConfig {
            seed: args.seed,
            ..Default::default()
        };
        let table = build_dataset(&generator, &session.story.cities, &session.story.timeline());
        write_dataset(&table, path)?;
        println!("Synthetic dataset with {} periods -> {}", table.len(), path.display());
        if session.dataset.is_none() {
            session.dataset = Some(path.clone());
        }
    }

    let runtime = TokioBuilder::new_current_thread()
        .enable_all()
        .build()
        .context("creating session runtime")?;

    let runner = SessionRunner::new(session.clone());
    let report = runtime.block_on(runner.run())?;

    println!(
        "Session -> steps {}, period {}, mode {:?}, highlighted {}, fetches {} (stale {}, fallback {})",
        report.steps_run,
        report.model.period_label.as_deref().unwrap_or("-"),
        report.model.mode,
        report.model.highlighted.as_deref().unwrap_or("-"),
        report.metrics.fetches_issued,
        report.metrics.stale_discarded,
        report.metrics.fallbacks_served
    );
    for banner in &report.banners {
        println!("Banner: {}", banner);
    }

    if let Some(report_path) = &args.report {
        if let Some(parent) = report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(report_path)
            .with_context(|| format!("opening report {}", report_path.display()))?;
        let line = serde_json::to_string(&report).context("serializing session report")?;
        writeln!(file, "{}", line)?;
    }

    if args.serve {
        let dataset = load_served_dataset(session.dataset.as_ref())?;
        let gui_bridge = GuiBridge::serve(args.bind, dataset);
        gui_bridge.publish(&report.model)?;
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
