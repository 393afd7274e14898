use std::collections::BTreeMap;
use std::io::{self, Write};
use std::thread;

use clap::Parser;
use gallery_service::{
    global, Capabilities, ConfigArgs, DefaultServiceFactory, ResolveState, ServiceName, Services,
};
use serde::Serialize;
use tracing::{info, Level};

/// Resolves the gallery services and reports their state and the index
/// capabilities.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Whether to log in JSON
    #[arg(long)]
    json: bool,

    #[arg(long)]
    log_level: Option<Level>,

    /// Resolve every service before anything else, failing on the first
    /// construction error.
    #[arg(long)]
    warm_up: bool,

    /// Number of threads concurrently asking for the index.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    #[command(flatten)]
    config: ConfigArgs,
}

/// What gets printed to stdout once the index resolved.
#[derive(Serialize)]
struct Report {
    states: BTreeMap<ServiceName, ResolveState>,
    capabilities: Capabilities,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    gallery_tracing::TracingBuilder::default()
        .level(cli.log_level.unwrap_or(Level::INFO))
        .json(cli.json)
        .build()?;

    let services = global::install(Services::new(DefaultServiceFactory::from_args(
        cli.config,
    ))?)?;

    if cli.warm_up {
        services.warm_up()?;
    }

    thread::scope(|s| {
        let handles: Vec<_> = (0..cli.threads.max(1))
            .map(|_| s.spawn(global::index))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("index resolver panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let index = global::index()?;
    info!(capabilities = ?index.capabilities(), "index ready");

    let report = Report {
        states: services.states(),
        capabilities: index.capabilities(),
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report)?;
    writeln!(stdout)?;

    Ok(())
}
