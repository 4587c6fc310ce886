//! rpcbench: measure how many JSON-RPC requests per second a
//! newline-delimited TCP server sustains.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;

use rpcbench::loadtest::engine::{handle_ctrl_c, LoadTestEngine};
use rpcbench::loadtest::report::BenchmarkReport;
use rpcbench::loadtest::summary::{render_plain, render_summary};
use rpcbench::{LoadTestError, Settings};

/// Throughput benchmark for newline-delimited JSON-RPC servers
#[derive(Parser, Debug)]
#[command(name = "rpcbench")]
#[command(about = "Benchmark a line-delimited JSON-RPC server over TCP", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML file with benchmark settings (flags override its values)
    #[arg(long, env = "RPCBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Server host name or address
    #[arg(long)]
    host: Option<String>,

    /// Server port
    #[arg(long)]
    port: Option<u16>,

    /// Number of concurrent connections
    #[arg(long, short = 'c')]
    connections: Option<u32>,

    /// Benchmark duration in seconds
    #[arg(long, short = 'd', allow_negative_numbers = true)]
    duration: Option<f64>,

    /// Per-request response timeout in seconds
    #[arg(long, short = 't', allow_negative_numbers = true)]
    timeout: Option<f64>,

    /// JSON-RPC method sent in every request
    #[arg(long, short = 'm')]
    method: Option<String>,

    /// JSON-RPC params as raw JSON text, e.g. '[1,2]'
    #[arg(long, short = 'p')]
    params: Option<String>,

    /// Longest accepted response line in bytes
    #[arg(long)]
    max_line_bytes: Option<usize>,

    /// Output format for the results
    #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `key=value` lines
    Plain,
    /// Colored summary with latency percentiles
    Human,
    /// Schema-versioned JSON report
    Json,
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(exit_status(&e))
        },
    }
}

/// Invalid configuration exits with 2, any other failure with 1.
fn exit_status(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<LoadTestError>().is_some() {
        2
    } else {
        1
    }
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    // Step 1: Load settings
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => Settings::default(),
    };

    // Step 2: Apply CLI overrides
    apply_overrides(&mut settings, &cli);

    // Step 3: Run the benchmark (settings are validated before any connection)
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let shutdown = CancellationToken::new();
    let engine = LoadTestEngine::new(settings).with_shutdown(shutdown.clone());

    let summary = runtime.block_on(async {
        tokio::spawn(handle_ctrl_c(shutdown));
        engine.run().await
    })?;

    // Step 4: Report
    if cli.no_color || !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let output = match cli.format {
        OutputFormat::Plain => render_plain(&summary),
        OutputFormat::Human => render_summary(&summary),
        OutputFormat::Json => BenchmarkReport::from_summary(&summary)
            .to_json()
            .context("failed to serialize report")?,
    };
    println!("{output}");

    Ok(())
}

/// Apply CLI flag overrides to loaded settings.
fn apply_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(host) = &cli.host {
        settings.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(connections) = cli.connections {
        settings.connections = connections;
    }
    if let Some(duration) = cli.duration {
        settings.duration_secs = duration;
    }
    if let Some(timeout) = cli.timeout {
        settings.timeout_secs = timeout;
    }
    if let Some(method) = &cli.method {
        settings.method = method.clone();
    }
    if let Some(params) = &cli.params {
        settings.params = Some(params.clone());
    }
    if let Some(max) = cli.max_line_bytes {
        settings.max_line_bytes = max;
    }
}
