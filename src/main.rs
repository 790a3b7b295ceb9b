use clap::Parser;
use cpp_pch_pipeline::log_timing;
use cpp_pch_pipeline::logging::{LogConfig, init_logging};
use cpp_pch_pipeline::pipeline::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};

/// CLI arguments for the PCH pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project root directory to scan for compilation databases (defaults to current directory)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Use this compile_commands.json instead of scanning the root
    #[arg(long, value_name = "FILE")]
    compile_commands: Option<PathBuf>,

    /// Directory depth searched below the root
    #[arg(long, default_value_t = 3)]
    depth: usize,

    /// Number of worker slots (defaults to available parallelism)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Log level (overrides RUST_LOG env var)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Log file path (overrides PCH_PIPELINE_LOG_FILE env var)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Write the JSON report here instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Write generated PCH header bodies into this directory
    #[arg(long, value_name = "DIR")]
    pch_dir: Option<PathBuf>,

    /// Builtin system include directory (repeatable, replaces the defaults)
    #[arg(long = "system-include", value_name = "DIR")]
    system_includes: Vec<PathBuf>,

    /// Generate and queue tasks without running any
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn pipeline_config(self, root: PathBuf) -> PipelineConfig {
        let mut config = PipelineConfig::new(root);
        config.compile_commands = self.compile_commands;
        config.depth = self.depth;
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if !self.system_includes.is_empty() {
            config.system_include_paths = self.system_includes;
        }
        config.pch_directory = self.pch_dir;
        config.dry_run = self.dry_run;
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging with configuration from env vars and CLI args
    let log_config =
        LogConfig::from_env().with_overrides(args.log_level.clone(), args.log_file.clone());

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    let root = match args.root.clone() {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    let output = args.output.clone();
    let pipeline = Pipeline::new(args.pipeline_config(root));

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pipeline");
            on_interrupt.cancel();
        }
    });

    let started = Instant::now();
    let report = match pipeline.run(cancellation).await {
        Ok(report) => report,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            eprintln!("Pipeline failed: {e}");
            std::process::exit(1);
        }
    };
    log_timing!(Level::INFO, "run", started.elapsed());
    info!(
        "Finished: {}/{} tasks, {} failures",
        report.progress.done, report.progress.total, report.failures
    );

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }

    if report.failures > 0 {
        std::process::exit(2);
    }
    Ok(())
}
