mod collectors;
mod config;
mod export;
mod format;
mod render;
mod session;
mod snapshot;

use clap::Parser;
use collectors::system::HostSource;
use collectors::Collector;
use config::{Config, ConfigError};
use render::Renderer;
use session::{Session, STOPPED_BANNER};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

#[derive(Parser, Debug)]
#[command(name = "hostsnap")]
#[command(version)]
#[command(about = "Point-in-time snapshots of local host metrics")]
struct Cli {
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long)]
    print_default_config: bool,
    /// Collect and render a single snapshot, then exit.
    #[arg(long, conflicts_with = "export")]
    once: bool,
    /// Collect a single snapshot and write it as JSON to PATH, then exit.
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&cfg);
    info!(
        config = %cli.config,
        settle = %humantime::format_duration(cfg.settle_delay()),
        "starting system monitor"
    );

    if let Err(err) = ctrlc::set_handler(|| {
        info!("system monitor stopped by user (Ctrl+C)");
        println!("\n{STOPPED_BANNER}");
        std::process::exit(0);
    }) {
        warn!(error = %err, "could not install Ctrl+C handler");
    }

    let collector = Collector::new(HostSource::new(), cfg.settle_delay());

    let code = if let Some(path) = cli.export.as_deref() {
        export_once(collector, path)
    } else if cli.once {
        render_once(collector, &cfg)
    } else {
        let stdin = io::stdin();
        let renderer = Renderer::new(cfg.render.width, cfg.clear_screen);
        let mut session = Session::new(
            collector,
            renderer,
            cfg.export.clone(),
            stdin.lock(),
            io::stdout(),
        );
        match session.run() {
            Ok(()) => 0,
            Err(err) => {
                eprintln!("{err}");
                1
            }
        }
    };

    std::process::exit(code);
}

/// The default path is optional; an explicitly named file must exist.
fn load_config(path: &str) -> Result<Config, ConfigError> {
    if path == DEFAULT_CONFIG_PATH && !Path::new(path).exists() {
        return Ok(Config::default());
    }
    Config::load_from_file(path)
}

fn init_tracing(cfg: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    match File::create(&cfg.log_file) {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .init(),
        Err(err) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
            warn!(path = %cfg.log_file, error = %err, "could not create log file, logging to stderr");
        }
    }
}

fn render_once(mut collector: Collector<HostSource>, cfg: &Config) -> i32 {
    let collection = match collector.collect_with_diagnostics() {
        Ok(c) => c,
        Err(err) => {
            error!(error = %err, "unexpected error while collecting system info");
            eprintln!("{err}");
            return 1;
        }
    };

    let renderer = Renderer::new(cfg.render.width, false);
    let mut out = io::stdout().lock();
    match renderer.render(&collection.snapshot, &collection.diagnostics, &mut out) {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "could not write snapshot to the terminal");
            1
        }
    }
}

fn export_once(mut collector: Collector<HostSource>, path: &Path) -> i32 {
    let snapshot = match collector.collect() {
        Ok(s) => s,
        Err(err) => {
            error!(error = %err, "unexpected error while collecting system info");
            eprintln!("{err}");
            return 1;
        }
    };

    match export::write_snapshot(&snapshot, path) {
        Ok(()) => {
            info!(path = %path.display(), "snapshot exported");
            println!("{} was created", path.display());
            0
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "export failed");
            eprintln!("{err}");
            1
        }
    }
}
