use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use ringlogd::config::Config;
use ringlogd::server::Supervisor;
use ringlogd::util::signal;
use ringlogd::SharedLog;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "ringlogd", about = "Bounded ring log served over TCP", version = "0.1")]
struct Cli {
    /// Detach from the terminal after the listening socket is bound
    #[arg(short, long)]
    daemon: bool,

    /// TCP port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    bind: Option<String>,

    /// Number of entries kept before the oldest is overwritten
    #[arg(long)]
    capacity: Option<usize>,

    /// Seconds between injected timestamp records
    #[arg(long)]
    timestamp_interval: Option<u64>,

    /// Do not inject timestamp records
    #[arg(long)]
    no_timestamps: bool,

    /// Store AESDCHAR_IOCSEEKTO lines as ordinary data
    #[arg(long)]
    no_seek_commands: bool,

    /// Config file to use instead of the per-user default
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Append log output to this file instead of stderr (survives --daemon)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn apply(&self, cfg: &mut Config) {
        if let Some(port) = self.port { cfg.server.port = port; }
        if let Some(bind) = &self.bind { cfg.server.bind_address = bind.clone(); }
        if let Some(cap) = self.capacity { cfg.log.capacity = cap; }
        if let Some(secs) = self.timestamp_interval { cfg.timer.interval_sec = secs; }
        if self.no_timestamps { cfg.timer.enabled = false; }
        if self.no_seek_commands { cfg.server.seek_commands = false; }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    let mut cfg = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None       => Config::load(),
    };
    cli.apply(&mut cfg);
    cfg.validate()?;

    if cli.print_config {
        return run_print_config(&cfg);
    }
    run_server(&cfg, cli.daemon, cli.log_file.is_some())
}

fn open_log_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        builder.target(env_logger::Target::Pipe(Box::new(open_log_file(path)?)));
    }
    builder.init();
    Ok(())
}

fn run_print_config(cfg: &Config) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    println!("Config: {}", path);
    println!();
    println!("[server]");
    println!("  bind_address      = {}", cfg.server.bind_address);
    println!("  port              = {}", cfg.server.port);
    println!("  recv_buffer_size  = {}", cfg.server.recv_buffer_size);
    println!("  poll_interval_ms  = {}ms", cfg.server.poll_interval_ms);
    println!("  shutdown_grace_ms = {}ms", cfg.server.shutdown_grace_ms);
    println!("  seek_commands     = {}", cfg.server.seek_commands);
    println!();
    println!("[log]");
    println!("  capacity          = {}", cfg.log.capacity);
    println!();
    println!("[timer]");
    println!("  enabled           = {}", cfg.timer.enabled);
    println!("  interval_sec      = {}", cfg.timer.interval_sec);
    println!("  format            = {:?}", cfg.timer.format);
    Ok(())
}

fn run_server(cfg: &Config, daemon: bool, has_log_file: bool) -> Result<()> {
    let log = Arc::new(SharedLog::new(cfg.log.capacity));
    let addr = cfg.listen_address();
    let supervisor = Supervisor::bind(addr.clone(), log, cfg.server_settings())
        .with_context(|| format!("binding {}:{}", addr.0, addr.1))?;

    if daemon {
        if !has_log_file {
            warn!("no --log-file given, log output is discarded once detached");
        }
        nix::unistd::daemon(false, false).context("daemonizing")?;
    }
    // ctrlc's handler thread would not survive the fork in daemon().
    signal::install().context("installing signal handlers")?;

    let report = supervisor.run(signal::shutdown_requested)?;
    if signal::shutdown_requested() {
        info!("Caught SIGINT/SIGTERM, exiting");
    }
    info!(
        "served {} connection(s), force-closed {}, released {} entries",
        report.accepted, report.force_closed, report.released_entries
    );
    Ok(())
}
