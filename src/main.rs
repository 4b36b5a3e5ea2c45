mod collectors;
mod config;
mod metrics;
mod snmp;
mod state;

use clap::{CommandFactory, Parser};
use collectors::capacity::{probe, with_watchdog};
use collectors::CapacitySample;
use config::{CheckMode, Config, DEFAULT_PORT};
use state::{evaluate, Status};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Checks pool and cluster capacity of a storage system over SNMP.
#[derive(Parser, Debug)]
#[command(name = "check-capacity")]
#[command(version)]
pub(crate) struct Cli {
    /// Host name or address of the agent
    #[arg(short = 'H', long)]
    pub(crate) hostname: Option<String>,
    /// Community string (SNMP v1, or v2c with -2)
    #[arg(short = 'C', long)]
    pub(crate) community: Option<String>,
    /// Use SNMP v2c with the community string
    #[arg(short = '2', long = "v2c")]
    pub(crate) v2c: bool,
    /// SNMP v3 login
    #[arg(short = 'l', long)]
    pub(crate) login: Option<String>,
    /// SNMP v3 authentication password
    #[arg(short = 'x', long)]
    pub(crate) passwd: Option<String>,
    /// SNMP v3 privacy password
    #[arg(short = 'X', long)]
    pub(crate) privpass: Option<String>,
    /// SNMP v3 protocols as <authproto>[,<privproto>]: md5|sha, des|aes
    #[arg(short = 'L', long)]
    pub(crate) protocols: Option<String>,
    /// SNMP port
    #[arg(short = 'P', long, default_value_t = DEFAULT_PORT)]
    pub(crate) port: u16,
    /// What to check: pool, cluster or both
    #[arg(short = 'o', long)]
    pub(crate) option: Option<String>,
    /// Warning threshold in percent
    #[arg(short = 'w', long)]
    pub(crate) warn: Option<String>,
    /// Critical threshold in percent
    #[arg(short = 'c', long)]
    pub(crate) critical: Option<String>,
    /// Append performance data
    #[arg(short = 'f', long)]
    pub(crate) perfparse: bool,
    /// Timeout in seconds (2 to 60, default 5)
    #[arg(short = 't', long)]
    pub(crate) timeout: Option<String>,
    /// Print diagnostic trace lines
    #[arg(short = 'v', long)]
    pub(crate) verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version land here too; a plugin reports them as UNKNOWN.
            let _ = err.print();
            Status::Unknown.exit();
        }
    };
    let cfg = match Config::from_cli(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            println!("{err}");
            println!("{}", Cli::command().render_usage());
            Status::Unknown.exit();
        }
    };
    init_tracing(cfg.verbose);
    debug!(
        host = %cfg.host,
        port = cfg.port,
        version = cfg.auth.version_label(),
        auth = ?cfg.auth,
        modes = ?cfg.modes,
        timeout = %humantime::format_duration(cfg.timeout),
        "configuration accepted"
    );

    let samples = match with_watchdog(cfg.watchdog(), probe(&cfg)).await {
        Ok(samples) => samples,
        Err(err) => {
            println!("{err} : UNKNOWN");
            Status::Unknown.exit();
        }
    };

    let (lines, status) = render_reports(&samples, &cfg);
    for line in lines {
        println!("{line}");
    }
    status.exit();
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "off" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Output lines for every evaluated mode and the status of the last one.
fn render_reports(samples: &[(CheckMode, CapacitySample)], cfg: &Config) -> (Vec<String>, Status) {
    let mut lines = Vec::with_capacity(samples.len() * 2);
    let mut status = Status::Unknown;
    for &(mode, sample) in samples {
        let report = evaluate(mode, sample, &cfg.thresholds);
        debug!(mode = %mode, status = %report.status, percent = ?report.percent, "mode evaluated");
        lines.push(report.status_line(cfg.perfdata));
        lines.push(report.diagnostics());
        status = report.status;
    }
    (lines, status)
}
