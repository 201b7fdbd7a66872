//! Command-line entry point for **update-alidns**
//!
//! * Flags win over `DDNS_*` environment variables, which win over the optional TOML file
//! * Diagnostics go to stderr via tracing; the result line goes to stdout
//! * Every failure kind exits with its own non-zero status

use clap::Parser;
use ddns_core::{
    cfg::{AppConfig, ProviderCfg},
    error::CoreError,
    load_config, show_ip, sync,
};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to an optional TOML config file
    #[arg(short, long, env = "DDNS_CONFIG")]
    config: Option<String>,

    /// Alidns region [default: cn-hangzhou]
    #[arg(long)]
    region: Option<String>,

    /// AccessKey ID
    #[arg(long = "ak", env = "AK", hide_env_values = true)]
    access_key: Option<String>,

    /// AccessKey secret
    #[arg(long = "sk", env = "SK", hide_env_values = true)]
    access_secret: Option<String>,

    /// Domain name, e.g. `example.com`
    #[arg(long = "dn")]
    domain: Option<String>,

    /// Record prefix (RR), e.g. `www`
    #[arg(long)]
    rr: Option<String>,

    /// Record type, `A` or `AAAA` [default: A]
    #[arg(short = 't', long = "type")]
    record_type: Option<String>,

    /// Record value; when empty the public IP is looked up
    #[arg(short = 'v', long)]
    value: Option<String>,

    /// Record TTL in seconds
    #[arg(long)]
    ttl: Option<u32>,

    /// Only print my public IP, do not touch DNS
    #[arg(long = "ip")]
    show_ip: bool,
}

impl Cli {
    fn apply(self, p: &mut ProviderCfg) {
        let Cli {
            region,
            access_key,
            access_secret,
            domain,
            rr,
            record_type,
            value,
            ttl,
            ..
        } = self;
        if let Some(v) = region {
            p.region = v;
        }
        if let Some(v) = access_key {
            p.access_key = v;
        }
        if let Some(v) = access_secret {
            p.access_secret = v;
        }
        if let Some(v) = domain {
            p.domain = v;
        }
        if let Some(v) = rr {
            p.rr = v;
        }
        if let Some(v) = record_type {
            p.record_type = v;
        }
        if value.is_some() {
            p.value = value;
        }
        if ttl.is_some() {
            p.ttl = ttl;
        }
    }
}

fn configure(cli: Cli) -> Result<(bool, AppConfig), CoreError> {
    let only_ip = cli.show_ip;
    let mut cfg = load_config(cli.config.as_deref())?;
    cli.apply(&mut cfg.provider);
    Ok((only_ip, cfg))
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), CoreError> {
    let (only_ip, cfg) = configure(cli)?;

    if only_ip {
        println!("{}", show_ip(&cfg).await?);
        return Ok(());
    }

    let report = sync(&cfg).await?;
    println!("{}: {}", report.record, report.outcome);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}
