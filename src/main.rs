use anyhow::Result;
use clap::{ArgAction, Parser};
use kubelet_volume_exporter::config::{parse_interval_seconds, Config};
use kubelet_volume_exporter::server;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// Kubelet endpoint URL (overrides config)
    #[arg(long, env = "KUBELET_ENDPOINT")]
    kubelet_endpoint: Option<String>,

    /// Port to expose Prometheus metrics on (overrides config)
    #[arg(short = 'p', long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Address to bind to (overrides config)
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Time between kubelet polls, as seconds or a duration like `30s` (overrides config)
    #[arg(long, env = "SCRAPE_INTERVAL", value_parser = parse_interval_seconds)]
    scrape_interval: Option<u64>,

    /// Path to the service account token (overrides config)
    #[arg(long, env = "TOKEN_PATH")]
    token_path: Option<PathBuf>,

    /// Skip TLS certificate verification for the kubelet
    #[arg(
        long,
        env = "EXPORTER_INSECURE_SKIP_TLS_VERIFY",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    insecure_skip_tls_verify: bool,

    /// Enable debug logging including raw API responses
    #[arg(
        long,
        env = "EXPORTER_DEBUG",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if let Some(endpoint) = args.kubelet_endpoint {
        config.kubelet.endpoint = endpoint;
    }
    if let Some(port) = args.metrics_port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(interval) = args.scrape_interval {
        config.metrics.scrape_interval_seconds = interval;
    }
    if let Some(token_path) = args.token_path {
        config.kubelet.token_path = Some(token_path);
    }
    if args.insecure_skip_tls_verify {
        config.kubelet.insecure_skip_tls_verify = true;
    }
    if args.debug {
        config.logging.debug = true;
    }

    // Initialize tracing
    let default_level = if config.logging.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting kubelet volume stats exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = config.validate() {
        error!("{}", e);
        std::process::exit(1);
    }

    info!("Configuration loaded successfully");
    info!("Kubelet endpoint: {}", config.kubelet.endpoint);
    info!(
        "Scrape interval: {}s, debug mode: {}",
        config.metrics.scrape_interval_seconds, config.logging.debug
    );
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    // Start the metrics server
    if let Err(e) = server::start(config).await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut argv = vec!["kubelet-volume-exporter"];
        argv.extend_from_slice(args);
        Args::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn test_scrape_interval_accepts_durations_and_seconds() {
        assert_eq!(parse(&["--scrape-interval=30s"]).scrape_interval, Some(30));
        assert_eq!(parse(&["--scrape-interval", "2m"]).scrape_interval, Some(120));
        assert_eq!(parse(&["--scrape-interval=45"]).scrape_interval, Some(45));
        assert!(Args::try_parse_from(["kubelet-volume-exporter", "--scrape-interval=0s"]).is_err());
    }

    #[test]
    fn test_boolean_flags_accept_bare_and_explicit_values() {
        let args = parse(&["--debug", "--insecure-skip-tls-verify"]);
        assert!(args.debug);
        assert!(args.insecure_skip_tls_verify);

        let args = parse(&["--debug=true", "--insecure-skip-tls-verify=false"]);
        assert!(args.debug);
        assert!(!args.insecure_skip_tls_verify);
    }
}
