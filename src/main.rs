use accordgateway::config::Config;
use accordgateway::gateway::GatewayClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "accordgateway=debug".into()),
        )
        .init();

    let config = Config::from_env();
    print_banner(&config);

    let mut client = GatewayClient::new(config);
    let shutdown = client.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("ctrl-c received, shutting down");
            shutdown.shutdown().await;
        }
    });

    if let Err(e) = client.start().await {
        tracing::error!(error = %e, "gateway client failed to start");
        std::process::exit(1);
    }
}

fn print_banner(config: &Config) {
    let version = env!("CARGO_PKG_VERSION");
    let sha = env!("GIT_SHA");

    eprintln!();
    eprintln!("  \x1b[1;36maccordgateway\x1b[0m \x1b[2mv{version} ({sha})\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mdiscovery\x1b[0m    {}", config.discovery_url);
    eprintln!("  \x1b[2mcompress\x1b[0m     {}", config.compress);
    eprintln!("  \x1b[2mthreshold\x1b[0m    {}", config.large_threshold);
    eprintln!();
}
