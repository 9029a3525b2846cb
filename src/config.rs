use crate::gateway::payload::IdentifyProperties;

/// Client configuration. Loaded from the environment by the binary; all
/// fields are public so embedders can construct it directly. The token is
/// treated as an opaque string and never parsed.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub discovery_url: String,
    /// Ask the server for zlib-compressed payloads.
    pub compress: bool,
    pub large_threshold: u32,
    /// Minimum spacing between IDENTIFY sends, across all reconnects of
    /// one client. RESUME is never spaced.
    pub identify_min_interval_ms: u64,
    /// Cap on how long one transport-open attempt may take.
    pub connect_timeout_ms: u64,
    /// Reported as the `$browser` / `$device` identify properties.
    pub client_name: String,
}

impl Config {
    pub fn new(token: impl Into<String>, discovery_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            discovery_url: discovery_url.into(),
            compress: true,
            large_threshold: 250,
            identify_min_interval_ms: 5432,
            connect_timeout_ms: 30_000,
            client_name: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    pub fn from_env() -> Self {
        let token = std::env::var("GATEWAY_TOKEN").expect("GATEWAY_TOKEN is required");
        let discovery_url =
            std::env::var("GATEWAY_DISCOVERY_URL").expect("GATEWAY_DISCOVERY_URL is required");

        let mut config = Self::new(token, discovery_url);
        if let Ok(v) = std::env::var("GATEWAY_COMPRESS") {
            config.compress = v.parse().expect("GATEWAY_COMPRESS must be true or false");
        }
        if let Ok(v) = std::env::var("GATEWAY_LARGE_THRESHOLD") {
            config.large_threshold = v
                .parse()
                .expect("GATEWAY_LARGE_THRESHOLD must be a valid integer");
        }
        if let Ok(v) = std::env::var("GATEWAY_IDENTIFY_MIN_INTERVAL_MS") {
            config.identify_min_interval_ms = v
                .parse()
                .expect("GATEWAY_IDENTIFY_MIN_INTERVAL_MS must be a valid integer");
        }
        config
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn identify_properties(&self) -> IdentifyProperties {
        IdentifyProperties {
            os: std::env::consts::OS.to_string(),
            browser: self.client_name.clone(),
            device: self.client_name.clone(),
        }
    }
}
