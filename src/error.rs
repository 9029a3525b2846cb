use std::fmt;

/// Failure of the discovery call, the only fallible path surfaced to the
/// caller. Transport and payload problems inside a connection cycle are
/// contained by the reconnect loop instead of erroring out.
#[derive(Debug)]
pub enum GatewayError {
    /// The discovery call itself failed (network, TLS, bad JSON).
    Http(reqwest::Error),
    /// Discovery answered with a non-success status.
    DiscoveryStatus { status: u16, body: String },
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Http(e) => write!(f, "HTTP error: {e}"),
            GatewayError::DiscoveryStatus { status, body } => {
                write!(f, "discovery returned {status}: {body}")
            }
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Http(e) => Some(e),
            GatewayError::DiscoveryStatus { .. } => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Http(e)
    }
}
