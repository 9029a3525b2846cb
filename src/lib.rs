pub mod config;
pub mod discovery;
pub mod error;
pub mod gateway;

pub use config::Config;
pub use error::GatewayError;
pub use gateway::{ConnectionState, GatewayClient, ShutdownHandle};
