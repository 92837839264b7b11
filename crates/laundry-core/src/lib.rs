pub mod config;
pub mod error;

pub use config::{
    ApiConfig, Config, ConfigValidationError, GeocoderConfig, LocationConfig, SearchConfig,
    ValidationResult,
};
pub use error::{
    AppError, ConfigError, LocationError, NetworkError, PredictionError, ReqwestErrorExt,
};

use anyhow::Result;

/// Initialize logging for the application.
///
/// Logs go to stderr so command output stays clean. Safe to call more than
/// once; later calls keep the first subscriber.
pub fn init() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("Laundry planner core initialized");
    Ok(())
}
