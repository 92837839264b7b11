//! Device position sources for the one-shot location lookup.

use async_trait::async_trait;

use crate::types::{Coordinates, LocationError};

#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Whether this device can report a position at all.
    fn is_available(&self) -> bool;

    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// Position supplied up front (config file or command line).
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// No location capability on this device.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_location_reports_its_position() {
        let provider = FixedLocation(Coordinates::new(48.85, 2.35));
        assert!(provider.is_available());
        assert_eq!(
            provider.current_position().await.unwrap(),
            Coordinates::new(48.85, 2.35)
        );
    }

    #[tokio::test]
    async fn test_no_location_is_unavailable() {
        assert!(!NoLocation.is_available());
        assert!(matches!(
            NoLocation.current_position().await,
            Err(LocationError::ServiceUnavailable)
        ));
    }
}
