use laundry_core::{AppError, LocationError as CoreLocationError};
use laundry_weather::LocationError;

pub fn location_error(e: LocationError) -> AppError {
    match e {
        LocationError::PermissionDenied => AppError::Location(CoreLocationError::PermissionDenied),
        LocationError::ServiceUnavailable | LocationError::Timeout => {
            AppError::Location(CoreLocationError::ServiceUnavailable)
        }
        LocationError::Other(msg) => AppError::Other(anyhow::anyhow!(msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_errors() {
        assert_eq!(
            location_error(LocationError::PermissionDenied).user_message(),
            "Location access was denied."
        );
        assert!(matches!(
            location_error(LocationError::Timeout),
            AppError::Location(CoreLocationError::ServiceUnavailable)
        ));
        assert!(matches!(
            location_error(LocationError::Other("gps off".into())),
            AppError::Other(_)
        ));
    }
}
