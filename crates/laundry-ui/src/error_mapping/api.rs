use laundry_core::{AppError, ConfigError, NetworkError, PredictionError, ReqwestErrorExt};
use laundry_weather::ApiError;

pub fn api_error(e: ApiError) -> AppError {
    match e {
        ApiError::Network(e) => AppError::Network(e.into_network_error()),
        ApiError::Status { status, message } if status >= 500 => {
            AppError::Network(NetworkError::ServerError { status, message })
        }
        ApiError::Status { status, message } => {
            AppError::Prediction(PredictionError::Rejected { status, message })
        }
        ApiError::Url(e) => AppError::Config(ConfigError::Invalid(e.to_string())),
    }
}
