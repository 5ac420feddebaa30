use thiserror::Error;

/// Failures surfaced by the city and weather services.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("City with id {0} not found")]
    NotFound(i64),

    #[error("Invalid input: {0}")]
    Validation(String),

    /// The forecast API could not be reached or returned an unusable body.
    #[error("Forecast unavailable: {0:#}")]
    Upstream(anyhow::Error),

    #[error("Storage error: {0:#}")]
    Storage(anyhow::Error),
}

impl ServiceError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
