use thiserror::Error;

pub type Result<T> = std::result::Result<T, RateLimiterError>;

#[derive(Error, Debug)]
pub enum RateLimiterError {
    #[error("request token capacity/rate must be positive, got capacity={capacity} rate={rate}")]
    InvalidRequestReservoir { capacity: f64, rate: f64 },

    #[error("body token capacity/rate must be positive, got capacity={capacity} rate={rate}")]
    InvalidBodyReservoir { capacity: f64, rate: f64 },
}
