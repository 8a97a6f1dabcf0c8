pub mod error;
pub mod types;

pub mod engine;
pub mod factors;
pub mod forecast;
pub mod kpi;
pub mod metrics;
pub mod mix;
pub mod ratchet;

pub use error::GreenlinkError;
pub use types::*;

/// Standard result type for all greenlink operations
pub type GreenlinkResult<T> = Result<T, GreenlinkError>;
