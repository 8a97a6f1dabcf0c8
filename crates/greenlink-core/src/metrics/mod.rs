pub mod derivation;

pub use derivation::*;
