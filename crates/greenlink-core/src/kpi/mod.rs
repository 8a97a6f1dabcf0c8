pub mod definition;
pub mod evaluator;

pub use definition::*;
pub use evaluator::*;
