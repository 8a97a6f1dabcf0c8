pub mod accumulator;
pub mod margin;

pub use accumulator::*;
pub use margin::*;
