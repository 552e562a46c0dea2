pub mod capacity;
pub mod generator;

pub use capacity::*;
pub use generator::*;
