pub mod creators;
pub mod dev;
pub mod public;
