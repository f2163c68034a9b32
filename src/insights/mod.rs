pub mod aggregator;
pub mod errors;
pub mod structs;

pub use aggregator::*;
pub use errors::*;
pub use structs::*;
