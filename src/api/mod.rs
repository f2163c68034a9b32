pub mod client;
pub mod loci;
pub mod types;

pub use client::*;
pub use loci::*;
pub use types::*;
