//! Rendering of aggregated insights into run summaries

pub mod columns;
pub mod format;
pub mod summary;

pub use columns::*;
pub use format::*;
pub use summary::*;
