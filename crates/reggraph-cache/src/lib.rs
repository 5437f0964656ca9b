pub mod cache;
pub mod entry;
pub mod invalidation;

pub use cache::*;
pub use entry::*;
pub use invalidation::*;

pub use reggraph_core::{CacheSettings, RegGraphError, Result};
