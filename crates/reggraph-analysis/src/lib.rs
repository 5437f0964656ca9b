pub mod risk;
pub mod simulation;
pub mod timeline;

pub use risk::*;
pub use simulation::*;
pub use timeline::*;

pub use reggraph_core::{RegGraphError, Result};
