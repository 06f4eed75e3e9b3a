mod panel;
mod rule;
mod stats;

pub use panel::*;
pub use rule::*;
pub use stats::*;
