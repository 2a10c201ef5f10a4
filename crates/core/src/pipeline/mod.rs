//! Pipeline records, transitions, and the stage ordering table.

mod model;
mod stage;

pub use model::*;
pub use stage::*;
