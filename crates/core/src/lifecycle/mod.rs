//! The lifecycle engine: status and funnel progression triggers.

mod results;
mod service;

pub use results::*;
pub use service::*;
