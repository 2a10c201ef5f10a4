//! Domain models, store contracts, and the participant lifecycle engine.
//!
//! This crate is persistence-agnostic: every store the engine writes to
//! (participants, check-ins, pipeline records/transitions) and every gate it
//! reads from (payments) is expressed as a trait implemented elsewhere.

pub mod checkins;
pub mod errors;
pub mod lifecycle;
pub mod meetings;
pub mod participants;
pub mod payments;
pub mod pipeline;

pub use errors::{Error, Result};
