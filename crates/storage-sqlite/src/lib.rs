//! SQLite storage for the lifecycle engine.
//!
//! Implements the store contracts from `chapterflow-core` on diesel/SQLite.
//! Reads go straight to the connection pool; every mutation is funneled
//! through a single writer actor so repository jobs are atomic and never
//! interleave.

pub mod checkins;
pub mod db;
pub mod errors;
pub mod meetings;
pub mod participants;
pub mod payments;
pub mod pipeline;
pub mod schema;

#[cfg(test)]
pub(crate) mod test_support;

pub use checkins::CheckInRepository;
pub use meetings::MeetingRepository;
pub use participants::ParticipantRepository;
pub use payments::PaymentGateRepository;
pub use pipeline::PipelineRepository;
