//! Stream-integrity validators.
//!
//! Both validators are observational: they classify what they see and leave counting
//! to the caller. Neither one ever stops bytes from reaching the ring.

pub mod continuity;
pub mod sequence;

pub use continuity::{ContinuityTable, PacketVerdict};
pub use sequence::{SequenceTracker, SequenceVerdict};
