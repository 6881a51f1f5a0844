//! # Transcript Repair
//!
//! Corruption detection and repair for append-only session transcripts.
//!
//! A transcript is newline-delimited JSON where each record names its parent,
//! forming a tree of conversation turns. When an assistant stream dies in the
//! middle of a tool call, the transcript is left with a tool call that never
//! completed, results that answer it, and error records produced when an
//! upstream API rejects the replayed history. Every later turn fails the same
//! way until those records are removed.
//!
//! ## Pipeline
//!
//! - [`record`]: decode lines, keeping raw text for byte-identical re-emission
//! - [`extract`]: identities, parents, roles and tool-call references
//! - [`detect`]: classify corrupted records and poisoned tool-call ids
//! - [`remap`]: nearest surviving ancestor for each removed record
//! - [`repair`]: apply removals and parent rewrites, then verify
//! - [`report`]: summaries for front ends
//!
//! [`discovery`] and [`session`] wrap the engine with filesystem access.

pub mod config;
pub mod detect;
pub mod discovery;
mod errors;
pub mod extract;
pub mod logging;
pub mod record;
pub mod remap;
pub mod repair;
pub mod report;
pub mod session;

pub use config::RepairConfig;
pub use detect::{detect, Corruption, Detection};
pub use errors::{RepairError, RepairResult};
pub use logging::{init_logging, LoggingConfig};
pub use record::{decode, Record, TranscriptLine};
pub use repair::{analyze, apply, repair, Analysis, RepairOutcome};
pub use report::SessionReport;

/// Commonly used items
pub mod prelude {
    pub use crate::detect::{Corruption, Detection};
    pub use crate::errors::{RepairError, RepairResult};
    pub use crate::repair::{analyze, repair, Analysis, RepairOutcome};
    pub use crate::report::SessionReport;
    pub use crate::session::{SessionResult, SessionStatus};
}

/// Version of the repair library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
