//! The reconciliation core: link discovery, name resolution, match
//! assembly, idempotent writes, and the phase coordinator that fans the
//! work out over bounded worker pools.
//!
//! Front ends (CLI, web routes, the scheduler) are thin callers that pick a
//! league/season scope and invoke the phases in the fixed order
//! catalog -> schedule -> odds; the refresh pass revisits persisted
//! UPCOMING fixtures independently.

pub mod assemble;
pub mod discover;
pub mod pipeline;
pub mod pool;
pub mod resolve;
pub mod snapshot;
pub mod write;

pub use pipeline::{
    LeagueRegistry, LeagueSource, PhaseSummary, RunSummary, SyncConfig, SyncPipeline,
};
pub use resolve::{Resolution, Resolver, Scope};

pub const CRATE_NAME: &str = "pitch-sync";
