//! Individual steps of environment preparation, update and launch.
//!
//! Each step is a separate module with functions the bootstrap flow and the
//! update orchestrator call in sequence.

pub mod check;
pub mod download;
pub mod extract;
pub mod launch;
pub mod runtime;
pub mod verify;
