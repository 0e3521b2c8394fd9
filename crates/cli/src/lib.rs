//! Library side of the `brainvibe` binary
//!
//! Wires the watcher, batch scheduler, snapshot controller and analysis
//! client into a tracking session. Kept separate from `main.rs` so the
//! end-to-end tests can drive a session in-process.

pub mod pipeline;
pub mod session;
pub mod util;

pub use pipeline::AnalysisPipeline;
pub use session::{run_once, TrackSession, SHUTDOWN_GRACE};
