//! Client for the BrainVibe code-change analysis API
//!
//! One flush produces one whole-tree diff; the client sends it once per
//! changed file that survives the analysis filter and collects the topics
//! the service extracts.

pub mod client;
pub mod error;
pub mod types;

pub use client::{AnalysisClient, AnalysisReport};
pub use error::{AnalysisError, Result};
pub use types::{AnalysisResponse, AnalyzeRequest, Topic};
