//! Common utilities for integration tests

pub mod project;
pub mod stub;

// Re-export commonly used items
pub use project::TestProject;
pub use stub::StubServer;
