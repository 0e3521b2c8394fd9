//! CLI command implementations

pub mod track;
