//! Wire types for `POST {api}/project/{id}/analyze_code_change/`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body, one per changed file
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest<'a> {
    /// Root-relative path with `/` separators
    pub file_path: &'a str,
    /// Whole-tree diff of the flush
    pub diff_content: &'a str,
    pub change_source: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub change_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub topics_extracted: u64,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

/// A learning topic extracted from a diff
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Topic {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Fields this client does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}
