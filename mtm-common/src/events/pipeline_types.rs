//! Pipeline-related supporting types for events

use serde::{Deserialize, Serialize};

/// One of the four batch stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Scan,
    Identify,
    Tag,
    Organize,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Scan => "scan",
            PipelineStage::Identify => "identify",
            PipelineStage::Tag => "tag",
            PipelineStage::Organize => "organize",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived session counters shown next to each stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionCounters {
    /// Sum of track counts over the scanned collection
    pub scanned_files: usize,
    /// Albums in the identified collection with status Match
    pub identified_matches: usize,
    /// Sum of track counts over the tagged collection
    pub tagged_files: usize,
}

/// Result of one organize call, recorded per album
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum OrganizeOutcome {
    /// The service moved the album into the output tree
    Moved,
    /// The service acknowledged the call but left the album in place
    Skipped,
    /// The call itself failed; the queue continued
    Failed(String),
}

impl OrganizeOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, OrganizeOutcome::Failed(_))
    }
}
