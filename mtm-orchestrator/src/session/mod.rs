//! Album Session Store
//!
//! A `Session` is an immutable snapshot of the three pipeline checkpoints
//! (scanned / identified / tagged) plus derived counters and the set of
//! manually fixed album ids. Every transition is a pure reducer that builds
//! the next snapshot from the previous one; [`SessionStore`] swaps snapshots
//! wholesale and bumps the version.

mod store;

pub use store::SessionStore;

use mtm_common::events::{OrganizeOutcome, SessionCounters};
use mtm_common::Album;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use uuid::Uuid;

/// Pipeline status shown alongside the session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Scanning,
    Identifying,
    Tagging,
    Organizing,
    Finished,
    /// Scan produced no albums; the run stopped without error
    NoFilesFound,
    /// A stage failed; remaining stages were skipped
    Error(String),
}

/// Which collection of the session to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionView {
    Scanned,
    Identified,
    Tagged,
}

impl std::str::FromStr for SessionView {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scanned" => Ok(SessionView::Scanned),
            "identified" => Ok(SessionView::Identified),
            "tagged" => Ok(SessionView::Tagged),
            other => Err(format!("Unknown session view: {}", other)),
        }
    }
}

/// Immutable session snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Incremented by the store on every replacement
    pub version: u64,
    /// Run that produced the current contents, if any
    pub run_id: Option<Uuid>,
    /// Locations of the last full run; reprocess reuses the output location
    pub input_path: Option<String>,
    pub output_path: Option<String>,
    pub status: PipelineStatus,
    pub scanned: Vec<Album>,
    pub identified: Vec<Album>,
    pub tagged: Vec<Album>,
    pub manually_fixed: BTreeSet<String>,
    pub counters: SessionCounters,
    /// Organize progress, 0-100, never decreasing within a run
    pub organize_progress: u8,
    pub organize_outcomes: BTreeMap<String, OrganizeOutcome>,
}

/// Total number of tracks across a collection
pub fn total_tracks(albums: &[Album]) -> usize {
    albums.iter().map(Album::track_count).sum()
}

/// Number of albums whose status is Match
pub fn count_matches(albums: &[Album]) -> usize {
    albums.iter().filter(|a| a.status.is_match()).count()
}

impl Session {
    pub fn albums(&self, view: SessionView) -> &[Album] {
        match view {
            SessionView::Scanned => &self.scanned,
            SessionView::Identified => &self.identified,
            SessionView::Tagged => &self.tagged,
        }
    }

    pub fn find_identified(&self, album_id: &str) -> Option<&Album> {
        self.identified.iter().find(|a| a.id == album_id)
    }

    /// Empty session for a new run; nothing from the previous run survives
    pub fn reset_for_run(&self, run_id: Uuid, input_path: &str, output_path: &str) -> Session {
        Session {
            version: self.version,
            run_id: Some(run_id),
            input_path: Some(input_path.to_string()),
            output_path: Some(output_path.to_string()),
            ..Session::default()
        }
    }

    pub fn with_run_id(&self, run_id: Uuid) -> Session {
        Session {
            run_id: Some(run_id),
            ..self.clone()
        }
    }

    pub fn with_status(&self, status: PipelineStatus) -> Session {
        Session {
            status,
            ..self.clone()
        }
    }

    pub fn apply_scan_result(&self, albums: Vec<Album>) -> Session {
        let mut next = self.clone();
        next.counters.scanned_files = total_tracks(&albums);
        next.scanned = albums;
        next
    }

    /// Install the identify response
    ///
    /// An album that was already a Match before identification keeps its Match
    /// status even if the batch reports otherwise; automatic stages never
    /// regress a Match.
    pub fn apply_identify_result(&self, albums: Vec<Album>) -> Session {
        let settled: HashSet<&str> = self
            .identified
            .iter()
            .chain(self.scanned.iter())
            .filter(|a| a.status.is_match())
            .map(|a| a.id.as_str())
            .collect();

        let albums: Vec<Album> = albums
            .into_iter()
            .map(|mut album| {
                if !album.status.is_match() && settled.contains(album.id.as_str()) {
                    tracing::warn!(
                        album_id = %album.id,
                        reported = %album.status,
                        "Identify reported a regression for a settled album, keeping Match"
                    );
                    album.status = mtm_common::AlbumStatus::Match;
                }
                album
            })
            .collect();

        let mut next = self.clone();
        next.counters.identified_matches = count_matches(&albums);
        next.identified = albums;
        next
    }

    pub fn apply_tag_result(&self, albums: Vec<Album>) -> Session {
        let mut next = self.clone();
        next.counters.tagged_files = total_tracks(&albums);
        next.tagged = albums;
        next
    }

    /// Start a fresh organize pass: progress back to 0, outcomes cleared
    pub fn reset_progress(&self) -> Session {
        Session {
            organize_progress: 0,
            organize_outcomes: BTreeMap::new(),
            ..self.clone()
        }
    }

    /// Raise organize progress; lower values are ignored, values clamp to 100
    pub fn apply_progress_tick(&self, percent: u8) -> Session {
        Session {
            organize_progress: self.organize_progress.max(percent.min(100)),
            ..self.clone()
        }
    }

    pub fn apply_organize_outcome(
        &self,
        album_id: &str,
        outcome: OrganizeOutcome,
        percent: u8,
    ) -> Session {
        let mut next = self.apply_progress_tick(percent);
        next.organize_outcomes.insert(album_id.to_string(), outcome);
        next
    }

    /// Narrow all three collections to a reprocess scope
    ///
    /// Counters are recomputed from the scope: every album in it is counted as
    /// identified, and tagging is considered stale.
    pub fn narrow_to_scope(&self, scope: &[Album]) -> Session {
        let ids: HashSet<&str> = scope.iter().map(|a| a.id.as_str()).collect();

        let mut next = self.clone();
        next.scanned = scope.to_vec();
        next.identified = scope.to_vec();
        next.tagged = self
            .tagged
            .iter()
            .filter(|a| ids.contains(a.id.as_str()))
            .cloned()
            .collect();
        next.counters = SessionCounters {
            scanned_files: total_tracks(scope),
            identified_matches: scope.len(),
            tagged_files: 0,
        };
        next
    }

    pub fn clear_manually_fixed(&self) -> Session {
        Session {
            manually_fixed: BTreeSet::new(),
            ..self.clone()
        }
    }

    /// Record a manual resolution and narrow to the focus working set
    pub fn apply_focus_filter(&self, resolved: Album) -> Session {
        crate::focus::apply_focus_filter(self, resolved)
    }
}
