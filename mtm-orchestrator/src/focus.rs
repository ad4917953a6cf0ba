//! Focus Mode Filter
//!
//! After a manual resolution the working set is narrowed to exactly
//! "still needs attention" ∪ "fixed in this session": settled albums nobody
//! touched drop out of view, and tagging is considered stale.

use crate::session::{count_matches, total_tracks, Session};
use mtm_common::events::SessionCounters;
use mtm_common::Album;
use std::collections::HashSet;

/// Whether an album stays in the focused working set
pub fn in_focus(album: &Album, manually_fixed: &std::collections::BTreeSet<String>) -> bool {
    album.status.needs_attention() || manually_fixed.contains(&album.id)
}

/// Record `resolved` as manually fixed and narrow the session around it
///
/// 1. add the album id to `manually_fixed`
/// 2. replace its record in `identified` (appended if it was not present)
/// 3. keep identified albums that are not a Match or were fixed by hand
/// 4. scanned := identified := focused; tagged keeps only focused ids
/// 5. counters recomputed from the focused set, tagged files reset to 0
pub fn apply_focus_filter(session: &Session, resolved: Album) -> Session {
    let mut manually_fixed = session.manually_fixed.clone();
    manually_fixed.insert(resolved.id.clone());

    let mut identified = session.identified.clone();
    match identified.iter_mut().find(|a| a.id == resolved.id) {
        Some(slot) => *slot = resolved,
        None => identified.push(resolved),
    }

    let focused: Vec<Album> = identified
        .into_iter()
        .filter(|a| in_focus(a, &manually_fixed))
        .collect();

    let focused_ids: HashSet<&str> = focused.iter().map(|a| a.id.as_str()).collect();
    let tagged: Vec<Album> = session
        .tagged
        .iter()
        .filter(|a| focused_ids.contains(a.id.as_str()))
        .cloned()
        .collect();

    let counters = SessionCounters {
        scanned_files: total_tracks(&focused),
        identified_matches: count_matches(&focused),
        tagged_files: 0,
    };

    Session {
        scanned: focused.clone(),
        identified: focused,
        tagged,
        manually_fixed,
        counters,
        ..session.clone()
    }
}
