//! Diff Reconciler
//!
//! Pure comparison of a pre-tag and post-tag track record for audit display.
//! Values are compared as strings, so `year = 1999` and an extended tag
//! `"1999"` are equal.

use crate::session::Session;
use mtm_common::{Album, Track};
use serde::Serialize;
use std::collections::BTreeSet;

/// Placeholder shown for a field with no value
pub const MISSING: &str = "-";

/// One compared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDiff {
    pub field: String,
    pub before: String,
    pub after: String,
    pub changed: bool,
}

/// Diffs for one track of an album
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackDiff {
    pub filename: String,
    /// False when no pre-tag record could be matched
    pub matched: bool,
    pub fields: Vec<FieldDiff>,
}

type Extractor = fn(&Track) -> Option<String>;

fn title(track: &Track) -> Option<String> {
    track.title.clone()
}

fn artist(track: &Track) -> Option<String> {
    track.artist.clone()
}

fn album(track: &Track) -> Option<String> {
    track.album.clone()
}

fn year(track: &Track) -> Option<String> {
    track.year.map(|y| y.to_string())
}

/// Canonical fields and how to read them
const CANONICAL_FIELDS: &[(&str, Extractor)] = &[
    ("title", title),
    ("artist", artist),
    ("album", album),
    ("year", year),
];

/// Typed field first, then the extended tag of the same name, then "-"
fn field_value(track: &Track, field: &str) -> String {
    CANONICAL_FIELDS
        .iter()
        .find(|(name, _)| *name == field)
        .and_then(|(_, extract)| extract(track))
        .or_else(|| track.extended_tags.get(field).cloned())
        .unwrap_or_else(|| MISSING.to_string())
}

/// Compare `before` (absent for a track with no pre-tag record) with `after`
///
/// Field set is the canonical fields plus every extended tag key of `after`,
/// sorted by field name.
pub fn diff(before: Option<&Track>, after: &Track) -> Vec<FieldDiff> {
    let fields: BTreeSet<&str> = CANONICAL_FIELDS
        .iter()
        .map(|(name, _)| *name)
        .chain(after.extended_tags.keys().map(String::as_str))
        .collect();

    fields
        .into_iter()
        .map(|field| {
            let before_value = before
                .map(|t| field_value(t, field))
                .unwrap_or_else(|| MISSING.to_string());
            let after_value = field_value(after, field);
            FieldDiff {
                field: field.to_string(),
                changed: before_value != after_value,
                before: before_value,
                after: after_value,
            }
        })
        .collect()
}

/// Find the pre-tag album for a tagged one: by id, then by source path
fn match_album<'a>(candidates: &'a [Album], after: &Album) -> Option<&'a Album> {
    candidates
        .iter()
        .find(|a| a.id == after.id)
        .or_else(|| candidates.iter().find(|a| a.path == after.path))
}

/// Find the pre-tag track: by filename, with size breaking ties between
/// duplicates (tag writing changes sizes, so size alone never matches)
fn match_track<'a>(before: &'a Album, after: &Track) -> Option<&'a Track> {
    let mut same_name = before.tracks.iter().filter(|t| t.filename == after.filename);
    let first = same_name.next()?;
    if first.size_bytes == after.size_bytes {
        return Some(first);
    }
    same_name
        .find(|t| t.size_bytes == after.size_bytes)
        .or(Some(first))
}

/// Per-track diffs for a tagged album
///
/// "Before" is the identified record (falling back to scanned); "after" is
/// the tagged record. `None` when the album has not been tagged.
pub fn album_diff(session: &Session, album_id: &str) -> Option<Vec<TrackDiff>> {
    let after = session.tagged.iter().find(|a| a.id == album_id)?;
    let before = match_album(&session.identified, after)
        .or_else(|| match_album(&session.scanned, after));

    let diffs = after
        .tracks
        .iter()
        .map(|track| {
            let previous = before.and_then(|b| match_track(b, track));
            TrackDiff {
                filename: track.filename.clone(),
                matched: previous.is_some(),
                fields: diff(previous, track),
            }
        })
        .collect();

    Some(diffs)
}
