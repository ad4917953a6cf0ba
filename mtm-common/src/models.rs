//! Wire data model shared with the album processing service
//!
//! Field names follow the service's JSON exactly (`files`, `size_bytes`,
//! `mb_release_id`, ...) so records round-trip through the pipeline untouched.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One audio file's path/size/tag-field record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub filename: String,
    /// Source path as reported by the service
    pub path: PathBuf,
    /// Lowercase extension including the dot (".mp3")
    pub extension: String,
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Extended tag name → value (e.g. `musicbrainz_albumid`)
    #[serde(default)]
    pub extended_tags: BTreeMap<String, String>,
}

impl Track {
    pub fn new(filename: impl Into<String>, path: impl Into<PathBuf>, size_bytes: u64) -> Self {
        let filename = filename.into();
        let extension = std::path::Path::new(&filename)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        Self {
            filename,
            path: path.into(),
            extension,
            size_bytes,
            title: None,
            artist: None,
            album: None,
            year: None,
            extended_tags: BTreeMap::new(),
        }
    }
}

/// Identification outcome for an album
///
/// Carried on the wire as a free-form string. Unclear and Error keep the
/// service's raw text (`"Unclear (Low Confidence)"`, `"API Error: 503"`) so it
/// is shown verbatim and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AlbumStatus {
    #[default]
    Pending,
    Match,
    Unclear(String),
    NotFound,
    Error(String),
}

impl AlbumStatus {
    /// Anything that is not a Match still needs a human to look at it
    pub fn needs_attention(&self) -> bool {
        !self.is_match()
    }

    pub fn is_match(&self) -> bool {
        matches!(self, AlbumStatus::Match)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, AlbumStatus::Error(_))
    }
}

impl From<String> for AlbumStatus {
    fn from(raw: String) -> Self {
        let unclear = raw.trim_start().starts_with("Unclear");
        match raw.trim() {
            "" | "Pending" => AlbumStatus::Pending,
            "Match" => AlbumStatus::Match,
            "NotFound" => AlbumStatus::NotFound,
            _ if unclear => AlbumStatus::Unclear(raw),
            _ => AlbumStatus::Error(raw),
        }
    }
}

impl From<AlbumStatus> for String {
    fn from(status: AlbumStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for AlbumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlbumStatus::Pending => f.write_str("Pending"),
            AlbumStatus::Match => f.write_str("Match"),
            AlbumStatus::Unclear(raw) => f.write_str(raw),
            AlbumStatus::NotFound => f.write_str("NotFound"),
            AlbumStatus::Error(raw) => f.write_str(raw),
        }
    }
}

/// The service sends `null` for albums it has not looked at yet
fn status_or_pending<'de, D>(deserializer: D) -> Result<AlbumStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(AlbumStatus::from).unwrap_or_default())
}

/// A directory-scoped group of tracks treated as one unit through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    /// Stable identifier (the service uses the scanned directory path)
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Source directory, later the organize target
    pub path: PathBuf,
    /// Tracks in disc/track order as scanned
    #[serde(rename = "files", default)]
    pub tracks: Vec<Track>,
    #[serde(default, deserialize_with = "status_or_pending")]
    pub status: AlbumStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_art_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_cover_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mb_release_id: Option<String>,
    /// Per-track metadata, parallel to `tracks` when its length matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracks_metadata: Option<Vec<BTreeMap<String, String>>>,
    #[serde(default)]
    pub extended_metadata: BTreeMap<String, String>,
}

impl Album {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            year: None,
            path: path.into(),
            tracks: Vec::new(),
            status: AlbumStatus::Pending,
            cover_art_url: None,
            local_cover_path: None,
            mb_release_id: None,
            tracks_metadata: None,
            extended_metadata: BTreeMap::new(),
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Per-track metadata, only when it lines up one-to-one with the tracks
    pub fn aligned_tracks_metadata(&self) -> Option<&[BTreeMap<String, String>]> {
        self.tracks_metadata
            .as_deref()
            .filter(|meta| meta.len() == self.tracks.len())
    }

    /// Target folder name used by the organize stage: "Artist - Title - (Year)"
    pub fn folder_name(&self) -> String {
        match self.year {
            Some(year) => format!("{} - {} - ({})", self.artist, self.title, year),
            None => format!("{} - {}", self.artist, self.title),
        }
    }
}

/// Artist credit on a candidate release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistCredit {
    pub name: String,
}

/// Label entry on a candidate release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(
        rename = "catalog-number",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub catalog_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverArtArchive {
    #[serde(default)]
    pub front: bool,
}

/// A search result from the metadata service, not yet bound to an album
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRelease {
    /// Release MBID
    pub id: String,
    pub title: String,
    #[serde(rename = "artist-credit", default)]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(rename = "track-count", default, skip_serializing_if = "Option::is_none")]
    pub track_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "label-info", default)]
    pub label_info: Vec<LabelInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(
        rename = "cover-art-archive",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cover_art_archive: Option<CoverArtArchive>,
}

impl CandidateRelease {
    pub fn artist_names(&self) -> Vec<&str> {
        self.artist_credit.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_cover_art(&self) -> bool {
        self.cover_art_archive.map(|c| c.front).unwrap_or(false)
    }

    /// First label name, if the release lists one
    pub fn label_name(&self) -> Option<&str> {
        self.label_info
            .iter()
            .find_map(|info| info.label.as_ref().map(|l| l.name.as_str()))
    }
}
