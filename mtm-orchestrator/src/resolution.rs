//! Manual resolution flow
//!
//! Lets a user pick the right release for an album the identify stage could
//! not settle. A successful resolve rewrites the album in the session and
//! narrows the working set (see [`crate::focus`]).

use crate::error::PipelineError;
use crate::gateway::{ProcessingGateway, SearchRequest};
use crate::session::SessionStore;
use chrono::Utc;
use mtm_common::events::{EventBus, MtmEvent};
use mtm_common::{Album, CandidateRelease};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Results of one search, tagged with the generation that produced them
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub generation: u64,
    pub artist: String,
    pub album: String,
    pub candidates: Vec<CandidateRelease>,
}

pub struct ResolutionFlow {
    gateway: Arc<dyn ProcessingGateway>,
    store: SessionStore,
    event_bus: EventBus,
    run_lock: Arc<Mutex<()>>,
    generation: AtomicU64,
    latest: RwLock<Option<SearchResults>>,
}

impl ResolutionFlow {
    /// `run_lock` must be the pipeline controller's lock, so a resolve never
    /// interleaves with a run rewriting the same session
    pub fn new(
        gateway: Arc<dyn ProcessingGateway>,
        store: SessionStore,
        event_bus: EventBus,
        run_lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            gateway,
            store,
            event_bus,
            run_lock,
            generation: AtomicU64::new(0),
            latest: RwLock::new(None),
        }
    }

    /// Query candidate releases
    ///
    /// Results always go back to the caller; they are kept as the latest
    /// candidates only if no newer search was issued in the meantime.
    pub async fn search(&self, artist: &str, album: &str) -> Result<SearchResults, PipelineError> {
        let artist = artist.trim();
        let album = album.trim();
        if artist.is_empty() && album.is_empty() {
            return Err(PipelineError::InvalidInput(
                "artist and album query are both empty".to_string(),
            ));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = SearchRequest {
            artist: artist.to_string(),
            album: album.to_string(),
        };

        let candidates = self.gateway.search(&request).await.map_err(|e| {
            warn!(generation, error = %e, "Release search failed");
            PipelineError::Resolution(e.detail())
        })?;

        let results = SearchResults {
            generation,
            artist: request.artist,
            album: request.album,
            candidates,
        };

        let mut latest = self.latest.write().await;
        if generation == self.generation.load(Ordering::SeqCst) {
            *latest = Some(results.clone());
        } else {
            tracing::debug!(generation, "Discarding results of a superseded search");
        }

        info!(
            generation,
            candidates = results.candidates.len(),
            "Release search complete"
        );
        Ok(results)
    }

    pub async fn latest_candidates(&self) -> Option<SearchResults> {
        self.latest.read().await.clone()
    }

    /// Bind `album_id` to `release_id` and narrow the session around it
    ///
    /// On any failure the session is left exactly as it was.
    pub async fn resolve(&self, album_id: &str, release_id: &str) -> Result<Album, PipelineError> {
        if release_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput("release id is empty".to_string()));
        }

        let _guard = self.run_lock.try_lock().map_err(|_| {
            PipelineError::Busy("cannot resolve while a pipeline run is active".to_string())
        })?;

        let album = self
            .store
            .snapshot()
            .find_identified(album_id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("album {}", album_id)))?;

        let updated = self
            .gateway
            .resolve(&album, release_id)
            .await
            .map_err(|e| {
                warn!(album_id, release_id, error = %e, "Resolve call failed");
                PipelineError::Resolution(e.detail())
            })?;

        if updated.status.is_error() {
            warn!(album_id, release_id, status = %updated.status, "Resolve returned an error status");
            return Err(PipelineError::Resolution(updated.status.to_string()));
        }

        let updated = project_track_metadata(updated);
        let session = self.store.update(|s| s.apply_focus_filter(updated.clone()));

        info!(
            album_id,
            release_id,
            remaining = session.identified.len(),
            "Album resolved manually"
        );

        self.event_bus.emit_lossy(MtmEvent::AlbumResolved {
            album_id: updated.id.clone(),
            release_id: release_id.to_string(),
            timestamp: Utc::now(),
        });
        self.event_bus.emit_lossy(MtmEvent::FocusApplied {
            remaining: session.identified.len(),
            manually_fixed: session.manually_fixed.iter().cloned().collect(),
            timestamp: Utc::now(),
        });
        self.event_bus.emit_lossy(MtmEvent::CountersUpdated {
            counters: session.counters,
            timestamp: Utc::now(),
        });

        Ok(updated)
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Copy release metadata onto the album's tracks
///
/// Applies only when `tracks_metadata` lines up with the tracks. Remote values
/// win, but an empty value never clears a known one.
pub fn project_track_metadata(mut album: Album) -> Album {
    let Some(metadata) = album.aligned_tracks_metadata().map(<[_]>::to_vec) else {
        return album;
    };

    let album_title = Some(album.title.clone()).filter(|t| !t.trim().is_empty());
    let album_artist = Some(album.artist.clone()).filter(|a| !a.trim().is_empty());

    for (track, entry) in album.tracks.iter_mut().zip(metadata.iter()) {
        if let Some(title) = non_empty(entry.get("title")) {
            track.title = Some(title.to_string());
        }

        if let Some(artist) = non_empty(entry.get("artist")) {
            track.artist = Some(artist.to_string());
        } else if let Some(artist) = &album_artist {
            track.artist = Some(artist.clone());
        }

        if let Some(title) = &album_title {
            track.album = Some(title.clone());
        }
    }

    album
}
