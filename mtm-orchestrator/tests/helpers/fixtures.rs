//! Album builders and state setup

use mtm_common::events::EventBus;
use mtm_common::models::{ArtistCredit, CandidateRelease};
use mtm_common::{Album, AlbumStatus, Track};
use mtm_orchestrator::gateway::ProcessingGateway;
use mtm_orchestrator::session::{PipelineStatus, Session, SessionStore};
use mtm_orchestrator::AppState;
use std::sync::Arc;
use std::time::Duration;

use super::MockGateway;

/// Album `id` under /music/in with `tracks` numbered files
pub fn album(id: &str, tracks: usize, status: AlbumStatus) -> Album {
    let dir = format!("/music/in/{}", id);
    let mut album = Album::new(id, format!("Album {}", id), "Some Band", dir.clone());
    album.tracks = (1..=tracks)
        .map(|n| {
            let filename = format!("{:02} - Track {}.mp3", n, n);
            let path = format!("{}/{}", dir, filename);
            Track::new(filename, path, 4_000_000 + n as u64)
        })
        .collect();
    album.status = status;
    album
}

pub fn album_with_year(id: &str, tracks: usize, status: AlbumStatus, year: i32) -> Album {
    let mut album = album(id, tracks, status);
    album.year = Some(year);
    album
}

pub fn candidate(id: &str, title: &str, artist: &str) -> CandidateRelease {
    CandidateRelease {
        id: id.to_string(),
        title: title.to_string(),
        artist_credit: vec![ArtistCredit {
            name: artist.to_string(),
        }],
        track_count: Some(2),
        date: Some("1999-04-01".to_string()),
        label_info: Vec::new(),
        score: Some(100),
        cover_art_archive: None,
    }
}

/// AppState over a mock gateway; the mock stays reachable for assertions
pub fn test_state(mock: MockGateway) -> (AppState, Arc<MockGateway>) {
    let mock = Arc::new(mock);
    let gateway: Arc<dyn ProcessingGateway> = mock.clone();
    let state = AppState::new(gateway, EventBus::new(256));
    (state, mock)
}

/// Wait until the session satisfies `done`
pub async fn wait_for<F>(store: &SessionStore, done: F) -> Arc<Session>
where
    F: Fn(&Session) -> bool,
{
    let mut rx = store.subscribe();
    let wait = async {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            if done(&snapshot) {
                return snapshot;
            }
            if rx.changed().await.is_err() {
                return store.snapshot();
            }
        }
    };

    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("session did not reach the expected state in time")
}

/// Wait until the session status satisfies `done`
pub async fn wait_for_status<F>(store: &SessionStore, done: F) -> Arc<Session>
where
    F: Fn(&PipelineStatus) -> bool,
{
    wait_for(store, |session| done(&session.status)).await
}
