//! Scripted stand-in for the processing service
//!
//! Every method answers from a canned response and records the call, so
//! tests can assert exactly which remote operations a flow issued.

use async_trait::async_trait;
use mtm_common::{Album, CandidateRelease};
use mtm_orchestrator::gateway::{
    Connectivity, GatewayError, OrganizeAck, OrganizeRequest, ProcessingGateway, ScanRequest,
    SearchRequest, ServiceHealth, ShutdownAck,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A recorded remote call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Scan { input_path: String, output_path: String },
    Identify(Vec<String>),
    Search { artist: String, album: String },
    Resolve { album_id: String, release_id: String },
    Tag(Vec<String>),
    Organize { album_ids: Vec<String>, output_path: String },
    Health,
    Connectivity,
    Shutdown,
}

fn ids(albums: &[Album]) -> Vec<String> {
    albums.iter().map(|a| a.id.clone()).collect()
}

fn status_error(status: u16, body: &str) -> GatewayError {
    GatewayError::Status {
        status,
        body: body.to_string(),
    }
}

#[derive(Default)]
pub struct MockGateway {
    scan: Option<Result<Vec<Album>, GatewayError>>,
    identify: Option<Result<Vec<Album>, GatewayError>>,
    tag_error: Option<GatewayError>,
    search: Option<Result<Vec<CandidateRelease>, GatewayError>>,
    resolve: Option<Result<Album, GatewayError>>,
    organize_failures: HashSet<String>,
    organize_delay: Duration,
    health: Option<Result<ServiceHealth, GatewayError>>,

    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGateway {
    /// Scan finds nothing; identify and tag echo their input
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scan(mut self, albums: Vec<Album>) -> Self {
        self.scan = Some(Ok(albums));
        self
    }

    pub fn fail_scan(mut self, status: u16, body: &str) -> Self {
        self.scan = Some(Err(status_error(status, body)));
        self
    }

    /// Identify answers with these albums instead of echoing the batch
    pub fn with_identify(mut self, albums: Vec<Album>) -> Self {
        self.identify = Some(Ok(albums));
        self
    }

    pub fn fail_identify(mut self, status: u16, body: &str) -> Self {
        self.identify = Some(Err(status_error(status, body)));
        self
    }

    pub fn fail_tag(mut self, status: u16, body: &str) -> Self {
        self.tag_error = Some(status_error(status, body));
        self
    }

    pub fn with_search(mut self, candidates: Vec<CandidateRelease>) -> Self {
        self.search = Some(Ok(candidates));
        self
    }

    pub fn with_resolve(mut self, album: Album) -> Self {
        self.resolve = Some(Ok(album));
        self
    }

    pub fn fail_resolve(mut self, status: u16, body: &str) -> Self {
        self.resolve = Some(Err(status_error(status, body)));
        self
    }

    /// Organize calls for this album fail with HTTP 500
    pub fn fail_organize_for(mut self, album_id: &str) -> Self {
        self.organize_failures.insert(album_id.to_string());
        self
    }

    /// Each organize call takes this long to settle
    pub fn with_organize_delay(mut self, delay: Duration) -> Self {
        self.organize_delay = delay;
        self
    }

    pub fn with_health(mut self, status: &str) -> Self {
        self.health = Some(Ok(ServiceHealth {
            status: status.to_string(),
        }));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Drain the call log
    pub fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    /// Album ids of every organize call, in issue order
    pub fn organized_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Organize { album_ids, .. } => Some(album_ids),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Album ids of the tag calls, in issue order
    pub fn tagged_ids(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Tag(ids) => Some(ids),
                _ => None,
            })
            .collect()
    }

    /// Highest number of organize calls that were ever open at once
    pub fn max_concurrent_organize(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ProcessingGateway for MockGateway {
    async fn scan(&self, request: &ScanRequest) -> Result<Vec<Album>, GatewayError> {
        self.record(Call::Scan {
            input_path: request.input_path.clone(),
            output_path: request.output_path.clone(),
        });
        self.scan.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn identify(&self, albums: &[Album]) -> Result<Vec<Album>, GatewayError> {
        self.record(Call::Identify(ids(albums)));
        self.identify.clone().unwrap_or_else(|| Ok(albums.to_vec()))
    }

    async fn search(&self, request: &SearchRequest) -> Result<Vec<CandidateRelease>, GatewayError> {
        self.record(Call::Search {
            artist: request.artist.clone(),
            album: request.album.clone(),
        });
        self.search.clone().unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn resolve(&self, album: &Album, release_id: &str) -> Result<Album, GatewayError> {
        self.record(Call::Resolve {
            album_id: album.id.clone(),
            release_id: release_id.to_string(),
        });
        self.resolve
            .clone()
            .unwrap_or_else(|| Err(status_error(404, "Release not found")))
    }

    async fn tag(&self, albums: &[Album]) -> Result<Vec<Album>, GatewayError> {
        self.record(Call::Tag(ids(albums)));
        match &self.tag_error {
            Some(err) => Err(err.clone()),
            None => Ok(albums.to_vec()),
        }
    }

    async fn organize(&self, request: &OrganizeRequest) -> Result<OrganizeAck, GatewayError> {
        self.record(Call::Organize {
            album_ids: ids(&request.albums),
            output_path: request.output_path.clone(),
        });

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.organize_delay.is_zero() {
            tokio::time::sleep(self.organize_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if request
            .albums
            .iter()
            .any(|a| self.organize_failures.contains(&a.id))
        {
            return Err(status_error(500, "Target folder is read-only"));
        }

        let moved = request.albums.iter().filter(|a| a.status.is_match()).count();
        Ok(OrganizeAck {
            attempted: request.albums.len(),
            moved,
        })
    }

    async fn health(&self) -> Result<ServiceHealth, GatewayError> {
        self.record(Call::Health);
        self.health.clone().unwrap_or_else(|| {
            Ok(ServiceHealth {
                status: "ok".to_string(),
            })
        })
    }

    async fn metadata_connectivity(&self) -> Result<Connectivity, GatewayError> {
        self.record(Call::Connectivity);
        Ok(Connectivity {
            status: "online".to_string(),
            message: "MusicBrainz reachable".to_string(),
        })
    }

    async fn shutdown(&self) -> Result<ShutdownAck, GatewayError> {
        self.record(Call::Shutdown);
        Ok(ShutdownAck {
            status: "ok".to_string(),
            message: "Shutting down".to_string(),
        })
    }
}
