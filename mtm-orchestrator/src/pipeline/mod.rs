//! Pipeline controller
//!
//! Drives Scan → Identify → Tag → Organize against the processing service.
//!
//! # State Progression
//! IDLE → SCANNING → IDENTIFYING → TAGGING → ORGANIZING → FINISHED
//!
//! Any stage failure moves the session to ERROR (or NO_FILES_FOUND for an
//! empty scan) and skips the remaining stages. Collections written before the
//! failure stay in the session for inspection.
//!
//! Each stage is handled by a dedicated `phase_*` method. `reprocess` re-enters
//! the pipeline at TAGGING with a narrowed scope.

pub mod organize;

pub use organize::{progress_percent, OrganizeQueue, OrganizeReport, OrganizeTick};

use crate::error::PipelineError;
use crate::gateway::{ProcessingGateway, ScanRequest};
use crate::session::{PipelineStatus, Session, SessionStore};
use chrono::Utc;
use mtm_common::events::{EventBus, MtmEvent, PipelineStage};
use mtm_common::Album;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Terminal status of a successful run or reprocess
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub albums_scanned: usize,
    pub albums_identified: usize,
    pub albums_tagged: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

/// A run accepted for background execution
pub struct StartedRun {
    pub run_id: Uuid,
    pub handle: JoinHandle<Result<RunSummary, PipelineError>>,
}

/// Exclusive hold on the pipeline; dropping it lets the next operation in
pub type RunGuard = OwnedMutexGuard<()>;

/// Pipeline controller
pub struct PipelineController {
    gateway: Arc<dyn ProcessingGateway>,
    store: SessionStore,
    event_bus: EventBus,
    run_lock: Arc<Mutex<()>>,
    cancel: std::sync::Mutex<CancellationToken>,
}

impl PipelineController {
    pub fn new(gateway: Arc<dyn ProcessingGateway>, store: SessionStore, event_bus: EventBus) -> Self {
        Self {
            gateway,
            store,
            event_bus,
            run_lock: Arc::new(Mutex::new(())),
            cancel: std::sync::Mutex::new(CancellationToken::new()),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Lock shared with anything else that rewrites the session
    pub fn run_lock(&self) -> Arc<Mutex<()>> {
        self.run_lock.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Token of the current (or last) organize pass
    pub fn cancellation_token(&self) -> CancellationToken {
        match self.cancel.lock() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn fresh_cancellation_token(&self) -> CancellationToken {
        let token = CancellationToken::new();
        match self.cancel.lock() {
            Ok(mut slot) => *slot = token.clone(),
            Err(poisoned) => *poisoned.into_inner() = token.clone(),
        }
        token
    }

    fn try_acquire(&self) -> Result<RunGuard, PipelineError> {
        self.run_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| PipelineError::Busy("a pipeline operation is already running".to_string()))
    }

    fn validate_locations(input_path: &str, output_path: &str) -> Result<(), PipelineError> {
        if input_path.trim().is_empty() {
            return Err(PipelineError::InvalidInput("input location is empty".to_string()));
        }
        if output_path.trim().is_empty() {
            return Err(PipelineError::InvalidInput("output location is empty".to_string()));
        }
        Ok(())
    }

    /// Execute a full run and wait for it to finish
    pub async fn run(&self, input_path: &str, output_path: &str) -> Result<RunSummary, PipelineError> {
        Self::validate_locations(input_path, output_path)?;
        let _guard = self.try_acquire()?;
        self.execute_run(Uuid::new_v4(), input_path, output_path).await
    }

    /// Accept a full run and execute it in the background
    ///
    /// Validation and the busy check happen before this returns, so callers
    /// get InvalidInput / Busy synchronously and a run id otherwise.
    pub fn start_run(self: &Arc<Self>, input_path: String, output_path: String) -> Result<StartedRun, PipelineError> {
        Self::validate_locations(&input_path, &output_path)?;
        let guard = self.try_acquire()?;
        let run_id = Uuid::new_v4();

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            info!(run_id = %run_id, "Background pipeline run started");
            controller.execute_run(run_id, &input_path, &output_path).await
        });

        Ok(StartedRun { run_id, handle })
    }

    /// Scoped Tag → Organize re-run and wait for it to finish
    pub async fn reprocess(&self) -> Result<RunSummary, PipelineError> {
        let _guard = self.try_acquire()?;
        self.execute_reprocess(Uuid::new_v4()).await
    }

    /// Accept a reprocess and execute it in the background
    pub fn start_reprocess(self: &Arc<Self>) -> Result<StartedRun, PipelineError> {
        let guard = self.try_acquire()?;
        let run_id = Uuid::new_v4();

        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            info!(run_id = %run_id, "Background reprocess started");
            controller.execute_reprocess(run_id).await
        });

        Ok(StartedRun { run_id, handle })
    }

    async fn execute_run(&self, run_id: Uuid, input_path: &str, output_path: &str) -> Result<RunSummary, PipelineError> {
        let span = tracing::info_span!("pipeline_run", run_id = %run_id);
        async {
            let started = Instant::now();
            info!(input_path, output_path, "Starting pipeline run");

            self.store.update(|s| {
                s.reset_for_run(run_id, input_path, output_path)
                    .with_status(PipelineStatus::Scanning)
            });
            self.event_bus.emit_lossy(MtmEvent::RunStarted {
                run_id,
                input_path: input_path.to_string(),
                output_path: output_path.to_string(),
                timestamp: Utc::now(),
            });

            let scanned = self
                .phase_scan(run_id, input_path, output_path)
                .await
                .map_err(|e| self.fail(run_id, e))?;
            let identified = self
                .phase_identify(run_id, &scanned)
                .await
                .map_err(|e| self.fail(run_id, e))?;

            let tagged = self
                .phase_tag(run_id, &identified)
                .await
                .map_err(|e| self.fail(run_id, e))?;

            let mut summary = self
                .organize_and_finish(run_id, identified.len(), tagged, output_path, started)
                .await;
            summary.albums_scanned = scanned.len();
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    async fn execute_reprocess(&self, run_id: Uuid) -> Result<RunSummary, PipelineError> {
        let span = tracing::info_span!("pipeline_reprocess", run_id = %run_id);
        async {
            let started = Instant::now();
            let snapshot = self.store.snapshot();
            let output_path = snapshot.output_path.clone().ok_or_else(|| {
                PipelineError::InvalidInput("no previous run to reprocess".to_string())
            })?;

            let scope = reprocess_scope(&snapshot);
            let narrowed = !snapshot.manually_fixed.is_empty();
            info!(
                scope = scope.len(),
                manually_fixed = snapshot.manually_fixed.len(),
                "Starting reprocess"
            );

            // manually_fixed survives until the re-run completes
            let session = self.store.update(|s| {
                let next = if narrowed { s.narrow_to_scope(&scope) } else { s.clone() };
                next.reset_progress().with_run_id(run_id)
            });
            self.event_bus.emit_lossy(MtmEvent::ReprocessStarted {
                run_id,
                scope: scope.iter().map(|a| a.id.clone()).collect(),
                timestamp: Utc::now(),
            });
            if narrowed {
                self.emit_counters(&session);
            }

            let tagged = if scope.is_empty() {
                info!("Nothing in scope, skipping tag");
                Vec::new()
            } else {
                self.phase_tag(run_id, &scope)
                    .await
                    .map_err(|e| self.fail(run_id, e))?
            };

            let mut summary = self
                .organize_and_finish(run_id, scope.len(), tagged, &output_path, started)
                .await;
            summary.albums_scanned = self.store.snapshot().scanned.len();
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Organize and the terminal transition, shared by run and reprocess
    ///
    /// Completion consumes the manually fixed set; a full run starts with it
    /// empty anyway.
    async fn organize_and_finish(
        &self,
        run_id: Uuid,
        albums_identified: usize,
        tagged: Vec<Album>,
        output_path: &str,
        started: Instant,
    ) -> RunSummary {
        let albums_tagged = tagged.len();
        let report = self.phase_organize(run_id, tagged, output_path).await;

        let duration_ms = started.elapsed().as_millis() as u64;
        self.store.update(|s| {
            s.clear_manually_fixed()
                .with_status(PipelineStatus::Finished)
        });
        self.event_bus.emit_lossy(MtmEvent::RunCompleted {
            run_id,
            duration_ms,
            organize_failures: report.failed,
            timestamp: Utc::now(),
        });

        if report.failed > 0 {
            warn!(failed = report.failed, "Run finished with organize failures");
        }
        info!(
            moved = report.moved,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms,
            "Pipeline run finished"
        );

        RunSummary {
            run_id,
            albums_scanned: 0,
            albums_identified,
            albums_tagged,
            moved: report.moved,
            skipped: report.skipped,
            failed: report.failed,
            duration_ms,
        }
    }

    /// **SCANNING** - one call with both locations
    async fn phase_scan(&self, run_id: Uuid, input_path: &str, output_path: &str) -> Result<Vec<Album>, PipelineError> {
        self.stage_started(run_id, PipelineStage::Scan);

        let request = ScanRequest {
            input_path: input_path.to_string(),
            output_path: output_path.to_string(),
        };
        let albums = self
            .gateway
            .scan(&request)
            .await
            .map_err(|e| PipelineError::Scan(e.detail()))?;

        if albums.is_empty() {
            return Err(PipelineError::NoFilesFound(input_path.to_string()));
        }

        let session = self.store.update(|s| s.apply_scan_result(albums.clone()));
        info!(albums = albums.len(), tracks = session.counters.scanned_files, "Scan complete");
        self.stage_completed(run_id, PipelineStage::Scan, albums.len(), &session);
        Ok(albums)
    }

    /// **IDENTIFYING** - one batch call; per-album failures stay in each status
    async fn phase_identify(&self, run_id: Uuid, scanned: &[Album]) -> Result<Vec<Album>, PipelineError> {
        self.store.update(|s| s.with_status(PipelineStatus::Identifying));
        self.stage_started(run_id, PipelineStage::Identify);

        let albums = self
            .gateway
            .identify(scanned)
            .await
            .map_err(|e| PipelineError::Identify(e.detail()))?;

        let session = self.store.update(|s| s.apply_identify_result(albums));
        let item_errors = session.identified.iter().filter(|a| a.status.is_error()).count();
        if item_errors > 0 {
            warn!(albums = item_errors, "Identify reported per-album errors");
        }
        info!(
            albums = session.identified.len(),
            matches = session.counters.identified_matches,
            "Identify complete"
        );
        self.stage_completed(run_id, PipelineStage::Identify, session.identified.len(), &session);
        Ok(session.identified.clone())
    }

    /// **TAGGING** - one batch call over the whole scope
    async fn phase_tag(&self, run_id: Uuid, albums: &[Album]) -> Result<Vec<Album>, PipelineError> {
        self.store.update(|s| s.with_status(PipelineStatus::Tagging));
        self.stage_started(run_id, PipelineStage::Tag);

        let tagged = self
            .gateway
            .tag(albums)
            .await
            .map_err(|e| PipelineError::Tag(e.detail()))?;

        let session = self.store.update(|s| s.apply_tag_result(tagged.clone()));
        info!(albums = tagged.len(), tracks = session.counters.tagged_files, "Tag complete");
        self.stage_completed(run_id, PipelineStage::Tag, tagged.len(), &session);
        Ok(tagged)
    }

    /// **ORGANIZING** - one call per album, strictly in order
    async fn phase_organize(&self, run_id: Uuid, tagged: Vec<Album>, output_path: &str) -> OrganizeReport {
        self.store
            .update(|s| s.reset_progress().with_status(PipelineStatus::Organizing));
        self.stage_started(run_id, PipelineStage::Organize);

        let queue = OrganizeQueue::new(tagged);
        let total = queue.total();
        if queue.is_empty() {
            self.store.update(|s| s.apply_progress_tick(100));
            info!("Organize queue empty, progress complete");
        }

        let cancel = self.fresh_cancellation_token();
        let report = queue
            .drive(self.gateway.as_ref(), output_path, &cancel, |tick| {
                self.store.update(|s| {
                    s.apply_organize_outcome(&tick.album_id, tick.outcome.clone(), tick.percent)
                });
                self.event_bus.emit_lossy(MtmEvent::OrganizeProgress {
                    run_id,
                    album_id: tick.album_id.clone(),
                    processed: tick.processed,
                    total: tick.total,
                    percent: tick.percent,
                    outcome: tick.outcome.clone(),
                    timestamp: Utc::now(),
                });
            })
            .await;

        self.event_bus.emit_lossy(MtmEvent::StageCompleted {
            run_id,
            stage: PipelineStage::Organize,
            albums: total,
            timestamp: Utc::now(),
        });
        report
    }

    fn stage_started(&self, run_id: Uuid, stage: PipelineStage) {
        info!(stage = %stage, "Stage started");
        self.event_bus.emit_lossy(MtmEvent::StageStarted {
            run_id,
            stage,
            timestamp: Utc::now(),
        });
    }

    fn stage_completed(&self, run_id: Uuid, stage: PipelineStage, albums: usize, session: &Session) {
        self.event_bus.emit_lossy(MtmEvent::StageCompleted {
            run_id,
            stage,
            albums,
            timestamp: Utc::now(),
        });
        self.emit_counters(session);
    }

    fn emit_counters(&self, session: &Session) {
        self.event_bus.emit_lossy(MtmEvent::CountersUpdated {
            counters: session.counters,
            timestamp: Utc::now(),
        });
    }

    /// Record a stage failure in the session and on the bus
    fn fail(&self, run_id: Uuid, err: PipelineError) -> PipelineError {
        let status = match &err {
            PipelineError::NoFilesFound(_) => PipelineStatus::NoFilesFound,
            other => PipelineStatus::Error(other.to_string()),
        };
        match &err {
            PipelineError::NoFilesFound(path) => warn!(input_path = %path, "Scan found no albums"),
            other => error!(stage = ?other.stage(), error = %other, "Pipeline stage failed"),
        }

        self.store.update(|s| s.with_status(status));
        self.event_bus.emit_lossy(MtmEvent::RunFailed {
            run_id,
            stage: err.stage(),
            message: err.to_string(),
            timestamp: Utc::now(),
        });
        err
    }
}

/// Albums a reprocess works on
///
/// The manually fixed set when there is one; otherwise every Match album.
pub fn reprocess_scope(session: &Session) -> Vec<Album> {
    if session.manually_fixed.is_empty() {
        return session
            .identified
            .iter()
            .filter(|a| a.status.is_match())
            .cloned()
            .collect();
    }

    let fixed: &BTreeSet<String> = &session.manually_fixed;
    session
        .identified
        .iter()
        .filter(|a| fixed.contains(&a.id))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mtm_common::AlbumStatus;

    fn album(id: &str, status: AlbumStatus) -> Album {
        let mut album = Album::new(id, id, "Artist", format!("/in/{}", id));
        album.status = status;
        album
    }

    #[test]
    fn test_scope_prefers_manually_fixed() {
        let mut session = Session::default().apply_identify_result(vec![
            album("A", AlbumStatus::Match),
            album("B", AlbumStatus::Match),
            album("C", AlbumStatus::Unclear("Unclear".into())),
        ]);
        session.manually_fixed.insert("B".to_string());

        let ids: Vec<String> = reprocess_scope(&session).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["B"]);
    }

    #[test]
    fn test_scope_falls_back_to_matches() {
        let session = Session::default().apply_identify_result(vec![
            album("A", AlbumStatus::Match),
            album("B", AlbumStatus::Unclear("Unclear".into())),
            album("C", AlbumStatus::Match),
        ]);

        let ids: Vec<String> = reprocess_scope(&session).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["A", "C"]);
    }

    #[test]
    fn test_location_validation() {
        assert!(PipelineController::validate_locations("/in", "/out").is_ok());
        assert!(matches!(
            PipelineController::validate_locations("", "/out"),
            Err(PipelineError::InvalidInput(_))
        ));
        assert!(matches!(
            PipelineController::validate_locations("/in", "   "),
            Err(PipelineError::InvalidInput(_))
        ));
    }
}
