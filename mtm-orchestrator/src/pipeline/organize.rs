//! Organize queue
//!
//! Albums are organized strictly one at a time, in the order the tag stage
//! returned them. A failed call is recorded against its album and the queue
//! moves on; nothing is retried.

use crate::gateway::{OrganizeRequest, ProcessingGateway};
use mtm_common::events::OrganizeOutcome;
use mtm_common::Album;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Percentage of the queue settled, rounded up
///
/// Rounds up rather than to nearest: 1 of 3 reads 34, not 33, so every tick
/// moves the bar and the last one lands on exactly 100. An empty queue is done.
pub fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let percent = (processed.min(total) * 100 + total - 1) / total;
    percent.min(100) as u8
}

/// One settled organize call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizeTick {
    pub album_id: String,
    pub processed: usize,
    pub total: usize,
    pub percent: u8,
    pub outcome: OrganizeOutcome,
}

/// Tally of a drained (or cancelled) queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizeReport {
    pub processed: usize,
    pub moved: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Stopped early because the token was cancelled
    pub cancelled: bool,
}

impl OrganizeReport {
    fn record(&mut self, outcome: &OrganizeOutcome) {
        self.processed += 1;
        match outcome {
            OrganizeOutcome::Moved => self.moved += 1,
            OrganizeOutcome::Skipped => self.skipped += 1,
            OrganizeOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// FIFO of albums waiting to be organized
#[derive(Debug)]
pub struct OrganizeQueue {
    pending: VecDeque<Album>,
    total: usize,
}

impl OrganizeQueue {
    pub fn new(albums: Vec<Album>) -> Self {
        let total = albums.len();
        Self {
            pending: albums.into(),
            total,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Issue one organize call per album, awaiting each before the next
    ///
    /// `on_tick` runs after every settled call, in queue order. The token is
    /// checked between albums; a call already in flight is never abandoned.
    pub async fn drive<F>(
        mut self,
        gateway: &dyn ProcessingGateway,
        output_path: &str,
        cancel: &CancellationToken,
        mut on_tick: F,
    ) -> OrganizeReport
    where
        F: FnMut(&OrganizeTick),
    {
        let mut report = OrganizeReport::default();

        while let Some(album) = self.pending.pop_front() {
            if cancel.is_cancelled() {
                debug!(remaining = self.pending.len() + 1, "Organize queue cancelled");
                report.cancelled = true;
                break;
            }

            let album_id = album.id.clone();
            let request = OrganizeRequest {
                albums: vec![album],
                output_path: output_path.to_string(),
            };

            let outcome = match gateway.organize(&request).await {
                Ok(ack) if ack.moved > 0 => OrganizeOutcome::Moved,
                Ok(_) => OrganizeOutcome::Skipped,
                Err(e) => {
                    warn!(album_id = %album_id, error = %e, "Organize failed for album");
                    OrganizeOutcome::Failed(e.detail())
                }
            };

            report.record(&outcome);
            let tick = OrganizeTick {
                album_id,
                processed: report.processed,
                total: self.total,
                percent: progress_percent(report.processed, self.total),
                outcome,
            };
            debug!(
                album_id = %tick.album_id,
                processed = tick.processed,
                total = tick.total,
                percent = tick.percent,
                "Organize call settled"
            );
            on_tick(&tick);
        }

        report
    }
}
