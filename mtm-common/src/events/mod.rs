//! Event types for the MTM event system
//!
//! Provides shared event definitions and the EventBus used to fan pipeline
//! progress out to any number of observers (SSE clients, the CLI, tests).

mod pipeline_types;

pub use pipeline_types::{OrganizeOutcome, PipelineStage, SessionCounters};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// MTM event types
///
/// Events are broadcast via EventBus and serialized as-is for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MtmEvent {
    /// A full Scan→Identify→Tag→Organize run was accepted
    RunStarted {
        run_id: Uuid,
        input_path: String,
        output_path: String,
        timestamp: DateTime<Utc>,
    },

    /// A scoped Tag→Organize re-run was accepted
    ReprocessStarted {
        run_id: Uuid,
        /// Album ids the re-run is restricted to
        scope: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A stage began issuing remote calls
    StageStarted {
        run_id: Uuid,
        stage: PipelineStage,
        timestamp: DateTime<Utc>,
    },

    /// A stage finished and its result was written to the session
    StageCompleted {
        run_id: Uuid,
        stage: PipelineStage,
        /// Albums produced (or processed, for Organize) by the stage
        albums: usize,
        timestamp: DateTime<Utc>,
    },

    /// Derived session counters changed
    CountersUpdated {
        counters: SessionCounters,
        timestamp: DateTime<Utc>,
    },

    /// One organize call settled
    OrganizeProgress {
        run_id: Uuid,
        album_id: String,
        processed: usize,
        total: usize,
        /// 0-100, never decreasing within a run
        percent: u8,
        outcome: OrganizeOutcome,
        timestamp: DateTime<Utc>,
    },

    /// Run reached its terminal success state
    RunCompleted {
        run_id: Uuid,
        duration_ms: u64,
        organize_failures: usize,
        timestamp: DateTime<Utc>,
    },

    /// Run aborted; remaining stages were skipped
    RunFailed {
        run_id: Uuid,
        stage: Option<PipelineStage>,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// An album was manually bound to a release
    AlbumResolved {
        album_id: String,
        release_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The session was narrowed to the focus working set
    FocusApplied {
        remaining: usize,
        manually_fixed: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl MtmEvent {
    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            MtmEvent::RunStarted { .. } => "RunStarted",
            MtmEvent::ReprocessStarted { .. } => "ReprocessStarted",
            MtmEvent::StageStarted { .. } => "StageStarted",
            MtmEvent::StageCompleted { .. } => "StageCompleted",
            MtmEvent::CountersUpdated { .. } => "CountersUpdated",
            MtmEvent::OrganizeProgress { .. } => "OrganizeProgress",
            MtmEvent::RunCompleted { .. } => "RunCompleted",
            MtmEvent::RunFailed { .. } => "RunFailed",
            MtmEvent::AlbumResolved { .. } => "AlbumResolved",
            MtmEvent::FocusApplied { .. } => "FocusApplied",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// # Examples
///
/// ```
/// use mtm_common::events::{EventBus, MtmEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(MtmEvent::AlbumResolved {
///     album_id: "album-1".to_string(),
///     release_id: "rel-42".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MtmEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging subscribers
    ///   start missing old events. 100 is plenty for a single UI.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MtmEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: MtmEvent) -> Result<usize, broadcast::error::SendError<MtmEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MtmEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
