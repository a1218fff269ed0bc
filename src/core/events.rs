//! Lifecycle events emitted while a request is processed.
//!
//! Events are recorded into the [`Response`](super::Response) and, when
//! the caller asked for streaming, pushed into a bounded channel as they
//! occur. A dropped receiver is not an error: the request keeps running
//! and only the recording side is kept.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::debug;

use super::mode::Mode;
use crate::error::ErrorReport;

/// A named event in the request lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Processing started.
    Start {
        /// Trace identifier.
        trace_id: String,
        /// Mode as requested by the caller.
        requested_mode: Mode,
    },
    /// A processing stage made progress.
    Progress {
        /// Stage name (e.g. `"route"`, `"plan"`, `"search"`).
        stage: String,
        /// Human-readable detail.
        message: String,
    },
    /// A piece of result text.
    PartialResult {
        /// Text chunk.
        content: String,
    },
    /// Terminal failure.
    Error {
        /// Structured error.
        report: ErrorReport,
        /// Final response metadata, including any partial workflow state.
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        metadata: Map<String, Value>,
    },
    /// Terminal success marker.
    End {
        /// Trace identifier.
        trace_id: String,
        /// Resolved mode.
        mode: Mode,
        /// Whether the result was served from the cache.
        cache_hit: bool,
        /// Final response metadata.
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        metadata: Map<String, Value>,
    },
}

impl LifecycleEvent {
    /// Creates a progress event.
    pub fn progress(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Progress {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for `Error` and `End`, which close the sequence.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Error { .. } | Self::End { .. })
    }
}

/// Records events and forwards them to an optional subscriber.
#[derive(Debug, Default)]
pub struct EventRecorder {
    events: Vec<LifecycleEvent>,
    sender: Option<mpsc::Sender<LifecycleEvent>>,
}

impl EventRecorder {
    /// Recorder without a subscriber.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that also pushes every event into `sender`.
    #[must_use]
    pub const fn with_subscriber(sender: mpsc::Sender<LifecycleEvent>) -> Self {
        Self {
            events: Vec::new(),
            sender: Some(sender),
        }
    }

    /// Records `event` and forwards it to the subscriber.
    ///
    /// Waits for channel capacity when the subscriber lags. If the
    /// subscriber has gone away, forwarding stops for the rest of the
    /// request.
    pub async fn emit(&mut self, event: LifecycleEvent) {
        self.events.push(event.clone());
        if let Some(sender) = &self.sender
            && sender.send(event).await.is_err()
        {
            debug!("event subscriber dropped; continuing without streaming");
            self.sender = None;
        }
    }

    /// Whether a subscriber is still attached.
    #[must_use]
    pub const fn has_subscriber(&self) -> bool {
        self.sender.is_some()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Consumes the recorder, returning the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<LifecycleEvent> {
        self.events
    }
}
