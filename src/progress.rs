// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Progress reporting for long-running topic scans.
//!
//! Consumers bump two counters per message; a background task publishes a
//! snapshot of both every interval until it is cancelled.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::service::DeserializedRecord;

/// Default period between progress snapshots.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// Event pushed to the stream consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Periodic counter snapshot
    Progress {
        messages_consumed: i64,
        bytes_consumed: i64,
    },
    /// The scan entered a new phase
    Phase(String),
    /// A decoded record
    Data(Box<DeserializedRecord>),
    /// The scan finished
    Done {
        elapsed_ms: i64,
        is_cancelled: bool,
        messages_consumed: i64,
        bytes_consumed: i64,
    },
    /// The scan failed
    Error(String),
}

/// Publishes scan progress over a channel.
#[derive(Debug)]
pub struct StreamProgressReporter {
    messages_consumed: AtomicI64,
    bytes_consumed: AtomicI64,
    events: UnboundedSender<ProgressEvent>,
    cancel: CancellationToken,
    interval: Duration,
}

impl StreamProgressReporter {
    /// Create a reporter that stops when `cancel` fires.
    pub fn new(events: UnboundedSender<ProgressEvent>, cancel: CancellationToken) -> Self {
        Self {
            messages_consumed: AtomicI64::new(0),
            bytes_consumed: AtomicI64::new(0),
            events,
            cancel,
            interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set the snapshot period.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawn the periodic reporting task.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let reporter = Arc::clone(self);
        tokio::spawn(async move { reporter.run().await })
    }

    async fn run(&self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(context = "progress_reporter", "Progress reporter stopping");
                    break;
                }
                _ = interval.tick() => {
                    if !self.report_progress() {
                        debug!(context = "progress_reporter", "Progress receiver dropped");
                        break;
                    }
                }
            }
        }
    }

    fn report_progress(&self) -> bool {
        self.events
            .send(ProgressEvent::Progress {
                messages_consumed: self.messages_consumed(),
                bytes_consumed: self.bytes_consumed(),
            })
            .is_ok()
    }

    pub fn messages_consumed(&self) -> i64 {
        self.messages_consumed.load(Ordering::Relaxed)
    }

    pub fn bytes_consumed(&self) -> i64 {
        self.bytes_consumed.load(Ordering::Relaxed)
    }

    pub fn on_phase(&self, name: impl Into<String>) {
        let _ = self.events.send(ProgressEvent::Phase(name.into()));
    }

    /// Count one consumed message of `size` bytes.
    pub fn on_message_consumed(&self, size: i64) {
        self.messages_consumed.fetch_add(1, Ordering::Relaxed);
        self.bytes_consumed.fetch_add(size, Ordering::Relaxed);
    }

    pub fn on_message(&self, record: DeserializedRecord) {
        let _ = self.events.send(ProgressEvent::Data(Box::new(record)));
    }

    pub fn on_complete(&self, elapsed_ms: i64, is_cancelled: bool) {
        let _ = self.events.send(ProgressEvent::Done {
            elapsed_ms,
            is_cancelled,
            messages_consumed: self.messages_consumed(),
            bytes_consumed: self.bytes_consumed(),
        });
    }

    pub fn on_error(&self, message: impl Into<String>) {
        let _ = self.events.send(ProgressEvent::Error(message.into()));
    }
}
