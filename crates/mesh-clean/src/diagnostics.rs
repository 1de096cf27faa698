//! Stage events for callers that want to follow a cleaning run.
//!
//! This is separate from `tracing`: the pipeline always logs, but only sends
//! events to a sink when asked to be verbose.
//!
//! ```
//! use mesh_clean::{DiagnosticsSink, Stage, StageEvent};
//!
//! let mut seen = Vec::new();
//! let mut sink = |event: &StageEvent| seen.push(event.stage);
//! sink.report(&StageEvent::new(Stage::Sliced, "cut", 10, 12));
//! assert_eq!(seen, vec![Stage::Sliced]);
//! ```

use std::sync::mpsc::Sender;
use std::time::Duration;

use tracing::info;

use crate::pipeline::Stage;

/// A pipeline stage that just finished.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    pub stage: Stage,
    /// Human-readable summary of what the stage did.
    pub message: String,
    /// Mesh size after the stage.
    pub vertex_count: usize,
    pub face_count: usize,
    /// Time since the run started.
    pub elapsed: Duration,
}

impl StageEvent {
    pub fn new(
        stage: Stage,
        message: impl Into<String>,
        vertex_count: usize,
        face_count: usize,
    ) -> Self {
        Self {
            stage,
            message: message.into(),
            vertex_count,
            face_count,
            elapsed: Duration::ZERO,
        }
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

impl std::fmt::Display for StageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({} vertices, {} faces, {:.1}ms)",
            self.stage,
            self.message,
            self.vertex_count,
            self.face_count,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

/// Receives stage events from a pipeline run.
pub trait DiagnosticsSink {
    fn report(&mut self, event: &StageEvent);
}

impl<F> DiagnosticsSink for F
where
    F: FnMut(&StageEvent),
{
    fn report(&mut self, event: &StageEvent) {
        self(event)
    }
}

/// Forwards events over a channel. A dropped receiver is ignored.
impl DiagnosticsSink for Sender<StageEvent> {
    fn report(&mut self, event: &StageEvent) {
        let _ = self.send(event.clone());
    }
}

/// Logs every event at `info` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&mut self, event: &StageEvent) {
        info!(
            stage = %event.stage,
            vertices = event.vertex_count,
            faces = event.face_count,
            elapsed_ms = event.elapsed.as_secs_f64() * 1000.0,
            "{}",
            event.message
        );
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticsSink for NullSink {
    fn report(&mut self, _event: &StageEvent) {}
}
