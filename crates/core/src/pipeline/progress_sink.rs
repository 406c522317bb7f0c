use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use super::stage::{ProgressEvent, StageName};

/// Receiver for stage progress.
///
/// Called synchronously on the run's thread, so implementations must return
/// promptly.
pub trait ProgressSink: Send {
    fn on_progress(&mut self, event: &ProgressEvent);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&ProgressEvent) + Send,
{
    fn on_progress(&mut self, event: &ProgressEvent) {
        self(event)
    }
}

/// Discards all events.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_progress(&mut self, _event: &ProgressEvent) {}
}

/// Logs progress through the `log` facade and keeps per-stage wall time.
///
/// Intermediate progress is throttled to steps of `min_step`; stage start,
/// stage end and events carrying a message are always logged.
pub struct LogProgressSink {
    min_step: f64,
    last_logged: HashMap<StageName, f64>,
    started: HashMap<StageName, Instant>,
    timings: BTreeMap<StageName, f64>,
    start_time: Instant,
}

impl LogProgressSink {
    pub fn new(min_step: f64) -> Self {
        Self {
            min_step: min_step.clamp(0.0, 1.0),
            last_logged: HashMap::new(),
            started: HashMap::new(),
            timings: BTreeMap::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if no stage finished.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!(
            "Pipeline summary ({} stages, {:.1}s total):",
            self.timings.len(),
            elapsed_ms / 1000.0
        )];
        for (stage, total_ms) in &self.timings {
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {:12}: {total_ms:8.0}ms  ({pct:4.1}%)",
                stage.label()
            ));
        }
        Some(lines.join("\n"))
    }

    pub fn timing_for(&self, stage: StageName) -> Option<f64> {
        self.timings.get(&stage).copied()
    }

    fn should_log(&self, event: &ProgressEvent) -> bool {
        if event.fraction <= 0.0 || event.fraction >= 1.0 {
            return true;
        }
        match self.last_logged.get(&event.stage) {
            Some(last) => event.fraction - last >= self.min_step,
            None => true,
        }
    }
}

impl Default for LogProgressSink {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl ProgressSink for LogProgressSink {
    fn on_progress(&mut self, event: &ProgressEvent) {
        if event.fraction <= 0.0 {
            self.started.entry(event.stage).or_insert_with(Instant::now);
        }
        if event.fraction >= 1.0 {
            if let Some(started) = self.started.get(&event.stage) {
                let ms = started.elapsed().as_secs_f64() * 1000.0;
                self.timings.insert(event.stage, ms);
            }
        }

        if self.should_log(event) {
            let pct = event.fraction * 100.0;
            if event.message.is_empty() {
                log::info!("[{}] {pct:.0}%", event.stage);
            } else {
                log::info!("[{}] {pct:.0}% {}", event.stage, event.message);
            }
            self.last_logged.insert(event.stage, event.fraction);
        }
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

/// Collects events; for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingSink {
    pub events: Vec<ProgressEvent>,
}

#[cfg(test)]
impl ProgressSink for RecordingSink {
    fn on_progress(&mut self, event: &ProgressEvent) {
        self.events.push(event.clone());
    }
}
