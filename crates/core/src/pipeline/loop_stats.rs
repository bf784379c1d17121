use std::collections::BTreeMap;
use std::time::Instant;

use crate::dispatch::domain::dispatcher::DispatchOutcome;

/// Running total of one stage's wall-clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTiming {
    pub count: usize,
    pub total_ms: f64,
}

impl StageTiming {
    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

/// Counters and per-stage timings collected by the frame loop.
///
/// Timings are wall-clock aggregates and only feed the end-of-run summary.
/// Storage stays constant however long the stream runs.
#[derive(Debug)]
pub struct LoopStats {
    pub frames: usize,
    pub detection_passes: usize,
    pub tracks_created: usize,
    pub tracks_expired: usize,
    pub dispatched: usize,
    pub dropped: usize,
    /// Qualifying sightings the dispatcher refused (queue full or shut down).
    pub refused: usize,
    pub delivered: usize,
    pub failed: usize,
    timings: BTreeMap<&'static str, StageTiming>,
    started: Instant,
}

impl LoopStats {
    pub fn new() -> Self {
        Self {
            frames: 0,
            detection_passes: 0,
            tracks_created: 0,
            tracks_expired: 0,
            dispatched: 0,
            dropped: 0,
            refused: 0,
            delivered: 0,
            failed: 0,
            timings: BTreeMap::new(),
            started: Instant::now(),
        }
    }

    pub fn timing(&mut self, stage: &'static str, duration_ms: f64) {
        let entry = self.timings.entry(stage).or_default();
        entry.count += 1;
        entry.total_ms += duration_ms;
    }

    pub fn timings_for(&self, stage: &str) -> Option<StageTiming> {
        self.timings.get(stage).copied()
    }

    /// Number of distinct stages timed so far.
    pub fn stage_count(&self) -> usize {
        self.timings.len()
    }

    pub fn record_outcome(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Delivered { .. } => self.delivered += 1,
            DispatchOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn summary_string(&self) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Loop summary ({} frames, {elapsed:.1}s total):",
            self.frames
        )];
        lines.push(format!(
            "  detection passes: {}, tracks created: {}, expired: {}",
            self.detection_passes, self.tracks_created, self.tracks_expired
        ));
        lines.push(format!(
            "  sightings dispatched: {}, dropped: {}, refused: {}",
            self.dispatched, self.dropped, self.refused
        ));
        lines.push(format!(
            "  deliveries ok: {}, failed: {}",
            self.delivered, self.failed
        ));

        for (stage, timing) in &self.timings {
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  total {:7.0}ms",
                timing.avg_ms(),
                timing.total_ms
            ));
        }

        if self.frames > 0 && elapsed > 0.0 {
            let fps = self.frames as f64 / elapsed;
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        lines.join("\n")
    }
}

impl Default for LoopStats {
    fn default() -> Self {
        Self::new()
    }
}
