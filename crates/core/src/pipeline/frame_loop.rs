use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::loop_stats::LoopStats;
use crate::detection::domain::face_detector::FaceDetector;
use crate::dispatch::domain::dispatcher::{DispatchHandle, Dispatcher};
use crate::dispatch::domain::sighting_event::SightingEvent;
use crate::shared::clock::Clock;
use crate::shared::frame::Frame;
use crate::shared::node_config::LoopTiming;
use crate::tracking::domain::associator::{Association, Associator};
use crate::tracking::domain::dispatch_policy::{DispatchPolicy, Verdict};
use crate::tracking::domain::face_tracker::FaceTracker;
use crate::tracking::domain::track::{TrackId, TrackView};
use crate::tracking::domain::track_registry::TrackRegistry;
use crate::tracking::domain::track_updater::TrackUpdater;
use crate::video::domain::frame_source::FrameSource;

/// What happened to the registry while processing one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Tracks that expired and were handed to the dispatcher.
    pub dispatched: Vec<TrackId>,
    /// Tracks that expired without qualifying.
    pub dropped: Vec<TrackId>,
    /// Qualifying tracks the dispatcher did not accept.
    pub refused: Vec<TrackId>,
    /// Final view of every track that expired on this frame.
    pub expired: Vec<TrackView>,
    /// Result of the detection pass, when one ran on this frame.
    pub detection: Option<Association>,
}

/// Drives tracking, detection and dispatch, one frame at a time.
///
/// Per frame: advance every track and settle the ones that expired, then,
/// if more than the detection interval has passed since the last pass, run
/// the detector and associate its boxes with the registry. Backend errors
/// never stop the loop.
pub struct FrameLoopController {
    detector: Box<dyn FaceDetector>,
    tracker: Box<dyn FaceTracker>,
    dispatcher: Box<dyn Dispatcher>,
    clock: Box<dyn Clock>,
    registry: TrackRegistry,
    associator: Associator,
    updater: TrackUpdater,
    policy: DispatchPolicy,
    node_id: u64,
    detection_interval: Duration,
    last_detection: Duration,
    in_flight: Vec<DispatchHandle>,
    stats: LoopStats,
    stop: Arc<AtomicBool>,
}

impl FrameLoopController {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        tracker: Box<dyn FaceTracker>,
        dispatcher: Box<dyn Dispatcher>,
        clock: Box<dyn Clock>,
        timing: LoopTiming,
        node_id: u64,
    ) -> Self {
        let last_detection = clock.now();
        Self {
            detector,
            tracker,
            dispatcher,
            clock,
            registry: TrackRegistry::new(),
            associator: Associator::new(),
            updater: TrackUpdater::new(timing.failure_delay),
            policy: DispatchPolicy::new(timing.send_delay),
            node_id,
            detection_interval: timing.detection_interval,
            last_detection,
            in_flight: Vec::new(),
            stats: LoopStats::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn process_frame(&mut self, frame: &Frame) -> FrameReport {
        let mut report = FrameReport::default();
        self.stats.frames += 1;

        let started = Instant::now();
        let now = self.clock.now();
        let expired = self.updater.advance(&mut self.registry, frame, now);
        self.stats.tracks_expired += expired.len();

        for track in expired {
            let id = track.id();
            let mut view = track.view();
            match self.policy.evaluate(&track, now) {
                Verdict::Drop => {
                    log::debug!(
                        "Track {id} dropped, visible for {:?} (< {:?})",
                        track.visible_for(),
                        self.policy.send_delay()
                    );
                    self.stats.dropped += 1;
                    report.dropped.push(id);
                }
                Verdict::Dispatch => {
                    let event = SightingEvent::from_track(track, self.node_id);
                    match self.dispatcher.submit(event) {
                        Ok(handle) => {
                            log::debug!("Track {id} submitted for dispatch");
                            view.dispatched = true;
                            self.in_flight.push(handle);
                            self.stats.dispatched += 1;
                            report.dispatched.push(id);
                        }
                        Err(e) => {
                            log::debug!("Sighting of track {id} not dispatched: {e}");
                            self.stats.refused += 1;
                            report.refused.push(id);
                        }
                    }
                }
            }
            report.expired.push(view);
        }
        self.stats
            .timing("track", started.elapsed().as_secs_f64() * 1000.0);

        if now.saturating_sub(self.last_detection) > self.detection_interval {
            let started = Instant::now();
            let detections = self.detector.detect(frame).unwrap_or_else(|e| {
                log::warn!("Face detection failed on frame {}: {e}", frame.index());
                Vec::new()
            });
            let association = self.associator.associate(
                &mut self.registry,
                self.tracker.as_mut(),
                frame,
                &detections,
                self.clock.now(),
            );
            self.last_detection = self.clock.now();
            self.stats.detection_passes += 1;
            self.stats.tracks_created += association.created.len();
            self.stats
                .timing("detect", started.elapsed().as_secs_f64() * 1000.0);
            report.detection = Some(association);
        }

        self.reap_finished();
        report
    }

    /// Current tracks, in creation order.
    pub fn tracks(&self) -> Vec<TrackView> {
        self.registry.views()
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    /// Flag that makes [`run`](Self::run) stop before reading the next frame.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Processes frames until the source ends or fails, or the stop flag is
    /// raised, then shuts down.
    ///
    /// A read error is returned after the shutdown drain completes.
    pub fn run(&mut self, source: &mut dyn FrameSource) -> Result<(), Box<dyn std::error::Error>> {
        let result = loop {
            if self.stop.load(Ordering::SeqCst) {
                log::info!("Stop requested, closing {}", source.metadata().source);
                break Ok(());
            }
            match source.next_frame() {
                Ok(Some(frame)) => {
                    self.process_frame(&frame);
                }
                Ok(None) => {
                    log::info!("End of stream from {}", source.metadata().source);
                    break Ok(());
                }
                Err(e) => {
                    log::error!("Failed to read from {}: {e}", source.metadata().source);
                    break Err(e);
                }
            }
        };
        self.shutdown();
        result
    }

    /// Discards active tracks and waits for every submitted dispatch.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        let discarded = self.registry.drain();
        if !discarded.is_empty() {
            log::debug!("Discarding {} active tracks at shutdown", discarded.len());
        }

        self.dispatcher.shutdown();
        for handle in self.in_flight.drain(..) {
            let outcome = handle.wait();
            self.stats.record_outcome(&outcome);
        }
        log::info!("{}", self.stats.summary_string());
    }

    fn reap_finished(&mut self) {
        let stats = &mut self.stats;
        self.in_flight.retain(|handle| match handle.try_outcome() {
            Some(outcome) => {
                stats.record_outcome(&outcome);
                false
            }
            None => true,
        });
    }
}
