use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::dispatch::domain::dispatcher::{DispatchHandle, DispatchOutcome, Dispatcher};
use crate::dispatch::domain::event_sender::EventSender;
use crate::dispatch::domain::sighting_event::SightingEvent;

struct Job {
    event: SightingEvent,
    outcome_tx: Sender<DispatchOutcome>,
}

/// Delivers events on a fixed pool of worker threads.
///
/// Jobs wait in a bounded queue; when it is full the event is refused with
/// [`DispatchError::QueueFull`] instead of blocking the frame loop.
pub struct PooledDispatcher {
    job_tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl PooledDispatcher {
    pub fn new(sender: Arc<dyn EventSender>, workers: usize, queue_capacity: usize) -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Job>(queue_capacity.max(1));
        let workers = (0..workers.max(1))
            .map(|_| spawn_worker(Arc::clone(&sender), job_rx.clone()))
            .collect();
        Self {
            job_tx: Some(job_tx),
            workers,
        }
    }
}

impl Dispatcher for PooledDispatcher {
    fn submit(&mut self, event: SightingEvent) -> Result<DispatchHandle, DispatchError> {
        let job_tx = self.job_tx.as_ref().ok_or(DispatchError::ShutDown)?;
        let track_id = event.track_id;
        let (outcome_tx, outcome_rx) = crossbeam_channel::bounded(1);

        match job_tx.try_send(Job { event, outcome_tx }) {
            Ok(()) => Ok(DispatchHandle::new(track_id, outcome_rx)),
            Err(TrySendError::Full(_)) => {
                log::warn!("Dispatch queue full, dropping sighting of track {track_id}");
                Err(DispatchError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(DispatchError::ShutDown),
        }
    }

    fn shutdown(&mut self) {
        // Closing the queue lets workers finish what is queued, then exit.
        drop(self.job_tx.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Dispatch worker panicked");
            }
        }
    }
}

impl Drop for PooledDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(sender: Arc<dyn EventSender>, job_rx: Receiver<Job>) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for job in job_rx {
            let outcome = deliver(sender.as_ref(), &job.event);
            // The caller may have dropped its handle.
            let _ = job.outcome_tx.send(outcome);
        }
    })
}

fn deliver(sender: &dyn EventSender, event: &SightingEvent) -> DispatchOutcome {
    match catch_unwind(AssertUnwindSafe(|| sender.send(event))) {
        Ok(Ok(status)) => {
            log::info!(
                "Sighting of track {} sent (node {}, HTTP {status})",
                event.track_id,
                event.node_id
            );
            DispatchOutcome::Delivered { status }
        }
        Ok(Err(e)) => {
            log::error!("Failed to send sighting of track {}: {e}", event.track_id);
            DispatchOutcome::Failed(e.to_string())
        }
        Err(_) => {
            log::error!("Sender panicked on sighting of track {}", event.track_id);
            DispatchOutcome::Failed("sender panicked".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::shared::frame::Frame;

    fn event(track_id: u64) -> SightingEvent {
        SightingEvent {
            track_id,
            node_id: 1,
            created_at: Duration::from_secs(1_700_000_000),
            image: Frame::new(vec![0u8; 4 * 4 * 3], 4, 4, 3, 0),
        }
    }

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<u64>>,
    }

    impl EventSender for RecordingSender {
        fn send(&self, event: &SightingEvent) -> Result<u16, DispatchError> {
            self.sent.lock().unwrap().push(event.track_id);
            match event.track_id {
                13 => Err(DispatchError::Http { status: 500 }),
                66 => panic!("sender blew up"),
                _ => Ok(201),
            }
        }
    }

    /// Reports each send on `started_tx`, then blocks until `gate_rx` closes.
    struct GatedSender {
        started_tx: Sender<u64>,
        gate_rx: Receiver<()>,
    }

    impl EventSender for GatedSender {
        fn send(&self, event: &SightingEvent) -> Result<u16, DispatchError> {
            let _ = self.started_tx.send(event.track_id);
            let _ = self.gate_rx.recv();
            Ok(200)
        }
    }

    #[test]
    fn test_delivers_all_events_before_shutdown_returns() {
        let sender = Arc::new(RecordingSender::default());
        let mut dispatcher = PooledDispatcher::new(sender.clone(), 4, 64);

        let handles: Vec<_> = (0..10)
            .map(|id| dispatcher.submit(event(id)).unwrap())
            .collect();
        dispatcher.shutdown();

        let mut sent = sender.sent.lock().unwrap().clone();
        sent.sort_unstable();
        assert_eq!(sent, (0..10).collect::<Vec<_>>());
        for handle in handles {
            assert_eq!(handle.wait(), DispatchOutcome::Delivered { status: 201 });
        }
    }

    #[test]
    fn test_failed_send_reported_on_handle() {
        let mut dispatcher = PooledDispatcher::new(Arc::new(RecordingSender::default()), 1, 4);

        let handle = dispatcher.submit(event(13)).unwrap();

        match handle.wait() {
            DispatchOutcome::Failed(reason) => assert!(reason.contains("500")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_worker_survives_panicking_sender() {
        let mut dispatcher = PooledDispatcher::new(Arc::new(RecordingSender::default()), 1, 4);

        let bad = dispatcher.submit(event(66)).unwrap();
        let good = dispatcher.submit(event(1)).unwrap();

        assert!(matches!(bad.wait(), DispatchOutcome::Failed(_)));
        assert_eq!(good.wait(), DispatchOutcome::Delivered { status: 201 });
    }

    #[test]
    fn test_full_queue_refuses_without_blocking() {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let sender = Arc::new(GatedSender { started_tx, gate_rx });
        let mut dispatcher = PooledDispatcher::new(sender, 1, 1);

        let first = dispatcher.submit(event(0)).unwrap();
        assert_eq!(started_rx.recv_timeout(Duration::from_secs(5)), Ok(0));
        let queued = dispatcher.submit(event(1)).unwrap();

        assert!(matches!(
            dispatcher.submit(event(2)),
            Err(DispatchError::QueueFull)
        ));

        drop(gate_tx);
        dispatcher.shutdown();
        assert_eq!(first.wait(), DispatchOutcome::Delivered { status: 200 });
        assert_eq!(queued.wait(), DispatchOutcome::Delivered { status: 200 });
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut dispatcher = PooledDispatcher::new(Arc::new(RecordingSender::default()), 2, 4);
        dispatcher.shutdown();

        assert!(matches!(
            dispatcher.submit(event(0)),
            Err(DispatchError::ShutDown)
        ));
    }
}
