//! Explicit task queue for answer-analysis runs: a bounded mpsc channel
//! drained by a fixed worker pool, with a per-answer idempotency guard.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// One unit of background work: analyze a single uploaded answer.
#[derive(Debug, Clone)]
pub struct AnswerJob {
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub video_key: String,
}

impl AnswerJob {
    fn key(&self) -> (Uuid, Uuid) {
        (self.session_id, self.question_id)
    }
}

#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("an analysis run for this answer is already in flight")]
    AlreadyInFlight,

    #[error("the pipeline queue is full")]
    QueueFull,

    #[error("the pipeline workers have shut down")]
    Closed,
}

/// Bounded worker pool. Exactly one run per (session, question) key may be
/// queued or executing at a time; a duplicate trigger is rejected rather
/// than merged. A run executes to completion exactly once, with no retry.
#[derive(Clone)]
pub struct PipelineQueue {
    tx: mpsc::Sender<AnswerJob>,
    in_flight: Arc<Mutex<HashSet<(Uuid, Uuid)>>>,
}

impl PipelineQueue {
    /// Spawns `workers` tasks draining the queue through `run`.
    pub fn start<F, Fut>(workers: usize, capacity: usize, run: F) -> Self
    where
        F: Fn(AnswerJob) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<AnswerJob>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let in_flight: Arc<Mutex<HashSet<(Uuid, Uuid)>>> = Arc::new(Mutex::new(HashSet::new()));

        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let in_flight = Arc::clone(&in_flight);
            let run = run.clone();
            tokio::spawn(async move {
                loop {
                    // Guard scope ends before the job runs, so workers drain
                    // the channel concurrently.
                    let job = { rx.lock().await.recv().await };
                    let Some(job) = job else { break };
                    let key = job.key();
                    run(job).await;
                    in_flight
                        .lock()
                        .expect("in-flight set poisoned")
                        .remove(&key);
                }
                info!(worker, "pipeline worker stopped");
            });
        }

        Self { tx, in_flight }
    }

    /// Registers the job's idempotency key and queues it. Fails without side
    /// effects if a run for the same answer is still queued or executing.
    pub fn enqueue(&self, job: AnswerJob) -> Result<(), EnqueueError> {
        let key = job.key();
        {
            let mut set = self.in_flight.lock().expect("in-flight set poisoned");
            if !set.insert(key) {
                return Err(EnqueueError::AlreadyInFlight);
            }
        }

        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.in_flight
                    .lock()
                    .expect("in-flight set poisoned")
                    .remove(&key);
                match e {
                    mpsc::error::TrySendError::Full(_) => Err(EnqueueError::QueueFull),
                    mpsc::error::TrySendError::Closed(_) => Err(EnqueueError::Closed),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::Notify;

    use super::*;

    fn job() -> AnswerJob {
        AnswerJob {
            session_id: Uuid::new_v4(),
            question_id: Uuid::new_v4(),
            video_key: "videos/test.webm".to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_a_duplicate_while_the_first_run_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let queue = PipelineQueue::start(2, 8, {
            let gate = Arc::clone(&gate);
            move |_job| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                }
            }
        });

        let job = job();
        queue.enqueue(job.clone()).unwrap();
        assert!(matches!(
            queue.enqueue(job.clone()),
            Err(EnqueueError::AlreadyInFlight)
        ));

        // A different answer is unaffected by the guard.
        queue.enqueue(super::AnswerJob { question_id: Uuid::new_v4(), ..job }).unwrap();
    }

    #[tokio::test]
    async fn releases_the_key_after_the_run_completes() {
        let gate = Arc::new(Notify::new());
        let queue = PipelineQueue::start(1, 8, {
            let gate = Arc::clone(&gate);
            move |_job| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                }
            }
        });

        let job = job();
        queue.enqueue(job.clone()).unwrap();
        gate.notify_one();

        // The key is released once the worker finishes the run.
        let mut requeued = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if queue.enqueue(job.clone()).is_ok() {
                requeued = true;
                break;
            }
            gate.notify_one();
        }
        assert!(requeued, "idempotency key was never released");
    }

    #[tokio::test]
    async fn overflowing_the_queue_fails_without_leaking_the_key() {
        let gate = Arc::new(Notify::new());
        let queue = PipelineQueue::start(1, 1, {
            let gate = Arc::clone(&gate);
            move |_job| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                }
            }
        });

        // First job occupies the worker, second fills the channel.
        queue.enqueue(job()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.enqueue(job()).unwrap();

        let overflow = job();
        assert!(matches!(
            queue.enqueue(overflow.clone()),
            Err(EnqueueError::QueueFull)
        ));

        // The rejected job's key was rolled back: draining the queue lets it in.
        gate.notify_one();
        gate.notify_one();
        let mut requeued = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if queue.enqueue(overflow.clone()).is_ok() {
                requeued = true;
                break;
            }
        }
        assert!(requeued, "queue never drained");
    }
}
