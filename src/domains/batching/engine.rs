//! Batch engine: a bounded FIFO queue drained by one background flush task.
//!
//! Locking discipline: a single async mutex guards the queue and the `closed`
//! flag. Two signals complement it:
//!
//! - `admission` (`Semaphore`) holds one permit per free queue slot. An
//!   enqueuer takes a permit before touching the lock and forgets it once the
//!   request is queued; each drain hands the drained count back. Tokio's
//!   semaphore grants permits in request order, so a caller suspended on a
//!   full queue is admitted before anyone who arrives after it. Shutdown
//!   closes the semaphore, failing every suspended caller.
//! - `flush_trigger` (`Notify`) wakes the flush task early. `notify_one`
//!   stores a permit when the task is busy, so a threshold trigger raised
//!   during an executor call is not lost.
//!
//! The flush task holds only a `Weak` reference between cycles. Dropping every
//! `Arc<BatchEngine>` without calling `shutdown` stops the task and drops the
//! queued requests, whose handles then resolve to `BatchError::Cancelled`.

use super::batch::Batch;
use super::executor::DynExecutor;
use super::params::GenerationParams;
use super::request::{PendingRequest, ResultHandle};
use super::settings::{EngineSettings, ParameterPolicy};
use super::stats::{EngineCounters, EngineLifecycle, EngineStats};
use crate::common::{BatchError, BatchResult};
use futures::FutureExt;
use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify, Semaphore, TryAcquireError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

struct EngineState {
    queue: VecDeque<PendingRequest>,
    closed: bool,
}

enum Cycle {
    Continue,
    Stopped,
}

pub struct BatchEngine {
    id: Uuid,
    settings: EngineSettings,
    executor: DynExecutor,
    state: Mutex<EngineState>,
    admission: Semaphore,
    flush_trigger: Arc<Notify>,
    lifecycle: watch::Sender<EngineLifecycle>,
    counters: EngineCounters,
}

impl BatchEngine {
    /// Validates `settings` and spawns the flush task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(settings: EngineSettings, executor: DynExecutor) -> BatchResult<Arc<Self>> {
        settings.validate()?;

        if settings.max_batch > settings.max_queue_size {
            warn!(
                max_batch = settings.max_batch,
                max_queue_size = settings.max_queue_size,
                "max_batch exceeds max_queue_size; batches will only flush on the interval"
            );
        }

        let (lifecycle, _) = watch::channel(EngineLifecycle::Open);
        let engine = Arc::new(Self {
            id: Uuid::new_v4(),
            executor,
            state: Mutex::new(EngineState {
                queue: VecDeque::new(),
                closed: false,
            }),
            admission: Semaphore::new(settings.max_queue_size),
            flush_trigger: Arc::new(Notify::new()),
            settings,
            lifecycle,
            counters: EngineCounters::default(),
        });

        tokio::spawn(Self::flush_loop(
            Arc::downgrade(&engine),
            engine.flush_trigger.clone(),
            engine.settings.flush_interval(),
        ));

        info!(
            engine_id = %engine.id,
            max_batch = engine.settings.max_batch,
            flush_interval_ms = engine.settings.flush_interval_ms,
            max_queue_size = engine.settings.max_queue_size,
            "Batch engine started"
        );
        Ok(engine)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn executor(&self) -> &DynExecutor {
        &self.executor
    }

    pub fn lifecycle(&self) -> EngineLifecycle {
        *self.lifecycle.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle() != EngineLifecycle::Open
    }

    pub async fn queue_len(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    pub async fn stats(&self) -> EngineStats {
        let depth = self.queue_len().await;
        self.counters.snapshot(depth, self.lifecycle())
    }

    /// Queues one prompt and returns the handle its result will arrive on.
    ///
    /// Suspends while the queue is full until a flush frees space; suspended
    /// callers are admitted in the order they arrived. Fails with
    /// `EngineClosed` once shutdown has started, including for callers that
    /// were suspended on a full queue at that moment.
    pub async fn enqueue(
        &self,
        content: impl Into<String>,
        params: GenerationParams,
    ) -> BatchResult<ResultHandle> {
        let (request, handle) = PendingRequest::new(content.into(), params);

        let permit = match self.admission.try_acquire() {
            Ok(permit) => permit,
            Err(TryAcquireError::Closed) => return Err(self.reject(BatchError::EngineClosed)),
            Err(TryAcquireError::NoPermits) => {
                EngineCounters::incr(&self.counters.backpressure_waits);
                debug!(engine_id = %self.id, "Queue full; waiting for next flush");
                self.admission
                    .acquire()
                    .await
                    .map_err(|_| self.reject(BatchError::EngineClosed))?
            }
        };

        let mut state = self.state.lock().await;
        if state.closed {
            return Err(self.reject(BatchError::EngineClosed));
        }

        if self.settings.parameter_policy == ParameterPolicy::Reject {
            if let Some(head) = state.queue.front() {
                if head.params != request.params {
                    return Err(self.reject(BatchError::HeterogeneousParameters));
                }
            }
        }

        state.queue.push_back(request);
        permit.forget();
        let depth = state.queue.len();
        EngineCounters::incr(&self.counters.requests_enqueued);
        debug!(engine_id = %self.id, queue_depth = depth, "Enqueued prompt");
        if depth >= self.settings.max_batch {
            self.flush_trigger.notify_one();
        }
        Ok(handle)
    }

    fn reject(&self, err: BatchError) -> BatchError {
        EngineCounters::incr(&self.counters.requests_rejected);
        err
    }

    /// Asks the flush task to flush now instead of at the next interval.
    pub fn trigger_flush(&self) {
        self.flush_trigger.notify_one();
    }

    /// Stops accepting requests and waits until everything already queued
    /// has been flushed. Safe to call more than once; later calls wait for
    /// the same drain.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.lock().await;
            if !state.closed {
                state.closed = true;
                self.admission.close();
                self.lifecycle.send_replace(EngineLifecycle::Draining);
                info!(
                    engine_id = %self.id,
                    queue_depth = state.queue.len(),
                    "Shutting down batch engine"
                );
            }
        }

        self.flush_trigger.notify_one();

        let mut lifecycle = self.lifecycle.subscribe();
        let _ = lifecycle
            .wait_for(|state| *state == EngineLifecycle::Closed)
            .await;
    }

    async fn flush_loop(weak: Weak<Self>, trigger: Arc<Notify>, interval: Duration) {
        loop {
            // Either outcome (trigger or elapsed interval) leads to a flush check.
            let _ = tokio::time::timeout(interval, trigger.notified()).await;
            if interval.is_zero() {
                tokio::task::yield_now().await;
            }

            let Some(engine) = weak.upgrade() else {
                debug!("Batch engine dropped without shutdown; flush task exiting");
                break;
            };
            if let Cycle::Stopped = engine.flush_cycle().await {
                break;
            }
        }
    }

    async fn flush_cycle(&self) -> Cycle {
        let (drained, closed) = {
            let mut state = self.state.lock().await;
            let drained: Vec<PendingRequest> = state.queue.drain(..).collect();
            (drained, state.closed)
        };

        if !drained.is_empty() {
            self.admission.add_permits(drained.len());
            self.dispatch(Batch::new(drained)).await;
        }

        if closed {
            self.lifecycle.send_replace(EngineLifecycle::Closed);
            info!(engine_id = %self.id, "Batch engine drained and closed");
            return Cycle::Stopped;
        }
        Cycle::Continue
    }

    async fn dispatch(&self, batch: Batch) {
        if !batch.is_homogeneous() {
            EngineCounters::incr(&self.counters.heterogeneous_batches);
            if self.settings.parameter_policy == ParameterPolicy::SplitByParameters {
                for run in batch.split_by_parameters() {
                    self.execute(run).await;
                }
                return;
            }
            warn!(
                engine_id = %self.id,
                batch_id = %batch.id,
                batch_size = batch.len(),
                "Batch mixes generation parameters; using the first request's parameters"
            );
        }
        self.execute(batch).await;
    }

    async fn execute(&self, batch: Batch) {
        let batch_id = batch.id;
        let batch_size = batch.len();
        let (prompts, params, slots) = batch.into_call();
        debug!(engine_id = %self.id, batch_id = %batch_id, batch_size, "Flushing batch");

        let outcome = AssertUnwindSafe(self.executor.execute_batch(prompts, &params))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(anyhow::anyhow!("executor panicked")));

        match &outcome {
            Err(e) => error!(
                engine_id = %self.id,
                batch_id = %batch_id,
                batch_size,
                error = %e,
                "Batch execution failed"
            ),
            Ok(outputs) if outputs.len() != batch_size => error!(
                engine_id = %self.id,
                batch_id = %batch_id,
                batch_size,
                returned = outputs.len(),
                "Executor returned the wrong number of results"
            ),
            Ok(_) => {}
        }

        let delivery = slots.deliver(outcome);
        EngineCounters::incr(&self.counters.batches_flushed);
        EngineCounters::add(&self.counters.requests_completed, delivery.succeeded);
        EngineCounters::add(&self.counters.requests_failed, delivery.failed);
        self.counters.mark_flush();
    }
}

impl Drop for BatchEngine {
    fn drop(&mut self) {
        // Lets an idle flush task notice the engine is gone.
        self.flush_trigger.notify_one();
    }
}

impl fmt::Debug for BatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchEngine")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .field("lifecycle", &self.lifecycle())
            .finish()
    }
}
