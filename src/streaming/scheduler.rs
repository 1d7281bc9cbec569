//! Encoding scheduler: a bounded queue drained by a fixed pool of workers.
//!
//! Every real request either resolves from the segment cache straight away or
//! is queued together with warmup jobs for the segments that follow it. Jobs
//! are taken off the queue in arrival order, real and warmup alike.
//!
//! Each segment being encoded has one entry in the in-flight table. Requests
//! for a segment that is already queued or encoding attach to that entry and
//! receive the same outcome instead of starting a second transcode.
//!
//! # Example
//!
//! ```rust,ignore
//! let scheduler = EncodingScheduler::new(cache, encoder, SchedulerOptions::default());
//! let bytes = scheduler
//!     .fetch(SegmentRequest::new("/data/movie.mkv", 0, 480), Duration::from_secs(60))
//!     .await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use segcast_av::SegmentEncoder;
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};
use tracing::{debug, error, info, warn};

use crate::config::EncoderConfig;

use super::cache::CacheStore;
use super::error::{SegmentError, SegmentOutcome};
use super::job::{CacheKey, Delivery, EncodingJob, SegmentRequest};

/// Sizing of an [`EncodingScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Worker loops pulling from the queue.
    pub worker_count: usize,
    /// Jobs the queue holds before producers wait.
    pub queue_capacity: usize,
    /// Warmup jobs queued after each real request.
    pub prefetch_segments: u64,
    /// Submissions allowed in the cache-check/enqueue step at once.
    pub admission_limit: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            worker_count: 2,
            queue_capacity: 100,
            prefetch_segments: 2,
            admission_limit: 64,
        }
    }
}

impl From<&EncoderConfig> for SchedulerOptions {
    fn from(config: &EncoderConfig) -> Self {
        Self {
            worker_count: config.worker_count,
            queue_capacity: config.queue_capacity,
            prefetch_segments: config.prefetch_segments,
            admission_limit: config.admission_limit,
        }
    }
}

/// State of a segment that has been queued and not yet finished.
enum Flight {
    /// Queued or encoding. Holds requests that attached after the first.
    Pending(Vec<oneshot::Sender<SegmentOutcome>>),
    /// Encoded and being written to the cache.
    Storing(Bytes),
}

struct Shared {
    cache: CacheStore,
    encoder: Arc<dyn SegmentEncoder>,
    flights: DashMap<CacheKey, Flight>,
}

/// Handle to the encoding queue and its workers.
///
/// Create one per cache root and share it; clones refer to the same queue.
/// Workers run until every handle has been dropped.
#[derive(Clone)]
pub struct EncodingScheduler {
    sender: mpsc::Sender<EncodingJob>,
    shared: Arc<Shared>,
    admission: Arc<Semaphore>,
    prefetch_segments: u64,
}

impl EncodingScheduler {
    /// Create the queue and spawn its workers on the current runtime.
    pub fn new(
        cache: CacheStore,
        encoder: Arc<dyn SegmentEncoder>,
        options: SchedulerOptions,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(options.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let shared = Arc::new(Shared {
            cache,
            encoder,
            flights: DashMap::new(),
        });

        let worker_count = options.worker_count.max(1);
        for worker in 0..worker_count {
            tokio::spawn(run_worker(worker, receiver.clone(), shared.clone()));
        }

        info!(
            workers = worker_count,
            queue_capacity = options.queue_capacity,
            encoder = shared.encoder.name(),
            cache_root = %shared.cache.root().display(),
            "Encoding scheduler started"
        );

        Self {
            sender,
            shared,
            admission: Arc::new(Semaphore::new(options.admission_limit.max(1))),
            prefetch_segments: options.prefetch_segments,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.shared.cache
    }

    /// Number of segments currently queued, encoding or being stored.
    pub fn in_flight(&self) -> usize {
        self.shared.flights.len()
    }

    /// Fetch a segment, giving up after `wait`.
    ///
    /// Giving up does not cancel anything: the encode still completes and
    /// populates the cache.
    pub async fn fetch(&self, segment: SegmentRequest, wait: Duration) -> SegmentOutcome {
        let outcome = tokio::time::timeout(wait, async {
            let receiver = self.submit(segment).await?;
            receiver.await.unwrap_or(Err(SegmentError::QueueClosed))
        })
        .await;

        match outcome {
            Ok(outcome) => outcome,
            Err(_) => Err(SegmentError::Timeout(wait)),
        }
    }

    /// Submit a segment request and return where its outcome will arrive.
    ///
    /// Waits only for an admission slot. The cache check and enqueue run as
    /// a separate task holding that slot, so they finish even if the caller
    /// stops waiting.
    pub async fn submit(
        &self,
        segment: SegmentRequest,
    ) -> Result<oneshot::Receiver<SegmentOutcome>, SegmentError> {
        let permit = self
            .admission
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SegmentError::QueueClosed)?;

        let (reply, receiver) = oneshot::channel();
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler.admit(segment, reply).await;
            drop(permit);
        });

        Ok(receiver)
    }

    async fn admit(&self, segment: SegmentRequest, reply: oneshot::Sender<SegmentOutcome>) {
        let key = segment.cache_key();
        debug!(
            "Encoding requested {:?}:{}",
            segment.source, segment.segment_index
        );

        let Some(reply) = self.attach(&key, reply) else {
            return;
        };

        match self.shared.cache.lookup(&key).await {
            Ok(Some(bytes)) => {
                debug!(key = %key, "Segment cache hit");
                let _ = reply.send(Ok(bytes));
                return;
            }
            Ok(None) => {}
            Err(e) => {
                let _ = reply.send(Err(e.into()));
                return;
            }
        }

        // A flight may have started while the cache was being read.
        match self.shared.flights.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                match entry.get_mut() {
                    Flight::Pending(waiters) => waiters.push(reply),
                    Flight::Storing(bytes) => {
                        let _ = reply.send(Ok(bytes.clone()));
                    }
                }
                return;
            }
            Entry::Vacant(entry) => {
                entry.insert(Flight::Pending(Vec::new()));
            }
        }

        if let Err(mpsc::error::SendError(job)) = self
            .sender
            .send(EncodingJob::reply_to(segment.clone(), reply))
            .await
        {
            self.shared.land(&key, job.delivery, Err(SegmentError::QueueClosed));
            return;
        }

        for offset in 1..=self.prefetch_segments {
            self.warm(segment.following(offset));
        }
    }

    /// Join an existing flight for `key`, or hand `reply` back if there is none.
    fn attach(
        &self,
        key: &CacheKey,
        reply: oneshot::Sender<SegmentOutcome>,
    ) -> Option<oneshot::Sender<SegmentOutcome>> {
        let Some(mut flight) = self.shared.flights.get_mut(key) else {
            return Some(reply);
        };

        match &mut *flight {
            Flight::Pending(waiters) => {
                debug!(key = %key, "Attaching to in-flight encode");
                waiters.push(reply);
            }
            Flight::Storing(bytes) => {
                let _ = reply.send(Ok(bytes.clone()));
            }
        }
        None
    }

    /// Queue a warmup job unless the segment is already in flight.
    ///
    /// Never waits: with the queue full the warmup is dropped.
    fn warm(&self, segment: SegmentRequest) {
        let key = segment.cache_key();
        match self.shared.flights.entry(key.clone()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(entry) => {
                entry.insert(Flight::Pending(Vec::new()));
            }
        }

        match self.sender.try_send(EncodingJob::warmup(segment)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(job)) => {
                warn!(
                    key = %key,
                    segment = job.segment.segment_index,
                    "Encoding queue full, dropping warmup"
                );
                self.shared.land(&key, job.delivery, Err(SegmentError::QueueFull));
            }
            Err(mpsc::error::TrySendError::Closed(job)) => {
                self.shared.land(&key, job.delivery, Err(SegmentError::QueueClosed));
            }
        }
    }
}

impl Shared {
    /// Run one dequeued job to completion.
    async fn process(&self, job: EncodingJob) {
        let key = job.segment.cache_key();

        match self.cache.lookup(&key).await {
            Ok(Some(bytes)) => {
                self.land(&key, job.delivery, Ok(bytes));
                return;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %key, "Segment cache lookup failed: {}", e);
                self.land(&key, job.delivery, Err(e.into()));
                return;
            }
        }

        debug!(
            "Encoding {:?}:{}",
            job.segment.source, job.segment.segment_index
        );

        let encoded = self
            .encoder
            .encode_segment(
                &job.segment.source,
                job.segment.segment_index,
                job.segment.resolution,
            )
            .await;

        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(
                    source = ?job.segment.source,
                    segment = job.segment.segment_index,
                    warmup = job.delivery.is_warmup(),
                    "Error encoding: {}",
                    e
                );
                self.land(&key, job.delivery, Err(e.into()));
                return;
            }
        };

        // Deliver first: caching never delays or fails a request.
        let waiters = match self.flights.get_mut(&key) {
            Some(mut flight) => {
                match std::mem::replace(&mut *flight, Flight::Storing(bytes.clone())) {
                    Flight::Pending(waiters) => waiters,
                    Flight::Storing(_) => Vec::new(),
                }
            }
            None => Vec::new(),
        };
        job.delivery.deliver(Ok(bytes.clone()));
        for waiter in waiters {
            let _ = waiter.send(Ok(bytes.clone()));
        }

        if let Err(e) = self.cache.store(&key, bytes).await {
            warn!(key = %key, "Could not cache segment: {}", e);
        }
        self.flights.remove(&key);
    }

    /// End the flight for `key` and hand `outcome` to everyone waiting on it.
    fn land(&self, key: &CacheKey, delivery: Delivery, outcome: SegmentOutcome) {
        let waiters = match self.flights.remove(key) {
            Some((_, Flight::Pending(waiters))) => waiters,
            _ => Vec::new(),
        };

        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
        delivery.deliver(outcome);
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<EncodingJob>>>,
    shared: Arc<Shared>,
) {
    debug!(worker, "Encoding worker started");

    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };
        shared.process(job).await;
    }

    debug!(worker, "Encoding worker stopped");
}
