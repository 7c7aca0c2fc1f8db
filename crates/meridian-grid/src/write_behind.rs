//! Background chunk saving with a bounded worker pool.
//!
//! [`WriteBehindStore`] wraps any [`ChunkStore`] and moves its writes onto
//! named worker threads fed by bounded `crossbeam-channel` queues. Jobs are
//! sharded by coordinate hash, so all writes for one coordinate run on the
//! same worker in submission order.
//!
//! Until a write lands, its record stays in a pending map that
//! [`read`](ChunkStore::read) consults first. A chunk that re-enters the
//! window while its save is still queued is therefore restored from the
//! pending record rather than from stale storage. Saves are never
//! cancelled: dropping the store drains every queue before returning.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use dashmap::DashMap;
use rustc_hash::FxHasher;
use tracing::{debug, warn};

use crate::coords::ChunkCoord;
use crate::error::StoreError;
use crate::record::ChunkRecord;
use crate::store::{ChunkStore, SaveFailure};

/// Default per-worker queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

enum Job {
    Write { seq: u64, record: ChunkRecord },
    Flush(Sender<()>),
}

struct Pending {
    seq: u64,
    record: ChunkRecord,
}

/// Write-behind wrapper around another store.
pub struct WriteBehindStore {
    inner: Arc<dyn ChunkStore>,
    queues: Vec<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<DashMap<ChunkCoord, Pending>>,
    failures: Receiver<SaveFailure>,
    in_flight: Arc<AtomicU64>,
    next_seq: AtomicU64,
}

impl WriteBehindStore {
    /// Spawns `worker_count` save workers, each with a queue of
    /// `queue_capacity` jobs. Both are clamped to at least 1.
    ///
    /// A full queue blocks [`write`](ChunkStore::write) until a slot frees.
    pub fn new(
        inner: Arc<dyn ChunkStore>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> Result<Self, StoreError> {
        let worker_count = worker_count.max(1);
        let pending: Arc<DashMap<ChunkCoord, Pending>> = Arc::new(DashMap::new());
        let in_flight = Arc::new(AtomicU64::new(0));
        let (failure_sender, failures) = unbounded::<SaveFailure>();

        let mut queues = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let (sender, receiver) = bounded::<Job>(queue_capacity.max(1));
            let inner = Arc::clone(&inner);
            let pending = Arc::clone(&pending);
            let in_flight = Arc::clone(&in_flight);
            let failure_sender = failure_sender.clone();

            let handle = std::thread::Builder::new()
                .name(format!("chunk-save-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = receiver.recv() {
                        match job {
                            Job::Write { seq, record } => {
                                let coord = record.coord;
                                if let Err(error) = inner.write(record) {
                                    warn!(chunk = %coord, %error, "background chunk save failed");
                                    let _ = failure_sender.send(SaveFailure { coord, error });
                                }
                                // A newer write for the same chunk keeps its entry.
                                pending.remove_if(&coord, |_, p| p.seq == seq);
                                in_flight.fetch_sub(1, Ordering::AcqRel);
                            }
                            Job::Flush(ack) => {
                                let _ = ack.send(());
                            }
                        }
                    }
                })
                .map_err(StoreError::Spawn)?;

            queues.push(sender);
            workers.push(handle);
        }

        debug!(workers = worker_count, "started chunk save workers");

        Ok(Self {
            inner,
            queues,
            workers,
            pending,
            failures,
            in_flight,
            next_seq: AtomicU64::new(0),
        })
    }

    /// Pool sized from the CPU count, with [`DEFAULT_QUEUE_CAPACITY`].
    pub fn with_defaults(inner: Arc<dyn ChunkStore>) -> Result<Self, StoreError> {
        let workers = (num_cpus::get() / 2).max(1);
        Self::new(inner, workers, DEFAULT_QUEUE_CAPACITY)
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Writes queued or executing.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a save for `coord` has not landed yet.
    pub fn is_pending(&self, coord: ChunkCoord) -> bool {
        self.pending.contains_key(&coord)
    }

    fn shard(&self, coord: ChunkCoord) -> usize {
        let mut hasher = FxHasher::default();
        coord.hash(&mut hasher);
        (hasher.finish() % self.queues.len() as u64) as usize
    }
}

impl ChunkStore for WriteBehindStore {
    fn read(&self, coord: ChunkCoord) -> Result<Option<ChunkRecord>, StoreError> {
        if let Some(pending) = self.pending.get(&coord) {
            return Ok(Some(pending.record.clone()));
        }
        self.inner.read(coord)
    }

    fn write(&self, record: ChunkRecord) -> Result<(), StoreError> {
        let coord = record.coord;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(
            coord,
            Pending {
                seq,
                record: record.clone(),
            },
        );
        self.in_flight.fetch_add(1, Ordering::AcqRel);

        if self.queues[self.shard(coord)]
            .send(Job::Write { seq, record })
            .is_err()
        {
            self.pending.remove_if(&coord, |_, p| p.seq == seq);
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            return Err(StoreError::WorkerGone);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let mut acks = Vec::with_capacity(self.queues.len());
        for queue in &self.queues {
            let (ack, done) = bounded(1);
            queue
                .send(Job::Flush(ack))
                .map_err(|_| StoreError::WorkerGone)?;
            acks.push(done);
        }
        for done in acks {
            done.recv().map_err(|_| StoreError::WorkerGone)?;
        }
        self.inner.flush()
    }

    fn take_failures(&self) -> Vec<SaveFailure> {
        let mut failures: Vec<SaveFailure> = self.failures.try_iter().collect();
        failures.extend(self.inner.take_failures());
        failures
    }
}

impl Drop for WriteBehindStore {
    fn drop(&mut self) {
        // Closing the queues lets each worker finish its backlog and exit.
        self.queues.clear();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("chunk save worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for WriteBehindStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBehindStore")
            .field("workers", &self.workers.len())
            .field("pending", &self.pending.len())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
