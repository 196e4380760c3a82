use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, TryRecvError, bounded};
use geist_blocks::BlockRegistry;
use geist_chunk::{ChunkFlags, ChunkStore};
use geist_lighting::{
    ApplyOutcome, ColumnSunlight, LightEngine, apply_column_sunlight, compute_column_sunlight,
    snapshot_cluster,
};
use geist_world::{ChunkCoord, ColumnCoord};
use hashbrown::{HashMap, HashSet};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::RuntimeConfig;

/// The one column job allowed in flight.
struct ColumnJob {
    column: ColumnCoord,
    rx: Receiver<ColumnSunlight>,
    started: Instant,
}

/// What [`ColumnInitializer::poll_column_job`] did this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnPoll {
    /// No job in flight and nothing could be scheduled.
    Idle,
    /// The in-flight job has not finished.
    Running(ColumnCoord),
    /// A new job was started for this column.
    Scheduled(ColumnCoord),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InitializerStats {
    pub scheduled: u64,
    pub applied: u64,
    /// Results discarded because the column was edited while the job ran.
    pub stale: u64,
    /// Jobs whose worker went away without a result.
    pub lost: u64,
    /// Scheduling attempts that found an incomplete cluster.
    pub blocked: u64,
    pub finalized: u64,
    /// Chunks finalized by the settle limit rather than by their neighbors.
    pub forced: u64,
}

/// Single-flight scheduler for the column sunlight pass, plus boundary finalization.
pub struct ColumnInitializer {
    pending: VecDeque<ColumnCoord>,
    queued: HashSet<ColumnCoord>,
    job: Option<ColumnJob>,
    pool: ThreadPool,
    settle: HashMap<ChunkCoord, u32>,
    max_attempts: usize,
    settle_limit: u32,
    stats: InitializerStats,
}

impl ColumnInitializer {
    pub fn new(cfg: &RuntimeConfig) -> Self {
        let pool = ThreadPoolBuilder::new()
            .num_threads(cfg.sunlight_threads.max(1))
            .thread_name(|i| format!("geist-sunlight-{i}"))
            .panic_handler(|_| log::error!(target: "sunlight", "column job panicked"))
            .build()
            .expect("sunlight pool");
        Self {
            pending: VecDeque::new(),
            queued: HashSet::new(),
            job: None,
            pool,
            settle: HashMap::new(),
            max_attempts: cfg.max_cluster_attempts_per_tick.max(1),
            settle_limit: cfg.finalize_settle_limit,
            stats: InitializerStats::default(),
        }
    }

    /// Queues `column` for the sky pass. Repeated requests for a column that is already
    /// pending are ignored.
    pub fn request_column_initialization(&mut self, column: ColumnCoord) {
        if self.queued.insert(column) {
            self.pending.push_back(column);
        }
    }

    fn requeue(&mut self, column: ColumnCoord) {
        self.request_column_initialization(column);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> Option<ColumnCoord> {
        self.job.as_ref().map(|j| j.column)
    }

    pub fn is_idle(&self) -> bool {
        self.job.is_none() && self.pending.is_empty()
    }

    pub fn stats(&self) -> InitializerStats {
        self.stats
    }

    /// Completes the in-flight job if its result is ready, then starts the next one.
    ///
    /// While a job is running nothing else happens. A finished result is applied and its
    /// cluster released before any new snapshot is taken, so scheduling can follow in the
    /// same call.
    pub fn poll_column_job<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        engine: &mut LightEngine,
        registry: &Arc<BlockRegistry>,
    ) -> ColumnPoll {
        if let Some(job) = self.job.take() {
            match job.rx.try_recv() {
                Ok(result) => self.finish(store, engine, job, Some(result)),
                Err(TryRecvError::Empty) => {
                    let column = job.column;
                    self.job = Some(job);
                    return ColumnPoll::Running(column);
                }
                Err(TryRecvError::Disconnected) => self.finish(store, engine, job, None),
            }
        }
        self.schedule(store, registry)
    }

    /// Blocks until the in-flight job (if any) finishes and applies it. Does not schedule.
    pub fn wait_column_job<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        engine: &mut LightEngine,
    ) -> Option<ColumnCoord> {
        let job = self.job.take()?;
        let column = job.column;
        let result = job.rx.recv().ok();
        self.finish(store, engine, job, result);
        Some(column)
    }

    fn finish<S: ChunkStore + ?Sized>(
        &mut self,
        store: &mut S,
        engine: &mut LightEngine,
        job: ColumnJob,
        result: Option<ColumnSunlight>,
    ) {
        let column = job.column;
        let Some(result) = result else {
            log::error!(target: "sunlight", "column ({}, {}) job lost its worker; requeueing", column.cx, column.cz);
            self.stats.lost += 1;
            self.requeue(column);
            return;
        };
        let ms = job.started.elapsed().as_millis();
        match apply_column_sunlight(store, engine, result) {
            ApplyOutcome::Applied { chunks } => {
                self.stats.applied += 1;
                log::debug!(
                    target: "sunlight",
                    "column ({}, {}) applied to {} chunks in {}ms",
                    column.cx,
                    column.cz,
                    chunks,
                    ms
                );
            }
            ApplyOutcome::Stale => {
                self.stats.stale += 1;
                log::debug!(target: "sunlight", "column ({}, {}) edited during job; requeueing", column.cx, column.cz);
                self.requeue(column);
            }
        }
    }

    fn schedule<S: ChunkStore + ?Sized>(
        &mut self,
        store: &S,
        registry: &Arc<BlockRegistry>,
    ) -> ColumnPoll {
        let attempts = self.pending.len().min(self.max_attempts);
        for i in 0..attempts {
            let column = self.pending[i];
            let cluster = match snapshot_cluster(store, column) {
                Ok(cluster) => cluster,
                Err(blocker) => {
                    self.stats.blocked += 1;
                    log::trace!(
                        target: "sunlight",
                        "column ({}, {}) waiting on chunk ({}, {}, {})",
                        column.cx,
                        column.cz,
                        blocker.cx,
                        blocker.cy,
                        blocker.cz
                    );
                    continue;
                }
            };
            self.pending.remove(i);
            self.queued.remove(&column);

            let (tx, rx) = bounded(1);
            let registry = Arc::clone(registry);
            self.pool.spawn(move || {
                let result = compute_column_sunlight(cluster, &registry);
                let _ = tx.send(result);
            });
            self.job = Some(ColumnJob {
                column,
                rx,
                started: Instant::now(),
            });
            self.stats.scheduled += 1;
            log::debug!(target: "sunlight", "column ({}, {}) scheduled", column.cx, column.cz);
            return ColumnPoll::Scheduled(column);
        }
        ColumnPoll::Idle
    }

    /// Clears `INCOMPLETE_LIGHTING` on every chunk whose neighbors all carry `SUNLIGHT`,
    /// marking it dirty for a bulk rebuild. Returns how many chunks were finalized.
    ///
    /// A chunk that keeps failing the check is finalized anyway once it exceeds the settle
    /// limit; neighbors arriving later still reach it through the apply-time re-seed.
    pub fn finalize_ready_columns<S: ChunkStore + ?Sized>(&mut self, store: &mut S) -> usize {
        let height = store.column_height();
        let waiting = ChunkFlags::SUNLIGHT | ChunkFlags::INCOMPLETE_LIGHTING;
        self.settle.retain(|coord, _| store.chunk(*coord).is_some());

        let mut ready = Vec::new();
        for coord in store.chunk_coords() {
            let Some(chunk) = store.chunk(coord) else {
                continue;
            };
            if !chunk.flags.contains(waiting) {
                continue;
            }
            let settled = !chunk.flags.contains(ChunkFlags::DIRTY)
                && coord
                    .neighborhood()
                    .filter(|n| n.cy >= 0 && n.cy < height)
                    .all(|n| {
                        store
                            .lightable(n)
                            .is_some_and(|c| c.flags.contains(ChunkFlags::SUNLIGHT))
                    });
            if settled {
                ready.push((coord, false));
                continue;
            }
            let checks = self.settle.entry(coord).or_insert(0);
            *checks += 1;
            if *checks > self.settle_limit {
                ready.push((coord, true));
            }
        }

        for &(coord, forced) in &ready {
            if let Some(chunk) = store.chunk_mut(coord) {
                chunk.flags.remove(ChunkFlags::INCOMPLETE_LIGHTING);
            }
            store.mark_dirty(coord, false);
            self.settle.remove(&coord);
            self.stats.finalized += 1;
            if forced {
                self.stats.forced += 1;
                log::warn!(
                    target: "sunlight",
                    "chunk ({}, {}, {}) finalized after {} checks without settled neighbors",
                    coord.cx,
                    coord.cy,
                    coord.cz,
                    self.settle_limit
                );
            }
        }
        if !ready.is_empty() {
            log::debug!(target: "sunlight", "finalized {} chunks", ready.len());
        }
        ready.len()
    }
}
