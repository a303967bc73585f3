//! # Worker Pool
//!
//! A fixed set of long-lived threads, each owning a horizontal band of the output
//! frame. Frames are dispatched with a two-flag handshake per worker:
//!
//! ```text
//!  scheduler                          worker i
//!  ─────────                          ────────
//!  finish = false
//!  update = true, job = Some(..) ──▶  wakes (update || stop)
//!  notify update_cv                   runs job on its rows
//!                                     update = false
//!  waits while !finish        ◀──────  finish = true, notify finish_cv
//! ```
//!
//! Each flag has its own `Mutex` + `Condvar`. Both sides always wait in a predicate
//! loop, so spurious wakeups are harmless. A panicking job is caught on the worker,
//! reported through the finish state and surfaces as [`RotateError::Worker`]; the
//! worker then waits for the next frame as usual.
//!
//! ## Row Partitioning
//!
//! Worker `i` of `N` owns rows `[H*i/N, H*(i+1)/N)` of a plane with `H` rows. The
//! bands tile `[0, H)` exactly, with no gaps and no overlap, for any `N >= 1`.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use tracing::{debug, trace, warn};

use crate::core::thread_policy::SchedulingPolicy;
use crate::error::{RotateError, RotateResult};

/// Work handed to one worker for one frame.
pub trait WorkerJob: Send + 'static {
    /// Worker-local state that survives across frames (private table copies).
    type Cache: Default;

    /// `Err` carries the reason reported for the failed frame.
    fn execute(self, worker: usize, cache: &mut Self::Cache) -> Result<(), String>;
}

/// Rows of each plane a worker owns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerRows {
    pub luma: Range<usize>,
    pub chroma: Range<usize>,
}

impl WorkerRows {
    /// First and last luma row, or `None` for an empty band.
    pub fn luma_inclusive(&self) -> Option<(usize, usize)> {
        inclusive(&self.luma)
    }

    pub fn chroma_inclusive(&self) -> Option<(usize, usize)> {
        inclusive(&self.chroma)
    }
}

fn inclusive(r: &Range<usize>) -> Option<(usize, usize)> {
    (!r.is_empty()).then(|| (r.start, r.end - 1))
}

/// Split `total` rows into `workers` contiguous bands.
pub fn partition_rows(total: usize, workers: usize) -> Vec<Range<usize>> {
    let n = workers.max(1);
    (0..n).map(|i| total * i / n..total * (i + 1) / n).collect()
}

struct UpdateState<J> {
    armed: bool,
    job: Option<J>,
}

struct FinishState {
    done: bool,
    failure: Option<String>,
}

struct WorkerSlot<J> {
    update: Mutex<UpdateState<J>>,
    update_cv: Condvar,
    finish: Mutex<FinishState>,
    finish_cv: Condvar,
}

struct Shared<J> {
    slots: Vec<WorkerSlot<J>>,
    stop: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fixed pool of workers executing one [`WorkerJob`] each per frame.
pub struct WorkerPool<J: WorkerJob> {
    shared: Arc<Shared<J>>,
    handles: Vec<JoinHandle<()>>,
    rows: Vec<WorkerRows>,
}

impl<J: WorkerJob> WorkerPool<J> {
    /// Start `count` workers. If any thread fails to start, the ones already
    /// running are stopped and joined before the error is returned.
    pub fn spawn(count: usize, policy: SchedulingPolicy) -> RotateResult<Self> {
        let count = count.max(1);
        let slots = (0..count)
            .map(|_| WorkerSlot {
                update: Mutex::new(UpdateState { armed: false, job: None }),
                update_cv: Condvar::new(),
                finish: Mutex::new(FinishState { done: true, failure: None }),
                finish_cv: Condvar::new(),
            })
            .collect();
        let shared = Arc::new(Shared { slots, stop: AtomicBool::new(false) });
        let mut pool = Self {
            shared,
            handles: Vec::with_capacity(count),
            rows: vec![WorkerRows::default(); count],
        };

        for index in 0..count {
            let shared = Arc::clone(&pool.shared);
            let spawned = std::thread::Builder::new()
                .name(format!("frame-rotate-{index}"))
                .spawn(move || worker_main(index, shared, policy));
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    let created = pool.handles.len();
                    warn!(created, requested = count, error = %e, "worker spawn failed");
                    drop(pool);
                    return Err(RotateError::thread_spawn(created, count, e));
                }
            }
        }
        debug!(workers = count, ?policy, "worker pool started");
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.shared.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.slots.is_empty()
    }

    pub fn rows(&self) -> &[WorkerRows] {
        &self.rows
    }

    /// Re-partition rows for a new output size. Waits for any in-flight frame.
    pub fn update_thread_params(&mut self, luma_rows: usize, chroma_rows: usize) {
        self.wait_idle();
        let n = self.len();
        self.rows = partition_rows(luma_rows, n)
            .into_iter()
            .zip(partition_rows(chroma_rows, n))
            .map(|(luma, chroma)| WorkerRows { luma, chroma })
            .collect();
        trace!(luma_rows, chroma_rows, workers = n, "rows repartitioned");
    }

    /// Run one job per worker and block until every worker has finished.
    ///
    /// Returns only after all workers are idle again, even when one of them failed.
    pub fn run_frame(&mut self, jobs: Vec<J>) -> RotateResult<()> {
        if jobs.len() != self.len() {
            return Err(RotateError::validation(
                "jobs",
                format!("exactly one job per worker ({})", self.len()),
                jobs.len().to_string(),
            ));
        }

        for (slot, job) in self.shared.slots.iter().zip(jobs) {
            {
                let mut finish = lock(&slot.finish);
                finish.done = false;
                finish.failure = None;
            }
            {
                let mut update = lock(&slot.update);
                update.job = Some(job);
                update.armed = true;
            }
            slot.update_cv.notify_one();
        }

        let mut failure = None;
        for (index, slot) in self.shared.slots.iter().enumerate() {
            let mut finish = lock(&slot.finish);
            while !finish.done {
                finish = slot.finish_cv.wait(finish).unwrap_or_else(PoisonError::into_inner);
            }
            if let Some(reason) = finish.failure.take() {
                failure.get_or_insert((index, reason));
            }
            drop(finish);
            lock(&slot.update).armed = false;
        }

        match failure {
            Some((worker, reason)) => Err(RotateError::worker(worker, reason).with_operation("run_frame")),
            None => Ok(()),
        }
    }

    fn wait_idle(&self) {
        for slot in &self.shared.slots {
            let mut finish = lock(&slot.finish);
            while !finish.done {
                finish = slot.finish_cv.wait(finish).unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    fn shutdown(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        for slot in &self.shared.slots {
            let _update = lock(&slot.update);
            slot.update_cv.notify_all();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread panicked outside a job");
            }
        }
    }
}

impl<J: WorkerJob> Drop for WorkerPool<J> {
    fn drop(&mut self) {
        self.shutdown();
        trace!("worker pool stopped");
    }
}

fn worker_main<J: WorkerJob>(index: usize, shared: Arc<Shared<J>>, policy: SchedulingPolicy) {
    policy.apply_to_current(index);
    let slot = &shared.slots[index];
    let mut cache = J::Cache::default();

    loop {
        let job = {
            let mut update = lock(&slot.update);
            while !update.armed && !shared.stop.load(Ordering::Acquire) {
                update = slot.update_cv.wait(update).unwrap_or_else(PoisonError::into_inner);
            }
            if shared.stop.load(Ordering::Acquire) {
                break;
            }
            update.job.take()
        };

        let failure = job.and_then(|job| {
            match panic::catch_unwind(AssertUnwindSafe(|| job.execute(index, &mut cache))) {
                Ok(Ok(())) => None,
                Ok(Err(reason)) => Some(reason),
                Err(payload) => Some(panic_message(payload)),
            }
        });
        if failure.is_some() {
            cache = J::Cache::default();
        }

        lock(&slot.update).armed = false;
        let mut finish = lock(&slot.finish);
        finish.done = true;
        finish.failure = failure;
        slot.finish_cv.notify_one();
    }
    trace!(worker = index, "worker exiting");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "kernel panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    /// Marks every row of its band once.
    struct Sentinel {
        rows: Range<usize>,
        hits: Arc<Vec<AtomicU32>>,
        owner: Arc<Vec<AtomicU32>>,
    }

    impl WorkerJob for Sentinel {
        type Cache = u32;

        fn execute(self, worker: usize, frames: &mut u32) -> Result<(), String> {
            *frames += 1;
            for r in self.rows {
                self.hits[r].fetch_add(1, Ordering::Relaxed);
                self.owner[r].store(worker as u32, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    struct Boom;

    impl WorkerJob for Boom {
        type Cache = ();

        fn execute(self, worker: usize, _: &mut ()) -> Result<(), String> {
            match worker {
                1 => panic!("bad rows"),
                2 => Err("missing table".to_string()),
                _ => Ok(()),
            }
        }
    }

    fn counters(n: usize) -> Arc<Vec<AtomicU32>> {
        Arc::new((0..n).map(|_| AtomicU32::new(0)).collect())
    }

    #[test]
    fn test_partition_covers_every_row_once() {
        for workers in [1, 2, 4, 6] {
            for total in [0, 1, 5, 6, 7, 540, 1079, 1080] {
                let bands = partition_rows(total, workers);
                assert_eq!(bands.len(), workers);
                let mut next = 0;
                for band in &bands {
                    assert_eq!(band.start, next, "gap/overlap: {workers} workers, {total} rows");
                    assert!(band.end >= band.start);
                    next = band.end;
                }
                assert_eq!(next, total);
            }
        }
    }

    #[test]
    fn test_inclusive_bounds() {
        let rows = WorkerRows { luma: 0..270, chroma: 0..0 };
        assert_eq!(rows.luma_inclusive(), Some((0, 269)));
        assert_eq!(rows.chroma_inclusive(), None);
    }

    #[test]
    fn test_every_worker_writes_only_its_band() {
        let mut pool: WorkerPool<Sentinel> = WorkerPool::spawn(6, SchedulingPolicy::default()).unwrap();
        pool.update_thread_params(1080, 540);
        assert_eq!(pool.rows()[5].luma, 900..1080);
        assert_eq!(pool.rows()[5].chroma, 450..540);

        let hits = counters(1080);
        let owner = counters(1080);
        for _ in 0..3 {
            let jobs = pool
                .rows()
                .iter()
                .map(|r| Sentinel { rows: r.luma.clone(), hits: hits.clone(), owner: owner.clone() })
                .collect();
            pool.run_frame(jobs).unwrap();
        }
        for (row, h) in hits.iter().enumerate() {
            assert_eq!(h.load(Ordering::Relaxed), 3, "row {row}");
            let expected = pool.rows().iter().position(|r| r.luma.contains(&row)).unwrap();
            assert_eq!(owner[row].load(Ordering::Relaxed) as usize, expected);
        }
    }

    #[test]
    fn test_panic_is_reported_and_pool_survives() {
        let mut pool: WorkerPool<Boom> = WorkerPool::spawn(3, SchedulingPolicy::default()).unwrap();
        let err = pool.run_frame(vec![Boom, Boom, Boom]).unwrap_err();
        match err {
            RotateError::Worker { worker, reason, .. } => {
                assert_eq!(worker, 1);
                assert_eq!(reason, "bad rows");
            }
            other => panic!("unexpected error {other}"),
        }
        // Still dispatches afterwards; the first failing worker is reported.
        assert!(pool.run_frame(vec![Boom, Boom, Boom]).is_err());
    }

    #[test]
    fn test_job_count_must_match() {
        let mut pool: WorkerPool<Boom> = WorkerPool::spawn(2, SchedulingPolicy::default()).unwrap();
        assert!(matches!(pool.run_frame(vec![Boom]), Err(RotateError::Validation { .. })));
    }

    #[test]
    fn test_drop_joins_idle_workers() {
        let pool: WorkerPool<Boom> = WorkerPool::spawn(4, SchedulingPolicy::default()).unwrap();
        assert_eq!(pool.len(), 4);
        drop(pool);
    }
}
