//! The per-worker job dispatched through the worker pool.
//!
//! Workers are long-lived threads, so a job cannot borrow the caller's frame or
//! the context's output planes through the type system. It carries raw views
//! instead, and [`FrameJob::new`] is `unsafe`: the caller must keep the source
//! planes alive and the destination bands exclusively borrowed until
//! `WorkerPool::run_frame` has returned.

use std::sync::Arc;

use crate::core::table_arena::TableGeneration;
use crate::core::worker_pool::{WorkerJob, WorkerRows};
use crate::processing::{self, DstBand, KernelPlan, SourceFrame, WorkerCache};

#[derive(Clone, Copy, Debug)]
struct RawSlice {
    ptr: *const u8,
    len: usize,
}

impl RawSlice {
    fn new(slice: &[u8]) -> Self {
        Self { ptr: slice.as_ptr(), len: slice.len() }
    }

    /// # Safety
    /// The original slice must still be alive and not mutated.
    unsafe fn get<'a>(self) -> &'a [u8] {
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }
}

#[derive(Debug)]
struct RawBand {
    ptr: *mut u8,
    len: usize,
}

impl RawBand {
    fn new(slice: &mut [u8]) -> Self {
        Self { ptr: slice.as_mut_ptr(), len: slice.len() }
    }

    /// # Safety
    /// The original slice must still be alive and not accessed by anyone else.
    unsafe fn get<'a>(self) -> &'a mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }
}

/// One worker's share of one frame.
#[derive(Debug)]
pub struct FrameJob {
    plan: KernelPlan,
    tables: Arc<TableGeneration>,
    luma: RawSlice,
    chroma: RawSlice,
    stride: usize,
    rows: WorkerRows,
    primary: RawBand,
    chroma_out: RawBand,
}

// SAFETY: the raw views are only dereferenced inside `execute`, while the
// caller of `new` guarantees the memory stays valid. Source views are shared
// read-only; destination bands are disjoint between jobs of one frame.
unsafe impl Send for FrameJob {}

impl FrameJob {
    /// # Safety
    /// `src` must outlive the job's execution and must not be mutated meanwhile;
    /// `primary` and `chroma` must not be accessed by anything else until the job
    /// has finished. `WorkerPool::run_frame` blocks until every job has finished,
    /// so borrowing for the duration of that call satisfies both.
    pub unsafe fn new(
        plan: KernelPlan,
        tables: Arc<TableGeneration>,
        src: &SourceFrame<'_>,
        rows: WorkerRows,
        primary: &mut [u8],
        chroma: &mut [u8],
    ) -> Self {
        Self {
            plan,
            tables,
            luma: RawSlice::new(src.luma),
            chroma: RawSlice::new(src.chroma),
            stride: src.stride,
            rows,
            primary: RawBand::new(primary),
            chroma_out: RawBand::new(chroma),
        }
    }
}

impl WorkerJob for FrameJob {
    type Cache = WorkerCache;

    fn execute(self, _worker: usize, cache: &mut WorkerCache) -> Result<(), String> {
        // SAFETY: upheld by the contract of `FrameJob::new`.
        let (src, dst) = unsafe {
            (
                SourceFrame { luma: self.luma.get(), chroma: self.chroma.get(), stride: self.stride },
                DstBand { rows: self.rows, primary: self.primary.get(), chroma: self.chroma_out.get() },
            )
        };
        processing::run(&self.plan, &self.tables, &src, dst, cache)
    }
}
