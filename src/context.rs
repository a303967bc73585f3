//! # Rotation Context
//!
//! One [`RotationContext`] serves one decoded stream. `open` runs the init chain
//! (target geometry, lookup tables, output buffers, worker pool) and `apply`
//! rotates frames into the context's display planes until `close`.
//!
//! ## Lifecycle
//!
//! ```text
//!   new ──▶ Closed ──open(enable)──▶ Rotating ──close──▶ Closed
//!             │                         │  ▲
//!             │                         │  └─ apply with new source size: re-open
//!             └──open(!enable)──▶ Bypass (frames pass through untouched)
//! ```
//!
//! Each init stage owns what it built. When a later stage fails the earlier ones
//! are dropped on the way out, so a failed `open` leaves the context `Closed`.
//!
//! ## Example
//!
//! ```rust
//! use frame_rotate::config::RotateConfig;
//! use frame_rotate::pattern::Nv12Frame;
//! use frame_rotate::{Degree, RotationContext};
//!
//! let mut ctx = RotationContext::new();
//! ctx.open(&RotateConfig::new(90, 1280, 720)).unwrap();
//! assert_eq!((ctx.scaled_width(), ctx.scaled_height()), (404, 720));
//!
//! let frame = Nv12Frame::gradient(1280, 720, 1280, 7);
//! let input = frame.descriptor();
//! let output = ctx.apply(&input, Degree::D90).unwrap().frame().unwrap();
//! assert_eq!((output.width, output.height), (404, 720));
//! ```

use std::sync::Arc;
use std::time::Instant;

use rotate_geometry::dims::{compute_target_dimensions, is_low_resolution};
use rotate_geometry::presets::{CapabilityProfile, OutputPacking};
use rotate_geometry::tiled::TiledSurface;
use rotate_geometry::{Degree, Size};
use tracing::{debug, info, trace, warn};

use crate::config::RotateConfig;
use crate::core::buffer_pool::{BufferSpec, FrameBuffers};
use crate::core::frame_timing::FrameTiming;
use crate::core::table_arena::{TableArena, TableGeneration, TableKey};
use crate::core::thread_policy::SchedulingPolicy;
use crate::core::worker_pool::WorkerPool;
use crate::error::{RotateError, RotateResult};
use crate::frame::{ApplyOutcome, ColorFormat, FrameDescriptor, FrameFlags};
use crate::processing::job::FrameJob;
use crate::processing::throttle::FpsThrottle;
use crate::processing::{Kernel, KernelPlan, SourceFrame, SourceLayout};

/// Everything built by a successful `open` with rotation enabled.
struct Engine {
    source: Size,
    stride: u32,
    layout: SourceLayout,
    low_res: bool,
    interlaced: bool,
    surfaces: Option<(TiledSurface, TiledSurface)>,
    plan: KernelPlan,
    generation: Arc<TableGeneration>,
    arena: TableArena,
    buffers: FrameBuffers,
    pool: WorkerPool<FrameJob>,
}

impl Engine {
    fn start(profile: &CapabilityProfile, config: &RotateConfig) -> RotateResult<Self> {
        let source = config.source_size();
        let degree = config.normalized_degree();
        let low_res = is_low_resolution(source, profile);
        let target = compute_target_dimensions(source, degree, low_res, profile)?;
        let layout = if profile.is_tiled_codec(config.codec) { SourceLayout::Tiled } else { SourceLayout::Linear };
        let stride = config.effective_line_size();
        let plan = KernelPlan::for_profile(profile, source, degree, layout, target, config.interlaced, low_res);
        debug!(source = %source, target = %target, degree = degree.degrees(), ?layout, low_res, "geometry computed");

        let mut arena = TableArena::new();
        let key = table_key(profile, &plan, stride);
        let surfaces = key.surfaces()?;
        let generation = arena.ensure(key)?;

        let buffers = FrameBuffers::acquire(BufferSpec {
            panel: profile.panel,
            output: plan.output,
            memory: profile.display_memory,
            staging: profile.staging,
        })?;

        let policy = SchedulingPolicy { priority: profile.priority, affinity: profile.affinity };
        let mut pool = WorkerPool::spawn(profile.worker_count(source), policy)?;
        pool.update_thread_params(target.h as usize, plan.chroma_rows());

        Ok(Self {
            source,
            stride,
            layout,
            low_res,
            interlaced: config.interlaced,
            surfaces,
            plan,
            generation,
            arena,
            buffers,
            pool,
        })
    }

    fn set_degree(&mut self, profile: &CapabilityProfile, degree: Degree) -> RotateResult<()> {
        if degree == self.plan.degree {
            return Ok(());
        }
        let target = compute_target_dimensions(self.source, degree, self.low_res, profile)?;
        let plan =
            KernelPlan::for_profile(profile, self.source, degree, self.layout, target, self.interlaced, self.low_res);
        self.generation = self.arena.ensure(table_key(profile, &plan, self.stride))?;
        self.pool.update_thread_params(target.h as usize, plan.chroma_rows());
        self.plan = plan;
        debug!(degree = degree.degrees(), target = %target, kernel = ?plan.kernel(), "degree changed");
        Ok(())
    }

    /// Reject planes too small for what the kernels will read.
    fn check_planes(&self, src: &SourceFrame<'_>) -> RotateResult<()> {
        let (luma, chroma) = match self.surfaces {
            Some((luma, chroma)) => (luma.len(), chroma.len()),
            None => {
                let even = self.source.even();
                let stride = self.stride as usize;
                let rows = even.h as usize;
                (
                    rows.saturating_sub(1) * stride + even.w as usize,
                    (rows / 2).saturating_sub(1) * stride + even.w as usize,
                )
            }
        };
        if src.luma.len() < luma {
            return Err(RotateError::validation("luma plane", format!("at least {luma} bytes"), src.luma.len().to_string()));
        }
        if src.chroma.len() < chroma {
            return Err(RotateError::validation(
                "chroma plane",
                format!("at least {chroma} bytes"),
                src.chroma.len().to_string(),
            ));
        }
        Ok(())
    }

    /// Dispatch one frame to every worker and publish the result.
    fn render(&mut self, frame: &FrameDescriptor<'_>) -> RotateResult<()> {
        let src = SourceFrame { luma: frame.luma(), chroma: frame.chroma(), stride: self.stride as usize };
        self.check_planes(&src)?;

        let (primary_len, chroma_len) = self.plan.output_len();
        let (primary_row, chroma_row) = (self.plan.primary_row_bytes(), self.plan.chroma_row_bytes());
        let (primary, chroma) = self.buffers.work_planes()?;
        let mut primary = &mut primary[..primary_len];
        let mut chroma = &mut chroma[..chroma_len];

        let mut jobs = Vec::with_capacity(self.pool.len());
        for rows in self.pool.rows() {
            let (band, rest) = std::mem::take(&mut primary).split_at_mut(rows.luma.len() * primary_row);
            primary = rest;
            let (chroma_band, rest) = std::mem::take(&mut chroma).split_at_mut(rows.chroma.len() * chroma_row);
            chroma = rest;
            // SAFETY: `frame` and the work planes stay borrowed until `run_frame`
            // below returns, which waits for every job. Bands are disjoint splits.
            let job = unsafe {
                FrameJob::new(self.plan, Arc::clone(&self.generation), &src, rows.clone(), band, chroma_band)
            };
            jobs.push(job);
        }

        self.pool.run_frame(jobs)?;
        self.buffers.publish(primary_len, chroma_len)
    }

    fn output(&self, flags: FrameFlags) -> RotateResult<FrameDescriptor<'_>> {
        let (primary, chroma) = self.buffers.display_planes()?;
        let (primary_len, chroma_len) = self.plan.output_len();
        let t = self.plan.target;
        let mut frame = match self.plan.output {
            OutputPacking::Planar => {
                FrameDescriptor::nv12(&primary[..primary_len], &chroma[..chroma_len], t.w as usize, t.w, t.h)
            }
            OutputPacking::Yuyv => FrameDescriptor::yuyv(&primary[..primary_len], t.w, t.h),
        };
        frame.flags = flags;
        Ok(frame)
    }
}

fn table_key(profile: &CapabilityProfile, plan: &KernelPlan, stride: u32) -> TableKey {
    TableKey {
        degree: plan.degree,
        source: plan.source,
        stride,
        target: plan.target,
        tile: match plan.layout {
            SourceLayout::Tiled => profile.tile,
            SourceLayout::Linear => None,
        },
        skip: plan.skip,
    }
}

enum Mode {
    Closed,
    /// Opened with rotation disabled.
    Bypass,
    Rotating(Box<Engine>),
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Mode::Closed => "closed",
            Mode::Bypass => "bypass",
            Mode::Rotating(_) => "rotating",
        }
    }
}

/// Rotation engine state for one stream.
pub struct RotationContext {
    profile: CapabilityProfile,
    config: RotateConfig,
    mode: Mode,
    degree: Degree,
    rotation_changed: bool,
    last_target: Option<Size>,
    throttle: FpsThrottle,
    timing: FrameTiming,
}

impl Default for RotationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationContext {
    /// Context for the generic profile.
    pub fn new() -> Self {
        Self::with_profile(CapabilityProfile::generic())
    }

    pub fn with_profile(profile: CapabilityProfile) -> Self {
        Self {
            profile,
            config: RotateConfig::default(),
            mode: Mode::Closed,
            degree: Degree::D0,
            rotation_changed: false,
            last_target: None,
            throttle: FpsThrottle::default(),
            timing: FrameTiming::default(),
        }
    }

    pub fn profile(&self) -> &CapabilityProfile {
        &self.profile
    }

    /// Start a stream. Closes any previous one first.
    ///
    /// # Errors
    /// Invalid configuration, unsupported source size, allocation or thread
    /// creation failures. The context is left closed.
    pub fn open(&mut self, config: &RotateConfig) -> RotateResult<()> {
        self.close();
        config.validate().map_err(|e| e.with_operation("open"))?;
        self.config = config.clone();
        self.degree = config.normalized_degree();
        self.rotation_changed = false;
        self.last_target = None;

        if !config.enable {
            info!(width = config.width, height = config.height, "rotation disabled, frames pass through");
            self.mode = Mode::Bypass;
            return Ok(());
        }

        match Engine::start(&self.profile, config) {
            Ok(engine) => {
                info!(
                    profile = self.profile.name,
                    source = %engine.source,
                    target = %engine.plan.target,
                    degree = self.degree.degrees(),
                    workers = engine.pool.len(),
                    kernel = ?engine.plan.kernel(),
                    "rotation context opened"
                );
                self.mode = Mode::Rotating(Box::new(engine));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, width = config.width, height = config.height, "open failed, rotation disabled");
                Err(e.with_operation("open"))
            }
        }
    }

    /// Stop the workers and release tables and buffers. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Mode::Rotating(engine) = std::mem::replace(&mut self.mode, Mode::Closed) {
            let Engine { mut buffers, pool, .. } = *engine;
            drop(pool);
            buffers.release();
            info!(frames = self.timing.frames, skipped = self.timing.skipped, "rotation context closed");
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.mode, Mode::Closed)
    }

    /// Select the rotation for subsequent frames. Values other than 90, 180 and
    /// 270 mean 0°. Tables for an angle are built once and kept.
    pub fn set_degree(&mut self, degree: u32) -> RotateResult<()> {
        let degree = Degree::from_degrees(degree);
        if let Mode::Rotating(engine) = &mut self.mode {
            engine.set_degree(&self.profile, degree).map_err(|e| e.with_operation("set_degree"))?;
        }
        self.degree = degree;
        self.config.degree = degree.degrees();
        Ok(())
    }

    pub fn degree(&self) -> Degree {
        self.degree
    }

    /// Rotate one frame.
    ///
    /// Returns [`ApplyOutcome::Skipped`] when the frame-rate throttle drops the
    /// frame; nothing is written in that case. The returned descriptor borrows
    /// the context's display planes.
    pub fn apply<'a>(&'a mut self, frame: &FrameDescriptor<'a>, degree: Degree) -> RotateResult<ApplyOutcome<'a>> {
        match self.mode {
            Mode::Closed => return Err(RotateError::state("closed", "apply", "context is not open")),
            Mode::Bypass => return Ok(ApplyOutcome::Done(frame.clone())),
            Mode::Rotating(_) => {}
        }
        if frame.format != ColorFormat::Yuv420SemiPlanar {
            return Err(RotateError::validation("format", "semi-planar 4:2:0 input", format!("{:?}", frame.format)));
        }
        if !self.throttle.admit() {
            self.timing.record_skip();
            trace!(skipped = self.timing.skipped, "frame dropped by throttle");
            return Ok(ApplyOutcome::Skipped);
        }

        let started = Instant::now();
        self.follow_source(frame)?;
        if degree != self.degree {
            self.set_degree(degree.degrees())?;
            self.rotation_changed = true;
        }

        let Mode::Rotating(engine) = &mut self.mode else {
            return Err(RotateError::state("reopened", "apply", "rotation engine missing"));
        };
        engine.render(frame).map_err(|e| e.with_operation("apply"))?;
        let target = engine.plan.target;
        self.timing.record(started.elapsed());
        trace!(us = self.timing.last_us, target = %target, "frame rotated");

        let flags = FrameFlags {
            key_frame: frame.flags.key_frame,
            resolution_changed: self.last_target != Some(target),
            rotation_changed: self.rotation_changed,
        };
        self.last_target = Some(target);
        match &self.mode {
            Mode::Rotating(engine) => Ok(ApplyOutcome::Done(engine.output(flags)?)),
            other => Err(RotateError::state(other.name(), "apply", "rotation engine missing")),
        }
    }

    /// Re-open when the decoder changed the source size or line size mid-stream.
    fn follow_source(&mut self, frame: &FrameDescriptor<'_>) -> RotateResult<()> {
        let Mode::Rotating(engine) = &self.mode else {
            return Ok(());
        };
        let line_size = frame.line_size() as u32;
        if engine.source == Size::new(frame.width, frame.height) && engine.stride == line_size {
            return Ok(());
        }
        info!(
            from = %engine.source,
            to = %Size::new(frame.width, frame.height),
            line_size,
            "source geometry changed, reinitializing"
        );
        let config = RotateConfig {
            width: frame.width,
            height: frame.height,
            line_size,
            degree: self.degree.degrees(),
            ..self.config.clone()
        };
        self.open(&config)
    }

    /// Output width, the source width when passing through, 0 when closed.
    pub fn scaled_width(&self) -> i32 {
        self.scaled_size().w as i32
    }

    pub fn scaled_height(&self) -> i32 {
        self.scaled_size().h as i32
    }

    fn scaled_size(&self) -> Size {
        match &self.mode {
            Mode::Closed => Size::default(),
            Mode::Bypass => self.config.source_size(),
            Mode::Rotating(engine) => engine.plan.target,
        }
    }

    /// Acknowledge (`false`) or force (`true`) the rotation-changed flag reported
    /// on output frames.
    pub fn update_rotate_angle_changed_state(&mut self, changed: bool) {
        self.rotation_changed = changed;
    }

    pub fn rotate_angle_changed(&self) -> bool {
        self.rotation_changed
    }

    pub fn is_interlaced_scan_type(&self) -> bool {
        self.is_open() && self.config.interlaced
    }

    /// Whether a stream of this size can be played. Also arms the frame-rate
    /// throttle when `fps` exceeds the profile's cap.
    pub fn can_support(&mut self, fps: u32, height: u32, width: u32) -> bool {
        let max = self.profile.max_source;
        if height > max.h || width > max.w {
            debug!(width, height, max = %max, "source exceeds supported size");
            return false;
        }
        self.throttle.configure(fps, self.profile.max_fps);
        true
    }

    /// Kernel used for the next frame, if rotating.
    pub fn kernel(&self) -> Option<Kernel> {
        match &self.mode {
            Mode::Rotating(engine) => Some(engine.plan.kernel()),
            _ => None,
        }
    }

    /// Worker threads running for the open stream.
    pub fn workers(&self) -> usize {
        match &self.mode {
            Mode::Rotating(engine) => engine.pool.len(),
            _ => 0,
        }
    }

    pub fn timing(&self) -> &FrameTiming {
        &self.timing
    }

    pub fn reset_timing(&mut self) {
        self.timing.reset();
    }
}

impl Drop for RotationContext {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Nv12Frame;

    #[test]
    fn test_apply_requires_open() {
        let mut ctx = RotationContext::new();
        let frame = Nv12Frame::gradient(64, 32, 64, 1);
        let err = ctx.apply(&frame.descriptor(), Degree::D0).unwrap_err();
        assert_eq!(err.category(), "state");
    }

    #[test]
    fn test_bypass_passes_frame_through() {
        let mut ctx = RotationContext::new();
        ctx.open(&RotateConfig::new(90, 64, 32).with_enable(false)).unwrap();
        assert_eq!(ctx.scaled_width(), 64);
        let frame = Nv12Frame::gradient(64, 32, 64, 1);
        let input = frame.descriptor();
        let out = ctx.apply(&input, Degree::D90).unwrap().frame().unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_failed_open_leaves_context_closed() {
        let mut ctx = RotationContext::new();
        assert!(ctx.open(&RotateConfig::new(0, 2000, 1080)).is_err());
        assert!(!ctx.is_open());
        assert_eq!(ctx.scaled_width(), 0);
        assert!(ctx.open(&RotateConfig::new(0, 64, 32).with_line_size(63)).is_err());
        assert!(!ctx.is_open());
    }

    #[test]
    fn test_degree_change_sets_rotation_flag() {
        let mut ctx = RotationContext::new();
        ctx.open(&RotateConfig::new(0, 64, 32)).unwrap();
        let frame = Nv12Frame::gradient(64, 32, 64, 3);
        let input = frame.descriptor();
        let out = ctx.apply(&input, Degree::D0).unwrap().frame().unwrap();
        assert!(out.flags.resolution_changed);
        assert!(!out.flags.rotation_changed);

        let out = ctx.apply(&input, Degree::D270).unwrap().frame().unwrap();
        assert!(out.flags.rotation_changed);
        assert!(out.flags.resolution_changed);
        assert_eq!((out.width, out.height), (32, 64));

        ctx.update_rotate_angle_changed_state(false);
        let out = ctx.apply(&input, Degree::D270).unwrap().frame().unwrap();
        assert!(!out.flags.rotation_changed);
        assert!(!out.flags.resolution_changed);
    }

    #[test]
    fn test_source_change_reinitializes() {
        let mut ctx = RotationContext::new();
        ctx.open(&RotateConfig::new(180, 64, 32)).unwrap();
        let bigger = Nv12Frame::gradient(128, 64, 128, 5);
        let out = ctx.apply(&bigger.descriptor(), Degree::D180).unwrap().frame().unwrap();
        assert_eq!((out.width, out.height), (128, 64));
        assert_eq!(ctx.scaled_width(), 128);
    }

    #[test]
    fn test_short_planes_are_rejected() {
        let mut ctx = RotationContext::new();
        ctx.open(&RotateConfig::new(90, 64, 32)).unwrap();
        let frame = Nv12Frame::gradient(64, 32, 64, 1);
        let truncated = FrameDescriptor::nv12(&frame.luma[..100], &frame.chroma, 64, 64, 32);
        let err = ctx.apply(&truncated, Degree::D90).unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_can_support_limits_and_throttle() {
        let mut ctx = RotationContext::new();
        assert!(!ctx.can_support(30, 1089, 1920));
        assert!(!ctx.can_support(30, 1080, 1921));
        assert!(ctx.can_support(30, 1088, 1920));
        assert!(ctx.can_support(90, 1080, 1920));

        ctx.open(&RotateConfig::new(0, 64, 32)).unwrap();
        let frame = Nv12Frame::gradient(64, 32, 64, 1);
        let input = frame.descriptor();
        let done = (0..9).filter(|_| ctx.apply(&input, Degree::D0).unwrap().is_done()).count();
        assert_eq!(done, 6);
        assert_eq!(ctx.timing().skipped, 3);
    }
}
