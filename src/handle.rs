//! Handle-style entry points.
//!
//! These mirror the flat interface media frameworks call into: a context is an
//! optional handle, every call accepts `None`, and failures come back as
//! sentinel values (`false`, `-1`) instead of errors. Errors are logged.

use rotate_geometry::Degree;
use rotate_geometry::presets::CapabilityProfile;
use tracing::{error, warn};

use crate::config::RotateConfig;
use crate::context::RotationContext;
use crate::error::{RotateError, classify};
use crate::frame::{ApplyOutcome, FrameDescriptor};

/// Errors that will repeat on retry are logged at error level.
fn report(operation: &str, e: &RotateError) {
    if classify::is_fatal(e) {
        error!(operation, error = %e, category = e.category(), "call failed");
    } else {
        warn!(operation, error = %e, category = e.category(), "call failed");
    }
}

/// Owned context handle. `None` plays the role of a null handle.
pub type ContextHandle = Option<Box<RotationContext>>;

pub fn create() -> ContextHandle {
    Some(Box::new(RotationContext::new()))
}

pub fn create_with_profile(profile: CapabilityProfile) -> ContextHandle {
    Some(Box::new(RotationContext::with_profile(profile)))
}

#[allow(clippy::too_many_arguments)]
pub fn open(
    ctx: Option<&mut RotationContext>,
    enable: bool,
    degree: u32,
    width: u32,
    height: u32,
    codec: i32,
    interlaced: bool,
    line_size: u32,
) -> bool {
    let Some(ctx) = ctx else { return false };
    let config = RotateConfig { enable, degree, width, height, codec, interlaced, line_size };
    match ctx.open(&config) {
        Ok(()) => true,
        Err(e) => {
            report("open", &e);
            false
        }
    }
}

pub fn close(ctx: Option<&mut RotationContext>) {
    if let Some(ctx) = ctx {
        ctx.close();
    }
}

/// Close and free the context.
pub fn destroy(ctx: ContextHandle) {
    drop(ctx);
}

pub fn set_degree(ctx: Option<&mut RotationContext>, degree: u32) {
    if let Some(ctx) = ctx {
        if let Err(e) = ctx.set_degree(degree) {
            report("set_degree", &e);
        }
    }
}

/// Rotate `frame` in place: on success the descriptor is replaced by the output
/// frame. Returns `true` with `frame_done == false` when the frame was skipped.
pub fn apply<'a>(
    ctx: Option<&'a mut RotationContext>,
    frame: &mut FrameDescriptor<'a>,
    degree: u32,
    frame_done: &mut bool,
) -> bool {
    *frame_done = false;
    let Some(ctx) = ctx else { return false };
    let input = frame.clone();
    match ctx.apply(&input, Degree::from_degrees(degree)) {
        Ok(ApplyOutcome::Done(output)) => {
            *frame = output;
            *frame_done = true;
            true
        }
        Ok(ApplyOutcome::Skipped) => true,
        Err(e) => {
            report("apply", &e);
            false
        }
    }
}

pub fn get_scaled_width(ctx: Option<&RotationContext>) -> i32 {
    ctx.map_or(-1, RotationContext::scaled_width)
}

pub fn get_scaled_height(ctx: Option<&RotationContext>) -> i32 {
    ctx.map_or(-1, RotationContext::scaled_height)
}

pub fn update_rotate_angle_changed_state(ctx: Option<&mut RotationContext>, changed: bool) {
    if let Some(ctx) = ctx {
        ctx.update_rotate_angle_changed_state(changed);
    }
}

pub fn is_interlaced_scan_type(ctx: Option<&RotationContext>) -> bool {
    ctx.is_some_and(RotationContext::is_interlaced_scan_type)
}

/// Negative arguments are never supported.
pub fn can_support(ctx: Option<&mut RotationContext>, fps: i32, height: i32, width: i32) -> bool {
    let Some(ctx) = ctx else { return false };
    match (u32::try_from(fps), u32::try_from(height), u32::try_from(width)) {
        (Ok(fps), Ok(height), Ok(width)) => ctx.can_support(fps, height, width),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Nv12Frame;

    #[test]
    fn test_null_handles_return_sentinels() {
        let frame_data = Nv12Frame::gradient(64, 32, 64, 0);
        let mut frame = frame_data.descriptor();
        let mut done = true;
        assert!(!open(None, true, 90, 64, 32, 27, false, 64));
        close(None);
        set_degree(None, 90);
        assert!(!apply(None, &mut frame, 90, &mut done));
        assert!(!done);
        assert_eq!(get_scaled_width(None), -1);
        assert_eq!(get_scaled_height(None), -1);
        update_rotate_angle_changed_state(None, true);
        assert!(!is_interlaced_scan_type(None));
        assert!(!can_support(None, 30, 1080, 1920));
        destroy(None);
        // The frame was not touched.
        assert_eq!(frame, frame_data.descriptor());
    }

    #[test]
    fn test_handle_round_trip() {
        let mut handle = create();
        assert!(open(handle.as_deref_mut(), true, 0, 64, 32, 27, true, 0));
        assert!(is_interlaced_scan_type(handle.as_deref()));
        set_degree(handle.as_deref_mut(), 180);
        assert_eq!(get_scaled_width(handle.as_deref()), 64);
        set_degree(handle.as_deref_mut(), 45);
        assert_eq!(handle.as_deref().map(RotationContext::degree), Some(Degree::D0));
        assert!(!can_support(handle.as_deref_mut(), -1, 1080, 1920));

        let source = Nv12Frame::gradient(64, 32, 64, 4);
        let mut frame = source.descriptor();
        let mut done = false;
        assert!(apply(handle.as_deref_mut(), &mut frame, 270, &mut done));
        assert!(done);
        assert_eq!((frame.width, frame.height), (32, 64));
        assert!(frame.flags.rotation_changed);
        destroy(handle);
    }
}
