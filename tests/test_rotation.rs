//! End-to-end kernel checks: every profile, angle and source layout is pushed
//! through a real context (worker pool, tables, display buffers) and compared
//! byte for byte with the per-pixel reference.

mod common;

use common::{ALL_DEGREES, first_difference, reference, rotate, rotate_with};
use frame_rotate::pattern::Nv12Frame;
use frame_rotate::{CapabilityProfile, Degree, Kernel, RotationContext, Size};
use rotate_geometry::presets::{BufferMemory, TableSharing, Traversal};

fn assert_matches_reference(profile: CapabilityProfile, frame: &Nv12Frame, degree: Degree, interlaced: bool) -> Kernel {
    let (luma, chroma) = reference(&profile, frame, degree, interlaced);
    let name = profile.name;
    let out = rotate(profile, frame, degree, interlaced);
    assert_eq!(
        first_difference(&out.luma, &luma),
        None,
        "{name} {}x{} {degree:?} interlaced={interlaced} kernel={:?}: plane 0",
        frame.width,
        frame.height,
        out.kernel
    );
    assert_eq!(
        first_difference(&out.chroma, &chroma),
        None,
        "{name} {}x{} {degree:?} interlaced={interlaced} kernel={:?}: chroma",
        frame.width,
        frame.height,
        out.kernel
    );
    out.kernel
}

#[test]
fn test_generic_matches_reference() {
    let frame = Nv12Frame::gradient(800, 450, 832, 1);
    let kernels: Vec<Kernel> = ALL_DEGREES
        .iter()
        .map(|&d| assert_matches_reference(CapabilityProfile::generic(), &frame, d, false))
        .collect();
    assert_eq!(kernels, [Kernel::Copy, Kernel::QuarterTurnRows, Kernel::HalfTurn, Kernel::QuarterTurnRows]);
}

#[test]
fn test_generic_odd_source_matches_reference() {
    let frame = Nv12Frame::gradient(801, 451, 802, 2);
    for degree in ALL_DEGREES {
        assert_matches_reference(CapabilityProfile::generic(), &frame, degree, false);
    }
}

#[test]
fn test_column_traversal_matches_reference() {
    let profile = CapabilityProfile { traversal: Traversal::ColumnMajor, ..CapabilityProfile::generic() };
    let frame = Nv12Frame::gradient(800, 450, 800, 3);
    for degree in [Degree::D90, Degree::D270] {
        let kernel = assert_matches_reference(profile.clone(), &frame, degree, false);
        assert_eq!(kernel, Kernel::QuarterTurnColumns);
    }
}

#[test]
fn test_interlaced_linear_matches_reference() {
    // Full-size source: only the half turn blends fields.
    let frame = Nv12Frame::gradient(800, 450, 800, 4);
    for degree in ALL_DEGREES {
        assert_matches_reference(CapabilityProfile::generic(), &frame, degree, true);
    }

    // Low-resolution source: quarter turns blend too.
    let frame = Nv12Frame::gradient(320, 180, 320, 5);
    for degree in [Degree::D90, Degree::D270] {
        let kernel = assert_matches_reference(CapabilityProfile::generic(), &frame, degree, true);
        assert_eq!(kernel, Kernel::QuarterTurnBlend);
    }
    assert_matches_reference(CapabilityProfile::generic(), &frame, Degree::D180, true);
}

#[test]
fn test_interlaced_half_turn_differs_from_progressive() {
    let frame = Nv12Frame::gradient(320, 180, 320, 6);
    let progressive = rotate(CapabilityProfile::generic(), &frame, Degree::D180, false);
    let interlaced = rotate(CapabilityProfile::generic(), &frame, Degree::D180, true);
    assert_ne!(progressive.luma, interlaced.luma);
    // Both lines of a field pair carry the same blended value.
    let w = 320;
    assert_eq!(interlaced.luma[..w], interlaced.luma[w..2 * w]);
}

#[test]
fn test_tiled_matches_reference() {
    let frame = Nv12Frame::gradient(800, 450, 800, 7);
    let kernels: Vec<Kernel> = ALL_DEGREES
        .iter()
        .map(|&d| assert_matches_reference(CapabilityProfile::tiled(), &frame, d, false))
        .collect();
    assert_eq!(kernels, [Kernel::Detile, Kernel::TiledQuarterTurn, Kernel::TiledHalfTurn, Kernel::TiledQuarterTurn]);

    // Tiled sources never blend, interlaced or not.
    assert_matches_reference(CapabilityProfile::tiled(), &frame, Degree::D180, true);
}

#[test]
fn test_tiled_low_resolution_matches_reference() {
    let frame = Nv12Frame::gradient(320, 180, 320, 8);
    for degree in ALL_DEGREES {
        assert_matches_reference(CapabilityProfile::tiled(), &frame, degree, true);
    }
}

#[test]
fn test_packed_panel_matches_reference() {
    let frame = Nv12Frame::gradient(1920, 1080, 1920, 9);
    for degree in ALL_DEGREES {
        let kernel = assert_matches_reference(CapabilityProfile::packed_panel(), &frame, degree, false);
        assert_eq!(kernel, Kernel::PackedTiled);
    }
}

#[test]
fn test_packed_linear_matches_reference() {
    let profile = CapabilityProfile { tiled_codecs: Vec::new(), ..CapabilityProfile::packed_panel() };
    let frame = Nv12Frame::gradient(1920, 1080, 1920, 10);
    for degree in [Degree::D0, Degree::D90, Degree::D180] {
        let kernel = assert_matches_reference(profile.clone(), &frame, degree, true);
        assert_eq!(kernel, Kernel::PackedLinear);
    }
}

#[test]
fn test_packed_panel_other_sizes_use_planar_paths() {
    // Outside the optimized resolution the profile keeps planar output, with the
    // skip factor on half turns and the trimmed swap on low-res quarter turns.
    let frame = Nv12Frame::gradient(800, 450, 800, 11);
    let kernel = assert_matches_reference(CapabilityProfile::packed_panel(), &frame, Degree::D180, false);
    assert_eq!(kernel, Kernel::TiledHalfTurn);
    let out = rotate(CapabilityProfile::packed_panel(), &frame, Degree::D180, false);
    assert_eq!(out.size, Size::new(532, 300));

    let frame = Nv12Frame::gradient(320, 180, 320, 12);
    for degree in [Degree::D90, Degree::D270] {
        assert_matches_reference(CapabilityProfile::packed_panel(), &frame, degree, false);
    }
    let out = rotate(CapabilityProfile::packed_panel(), &frame, Degree::D90, false);
    assert_eq!(out.size, Size::new(172, 320));
}

#[test]
fn test_full_hd_scenarios() {
    let frame = Nv12Frame::gradient(1920, 1080, 1920, 13);
    let out = rotate(CapabilityProfile::generic(), &frame, Degree::D90, false);
    assert_eq!(out.size, Size::new(606, 1080));
    assert_eq!(out.luma.len(), 606 * 1080);
    assert_eq!(out.chroma.len(), 606 * 540);

    let out = rotate(CapabilityProfile::packed_panel(), &frame, Degree::D270, false);
    assert_eq!(out.size, Size::new(404, 720));
    assert_eq!(out.luma.len(), 404 * 2 * 720);
    assert!(out.chroma.is_empty());

    let frame = Nv12Frame::gradient(1280, 720, 1280, 14);
    let out = rotate(CapabilityProfile::generic(), &frame, Degree::D90, false);
    assert_eq!(out.size, Size::new(404, 720));
}

#[test]
fn test_half_turn_is_an_involution() {
    for profile in [CapabilityProfile::generic(), CapabilityProfile::tiled()] {
        let frame = Nv12Frame::gradient(640, 360, 640, 15);
        let once = rotate(profile.clone(), &frame, Degree::D180, false);
        let twice = rotate(profile.clone(), &once.to_frame(), Degree::D180, false);
        assert_eq!(twice.luma, frame.luma, "{}", profile.name);
        assert_eq!(twice.chroma, frame.chroma, "{}", profile.name);
    }
}

#[test]
fn test_quarter_turns_round_trip_at_low_resolution() {
    for profile in [CapabilityProfile::generic(), CapabilityProfile::tiled()] {
        let frame = Nv12Frame::gradient(320, 180, 320, 16);
        let there = rotate(profile.clone(), &frame, Degree::D90, false);
        assert_eq!(there.size, Size::new(180, 320));
        let back = rotate(profile.clone(), &there.to_frame(), Degree::D270, false);
        assert_eq!(back.size, Size::new(320, 180));
        assert_eq!(back.luma, frame.luma, "{}", profile.name);
        assert_eq!(back.chroma, frame.chroma, "{}", profile.name);
    }
}

#[test]
fn test_staging_matches_direct_output() {
    let direct = CapabilityProfile { staging: false, display_memory: BufferMemory::System, ..CapabilityProfile::tiled() };
    let staged = CapabilityProfile { staging: true, display_memory: BufferMemory::Mapped, ..CapabilityProfile::tiled() };
    let frame = Nv12Frame::gradient(800, 450, 800, 17);
    for degree in ALL_DEGREES {
        let a = rotate_with(&mut RotationContext::with_profile(direct.clone()), &frame, degree, false, 3);
        let b = rotate_with(&mut RotationContext::with_profile(staged.clone()), &frame, degree, false, 3);
        assert_eq!(a, b, "{degree:?}");
    }
}

#[test]
fn test_private_table_copies_match_shared_tables() {
    let private = CapabilityProfile { table_sharing: TableSharing::PerWorkerCopy, ..CapabilityProfile::generic() };
    let shared = CapabilityProfile { table_sharing: TableSharing::Shared, ..CapabilityProfile::generic() };
    let frame = Nv12Frame::gradient(800, 450, 800, 18);
    for degree in [Degree::D90, Degree::D270] {
        let a = rotate_with(&mut RotationContext::with_profile(private.clone()), &frame, degree, false, 2);
        let b = rotate_with(&mut RotationContext::with_profile(shared.clone()), &frame, degree, false, 2);
        assert_eq!(a, b, "{degree:?}");
    }

    let frame = Nv12Frame::gradient(320, 180, 320, 19);
    let a = rotate(CapabilityProfile::tiled(), &frame, Degree::D90, false);
    let b = rotate(
        CapabilityProfile { table_sharing: TableSharing::Shared, ..CapabilityProfile::tiled() },
        &frame,
        Degree::D90,
        false,
    );
    assert_eq!(a, b);
}

#[test]
fn test_worker_count_does_not_change_output() {
    let frame = Nv12Frame::gradient(320, 180, 320, 20);
    let single = CapabilityProfile { threads_sd: 1, ..CapabilityProfile::generic() };
    let many = CapabilityProfile { threads_sd: 7, ..CapabilityProfile::generic() };
    for degree in ALL_DEGREES {
        assert_eq!(rotate(single.clone(), &frame, degree, true), rotate(many.clone(), &frame, degree, true));
    }
}
