use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use frame_rotate::pattern::Nv12Frame;
use frame_rotate::{ApplyOutcome, ColorFormat, Degree, FrameDescriptor, ProfilePreset, RotateConfig, RotationContext};
use image::GrayImage;
use rotate_geometry::presets::codec;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Rotate NV12 video frames for portrait-mounted panels.
///
/// Reads a raw NV12 frame (or generates a test pattern), runs it through the
/// rotation engine, and writes the rotated frame as raw bytes and/or a PNG of
/// the luma plane.
#[derive(Parser, Debug)]
#[command(name = "vfrotate")]
#[command(about = "Rotate and scale 4:2:0 video frames")]
struct Args {
    /// Raw NV12 input (tightly packed); a test pattern is used when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Source width in pixels
    #[arg(short = 'W', long, default_value_t = 1920)]
    width: u32,

    /// Source height in pixels
    #[arg(short = 'H', long, default_value_t = 1080)]
    height: u32,

    /// Rotation angle: 0, 90, 180 or 270
    #[arg(short, long, default_value_t = 90)]
    degree: u32,

    /// Platform capability profile
    #[arg(short, long, value_enum, default_value = "generic")]
    profile: ProfilePreset,

    /// Decoder codec id (tiled profiles read tiled surfaces for MPEG-2/H.264/HEVC)
    #[arg(long, default_value_t = codec::H264)]
    codec: i32,

    /// Worker threads (defaults to the profile's count for the source size)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Treat the source as interlaced
    #[arg(long)]
    interlaced: bool,

    /// Number of frames to push through the engine
    #[arg(short = 'n', long, default_value_t = 1)]
    frames: u32,

    /// Source frame rate, used to arm the frame-rate throttle
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Write the last rotated frame as raw bytes
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the luma plane of the last rotated frame as PNG
    #[arg(long)]
    preview: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    if Degree::from_degrees(args.degree).degrees() != args.degree {
        bail!("Invalid degree: {}. Use 0, 90, 180 or 270", args.degree);
    }

    let frame = match &args.input {
        Some(path) => {
            let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            Nv12Frame::from_raw(data, args.width, args.height)?
        }
        None => Nv12Frame::gradient(args.width, args.height, args.width.next_multiple_of(2), 0),
    };

    let mut profile = args.profile.to_profile();
    if let Some(threads) = args.threads {
        profile.threads_hd = threads;
        profile.threads_sd = threads;
    }
    let tiled = match profile.tile {
        Some(tile) if profile.is_tiled_codec(args.codec) => Some(frame.to_tiled(tile)?),
        _ => None,
    };
    let line_size = tiled.as_ref().map_or(frame.stride, |t| t.stride);

    let mut ctx = RotationContext::with_profile(profile);
    if !ctx.can_support(args.fps, args.height, args.width) {
        bail!("{}x{} is not supported by the {} profile", args.width, args.height, ctx.profile().name);
    }
    let config = RotateConfig::new(args.degree, args.width, args.height)
        .with_codec(args.codec)
        .with_interlaced(args.interlaced)
        .with_line_size(line_size);
    ctx.open(&config)?;
    info!(
        target_w = ctx.scaled_width(),
        target_h = ctx.scaled_height(),
        kernel = ?ctx.kernel(),
        workers = ctx.workers(),
        "context open"
    );

    let input = match &tiled {
        Some(t) => t.descriptor(),
        None => frame.descriptor(),
    };
    let degree = Degree::from_degrees(args.degree);

    let mut done = 0;
    for _ in 1..args.frames.max(1) {
        if ctx.apply(&input, degree)?.is_done() {
            done += 1;
        }
    }
    // The last frame is copied out so the context can be queried afterwards.
    let last = match ctx.apply(&input, degree)? {
        ApplyOutcome::Done(out) => {
            done += 1;
            Some(Rendered::copy_of(&out))
        }
        ApplyOutcome::Skipped => None,
    };

    let timing = ctx.timing();
    println!(
        "{} frames rotated, {} skipped, {:.2} ms average",
        done,
        timing.skipped,
        timing.average_us() / 1000.0
    );

    let Some(out) = last else {
        if args.output.is_some() || args.preview.is_some() {
            bail!("the last frame was dropped by the frame-rate throttle, nothing to write");
        }
        return Ok(());
    };
    println!("output: {}x{} {:?}", out.width, out.height, out.format);

    if let Some(path) = &args.output {
        let mut raw = out.luma.clone();
        raw.extend_from_slice(&out.chroma);
        fs::write(path, &raw).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {} bytes to {}", raw.len(), path.display());
    }
    if let Some(path) = &args.preview {
        out.luma_image()?.save(path).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote preview to {}", path.display());
    }
    Ok(())
}

/// Tightly packed copy of an output frame.
struct Rendered {
    width: u32,
    height: u32,
    format: ColorFormat,
    luma: Vec<u8>,
    chroma: Vec<u8>,
}

impl Rendered {
    fn copy_of(frame: &FrameDescriptor<'_>) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            format: frame.format,
            luma: frame.luma_rows(),
            chroma: frame.chroma_rows(),
        }
    }

    /// Grayscale image of the visible luma samples.
    fn luma_image(&self) -> Result<GrayImage> {
        let luma = match self.format {
            ColorFormat::Yuv420SemiPlanar => self.luma.clone(),
            ColorFormat::Yuyv422 => self.luma.iter().step_by(2).copied().collect(),
        };
        GrayImage::from_raw(self.width, self.height, luma).context("luma plane smaller than the frame")
    }
}
