//! Rotation throughput benchmark.
//!
//! Pushes a synthetic 1080p stream through every angle of the selected profile
//! and reports per-frame cost. `--json` emits the report for scripting.

use anyhow::Result;
use clap::Parser;
use frame_rotate::pattern::Nv12Frame;
use frame_rotate::{Degree, ProfilePreset, RotateConfig, RotationContext};
use rotate_geometry::presets::codec;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "benchmark")]
#[command(about = "Measure rotation cost per angle")]
struct Args {
    /// Source width
    #[arg(short = 'W', long, default_value_t = 1920)]
    width: u32,

    /// Source height
    #[arg(short = 'H', long, default_value_t = 1080)]
    height: u32,

    /// Frames per angle
    #[arg(short = 'n', long, default_value_t = 120)]
    frames: u32,

    /// Platform capability profile
    #[arg(short, long, value_enum, default_value = "generic")]
    profile: ProfilePreset,

    /// Interlaced source
    #[arg(long)]
    interlaced: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let args = Args::parse();

    let frame = Nv12Frame::gradient(args.width, args.height, args.width.next_multiple_of(2), 3);
    let profile = args.profile.to_profile();
    let tiled = match profile.tile {
        Some(tile) => Some(frame.to_tiled(tile)?),
        None => None,
    };
    let input = match &tiled {
        Some(t) => t.descriptor(),
        None => frame.descriptor(),
    };

    let mut ctx = RotationContext::with_profile(profile);
    let mut rows = Vec::new();
    for degree in [Degree::D0, Degree::D90, Degree::D180, Degree::D270] {
        let config = RotateConfig::new(degree.degrees(), args.width, args.height)
            .with_codec(codec::H264)
            .with_interlaced(args.interlaced)
            .with_line_size(input.line_size() as u32);
        ctx.open(&config)?;
        ctx.reset_timing();
        for _ in 0..args.frames {
            ctx.apply(&input, degree)?;
        }
        let timing = *ctx.timing();
        rows.push(json!({
            "degree": degree.degrees(),
            "target": [ctx.scaled_width(), ctx.scaled_height()],
            "kernel": format!("{:?}", ctx.kernel()),
            "workers": ctx.workers(),
            "frames": timing.frames,
            "avg_us": timing.average_us(),
            "min_us": timing.min_us,
            "max_us": timing.max_us,
            "fps": timing.sustainable_fps(),
        }));
        ctx.close();
    }

    if args.json {
        let report = json!({
            "profile": ctx.profile().name,
            "source": [args.width, args.height],
            "interlaced": args.interlaced,
            "results": rows,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Rotation Benchmark");
    println!("══════════════════");
    println!(
        "{}x{} {}, profile {}, {} frames per angle",
        args.width,
        args.height,
        if args.interlaced { "interlaced" } else { "progressive" },
        ctx.profile().name,
        args.frames
    );
    println!();
    for row in &rows {
        println!(
            "{:>3}°  {:>10}  {:<22} {} workers  avg {:>8.1} us  min {:>6} us  max {:>6} us  ({:.0} fps)",
            row["degree"],
            format!("{}x{}", row["target"][0], row["target"][1]),
            row["kernel"].as_str().unwrap_or_default(),
            row["workers"],
            row["avg_us"].as_f64().unwrap_or_default(),
            row["min_us"],
            row["max_us"],
            row["fps"].as_f64().unwrap_or_default(),
        );
    }
    Ok(())
}
