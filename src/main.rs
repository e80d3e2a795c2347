use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::info;

use volume_lod::{
    DicomDirectoryLoader, RecordingBackend, Viewer, ViewerConfig, enums::SortBy,
    scheduler::ManualClock,
};

/// Replay a drag and a wheel gesture against a headless viewer.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Directory of .dcm slices for the anatomy volume.
    #[arg(long)]
    anatomy: PathBuf,

    /// Directory of .dcm slices for a segmentation mask.
    #[arg(long)]
    mask: Option<PathBuf>,

    /// TOML file overriding the default tuning.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sort slices by instance number instead of image position.
    #[arg(long)]
    instance_number: bool,
}

const FRAME: Duration = Duration::from_millis(16);

fn run_frames(viewer: &mut Viewer<RecordingBackend>, clock: &ManualClock, frames: usize) {
    for _ in 0..frames {
        clock.advance(FRAME);
        viewer.tick();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ViewerConfig::from_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ViewerConfig::default(),
    };
    let sort_by = if args.instance_number {
        SortBy::InstanceNumber
    } else {
        SortBy::ImagePositionPatient
    };
    let loader = DicomDirectoryLoader::new(sort_by);
    let clock = ManualClock::new();

    let anatomy = args.anatomy.to_string_lossy();
    let mut viewer = Viewer::load(
        RecordingBackend::new(),
        config,
        &loader,
        &anatomy,
        None,
        clock.clone(),
    )
    .await
    .context("loading anatomy")?;

    if let Some(mask) = &args.mask {
        // The anatomy stays usable if the mask cannot be read.
        if let Err(err) = viewer.load_mask(&loader, &mask.to_string_lossy()).await {
            log::error!("{err}");
        }
    }

    info!("Drag");
    viewer.start_interaction();
    run_frames(&mut viewer, &clock, 20);
    info!("Level while dragging: {:?}", viewer.lod_level());
    viewer.end_interaction();
    run_frames(&mut viewer, &clock, 40);
    info!("Level after settling: {:?}", viewer.lod_level());

    info!("Wheel");
    viewer.wheel(120.0)?;
    run_frames(&mut viewer, &clock, 120);
    info!(
        "Level after zoom: {:?}, camera zoom {:.3}",
        viewer.lod_level(),
        viewer.backend().camera.zoom
    );

    let stats = viewer.frame_stats();
    info!(
        "{} frames rendered, {} requests coalesced",
        stats.frames_rendered, stats.requests_coalesced
    );
    if let Some(summary) = viewer.mask_summary() {
        info!(
            "Mask: {} voxels, {:.2} cc, {:?} hemisphere, midline shift {:.1} mm",
            summary.voxel_count, summary.volume_cc, summary.hemisphere, summary.midline_shift_mm
        );
    }

    viewer.destroy();
    Ok(())
}
