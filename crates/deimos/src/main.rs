use clap::Parser;
use std::path::PathBuf;

use deimos::backend::{DrmScanout, HostPlatform};
use deimos::{Config, Desktop, FrameSurface, Settings, SplitLayout, SurfaceError};
use deimos_common::{FileLogger, StderrLogger};

#[derive(Parser, Debug)]
#[command(name = "deimos", version, about = "Tiling window manager and compositor")]
struct Cli {
    /// Configuration file to read before the default locations
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// DRM card to drive instead of the configured one
    #[arg(long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Framebuffer depth in bits
    #[arg(long, value_parser = ["16", "24", "32"])]
    depth: Option<String>,

    /// Directory holding the shared window slots
    #[arg(long, value_name = "PATH")]
    slots_dir: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,

    /// Stop after this many presented frames (0 runs until quit)
    #[arg(long, default_value_t = 0)]
    max_frames: u64,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = FileLogger::init() {
        let _ = StderrLogger::init();
        log::warn!("File logging unavailable ({}), logging to stderr", e);
    }

    let mut config = Config::load(cli.config.as_deref());
    if let Some(ref device) = cli.device {
        config.display.device = device.display().to_string();
    }
    if let Some(depth) = cli.depth.as_deref().and_then(|d| d.parse().ok()) {
        config.display.depth = depth;
    }
    if let Some(ref dir) = cli.slots_dir {
        config.slots.dir = Some(dir.clone());
    }

    if cli.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("Failed to serialize config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(&config, cli.max_frames) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config, max_frames: u64) -> Result<(), Box<dyn std::error::Error>> {
    let device = config.display.drm_device_path();
    let scanout = DrmScanout::open(device.as_deref(), config.depth())?;
    let surface = FrameSurface::new(Box::new(scanout))?;
    log::info!(
        "[drm] frame surface {}x{} at depth {}",
        surface.width(),
        surface.height(),
        surface.format().depth()
    );

    let mut platform = HostPlatform::new(
        surface.width() as u32,
        surface.height() as u32,
        config.slots_dir(),
    )
    .map_err(|e| SurfaceError::NoDevice(format!("host platform: {}", e)))?;

    let engine = SplitLayout::new(
        config.gap(),
        config.vertical_bias_percent(),
        config.force_split(),
    );
    let mut desktop = Desktop::new(Settings::from_config(config), surface, Box::new(engine))
        .with_max_frames(max_frames);

    log::info!("Deimos running. Press '{}' to quit.", config.quit_key() as char);
    desktop.run(&mut platform);
    Ok(())
}
