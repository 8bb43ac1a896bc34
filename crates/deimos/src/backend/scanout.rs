use drm::buffer::{Buffer, DrmFourcc};
use drm::control::dumbbuffer::{DumbBuffer, DumbMapping};
use drm::control::{connector, Device as ControlDevice};
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, BorrowedFd};
use std::path::{Path, PathBuf};

use crate::surface::{PixelFormat, Scanout, ScanoutInfo, SurfaceError};

struct Card(File);

impl AsFd for Card {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl drm::Device for Card {}
impl ControlDevice for Card {}

/// A dumb buffer set as the CRTC's framebuffer and mapped into memory.
pub struct DrmScanout {
    _card: Card,
    mapping: DumbMapping<'static>,
    info: ScanoutInfo,
}

impl DrmScanout {
    /// Opens `device`, or the first usable `/dev/dri/cardN` when `None`.
    pub fn open(device: Option<&Path>, depth: u32) -> Result<Self, SurfaceError> {
        let format = PixelFormat::from_depth(depth).ok_or(SurfaceError::UnsupportedDepth(depth))?;

        let candidates: Vec<PathBuf> = match device {
            Some(path) => vec![path.to_path_buf()],
            None => vec![PathBuf::from("/dev/dri/card0"), PathBuf::from("/dev/dri/card1")],
        };

        let mut last_error = String::from("no device tried");
        for path in candidates {
            let file = match OpenOptions::new().read(true).write(true).open(&path) {
                Ok(file) => file,
                Err(e) => {
                    log::warn!("[drm] cannot open {}: {}", path.display(), e);
                    last_error = format!("{}: {}", path.display(), e);
                    continue;
                }
            };
            log::info!("[drm] opened {}", path.display());
            match setup(Card(file), format) {
                Ok(scanout) => return Ok(scanout),
                Err(e) => {
                    log::warn!("[drm] setup failed on {}: {}", path.display(), e);
                    last_error = format!("{}: {}", path.display(), e);
                }
            }
        }

        log::info!("[drm] make sure you're in the 'video' group or running as root");
        Err(SurfaceError::NoDevice(last_error))
    }
}

fn setup(card: Card, format: PixelFormat) -> Result<DrmScanout, Box<dyn std::error::Error>> {
    let res = card.resource_handles()?;
    let connectors: Vec<_> = res
        .connectors()
        .iter()
        .filter_map(|&conn| card.get_connector(conn, true).ok())
        .collect();

    let connector = connectors
        .iter()
        .find(|c| c.state() == connector::State::Connected)
        .ok_or("No connected display found")?;

    let mode = connector.modes().first().ok_or("No display mode available")?;

    let (width, height) = mode.size();
    log::info!("[drm] using display mode {}x{}", width, height);

    let crtc_handle = res.crtcs().first().copied().ok_or("No CRTC available")?;

    let (fourcc, fb_depth, bpp) = match format {
        PixelFormat::Rgb565 => (DrmFourcc::Rgb565, 16, 16),
        PixelFormat::Rgb888 => (DrmFourcc::Rgb888, 24, 24),
        PixelFormat::Xrgb8888 => (DrmFourcc::Xrgb8888, 24, 32),
    };
    let db = card.create_dumb_buffer((width.into(), height.into()), fourcc, bpp)?;
    let pitch = db.pitch();
    let fb_handle = card.add_framebuffer(&db, fb_depth, bpp)?;
    card.set_crtc(crtc_handle, Some(fb_handle), (0, 0), &[connector.handle()], Some(*mode))?;

    // The mapping borrows the buffer for as long as the scanout lives.
    let db_leaked: &'static mut DumbBuffer = Box::leak(Box::new(db));
    let mapping = card.map_dumb_buffer(db_leaked)?;

    Ok(DrmScanout {
        _card: card,
        mapping,
        info: ScanoutInfo {
            width: width as u32,
            height: height as u32,
            depth: format.depth(),
            pitch,
        },
    })
}

impl Scanout for DrmScanout {
    fn info(&self) -> ScanoutInfo {
        self.info
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.mapping
    }
}
