use deimos_common::color::{from_rgb565, to_rgb565};
use deimos_common::Font;
use thiserror::Error;

use crate::damage::{DirtyTracker, Rectangle};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("no display device available: {0}")]
    NoDevice(String),
    #[error("display reported zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },
    #[error("unsupported pixel depth: {0} bits")]
    UnsupportedDepth(u32),
    #[error("failed to map frame buffer: {0}")]
    Mapping(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb565,
    Rgb888,
    Xrgb8888,
}

impl PixelFormat {
    pub fn from_depth(depth: u32) -> Option<Self> {
        match depth {
            16 => Some(PixelFormat::Rgb565),
            24 => Some(PixelFormat::Rgb888),
            32 => Some(PixelFormat::Xrgb8888),
            _ => None,
        }
    }

    pub fn depth(&self) -> u32 {
        match self {
            PixelFormat::Rgb565 => 16,
            PixelFormat::Rgb888 => 24,
            PixelFormat::Xrgb8888 => 32,
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgb565 => 2,
            PixelFormat::Rgb888 => 3,
            PixelFormat::Xrgb8888 => 4,
        }
    }

    /// Packs one `0x00RRGGBB` pixel into `dst`, which must hold at least
    /// `bytes_per_pixel()` bytes.
    #[inline]
    pub fn write(&self, dst: &mut [u8], color: u32) {
        match self {
            PixelFormat::Rgb565 => dst[..2].copy_from_slice(&to_rgb565(color).to_le_bytes()),
            PixelFormat::Rgb888 => dst[..3].copy_from_slice(&color.to_le_bytes()[..3]),
            PixelFormat::Xrgb8888 => dst[..4].copy_from_slice(&(color & 0x00FF_FFFF).to_le_bytes()),
        }
    }

    #[inline]
    pub fn read(&self, src: &[u8]) -> u32 {
        match self {
            PixelFormat::Rgb565 => from_rgb565(u16::from_le_bytes([src[0], src[1]])),
            PixelFormat::Rgb888 => u32::from_le_bytes([src[0], src[1], src[2], 0]),
            PixelFormat::Xrgb8888 => {
                u32::from_le_bytes([src[0], src[1], src[2], src[3]]) & 0x00FF_FFFF
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanoutInfo {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    /// Bytes per row of the mapped buffer.
    pub pitch: u32,
}

/// A mapped display buffer the frame surface presents into.
pub trait Scanout {
    fn info(&self) -> ScanoutInfo;
    fn pixels_mut(&mut self) -> &mut [u8];
    /// Called after a region was written. Directly scanned-out buffers need
    /// nothing here.
    fn flush(&mut self, _rect: Rectangle) {}
}

/// Heap-backed scanout.
pub struct MemoryScanout {
    info: ScanoutInfo,
    data: Vec<u8>,
    flushes: usize,
}

impl MemoryScanout {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        let bpp = PixelFormat::from_depth(depth).map_or(4, |f| f.bytes_per_pixel());
        let pitch = width * bpp as u32;
        Self {
            info: ScanoutInfo { width, height, depth, pitch },
            data: vec![0; pitch as usize * height as usize],
            flushes: 0,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn read_pixel(&self, x: u32, y: u32) -> Option<u32> {
        let format = PixelFormat::from_depth(self.info.depth)?;
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        let offset = y as usize * self.info.pitch as usize + x as usize * format.bytes_per_pixel();
        Some(format.read(&self.data[offset..]))
    }
}

impl Scanout for MemoryScanout {
    fn info(&self) -> ScanoutInfo {
        self.info
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn flush(&mut self, _rect: Rectangle) {
        self.flushes += 1;
    }
}

/// The compositor's backbuffer plus the device it presents to.
///
/// All drawing goes into an `0x00RRGGBB` backbuffer; `present` packs the
/// touched regions into the scanout's native format.
pub struct FrameSurface {
    width: i32,
    height: i32,
    format: PixelFormat,
    pitch: usize,
    backbuffer: Vec<u32>,
    scanout: Box<dyn Scanout>,
    font: Font,
}

impl FrameSurface {
    pub fn new(mut scanout: Box<dyn Scanout>) -> Result<Self, SurfaceError> {
        let info = scanout.info();
        if info.width == 0 || info.height == 0 {
            return Err(SurfaceError::ZeroSize {
                width: info.width,
                height: info.height,
            });
        }
        let format =
            PixelFormat::from_depth(info.depth).ok_or(SurfaceError::UnsupportedDepth(info.depth))?;

        let row_bytes = info.width as usize * format.bytes_per_pixel();
        let pitch = info.pitch as usize;
        if pitch < row_bytes {
            return Err(SurfaceError::Mapping(format!(
                "pitch {} is shorter than a {}-pixel row",
                pitch, info.width
            )));
        }
        let needed = pitch * (info.height as usize - 1) + row_bytes;
        let mapped = scanout.pixels_mut().len();
        if mapped < needed {
            return Err(SurfaceError::Mapping(format!(
                "mapping holds {} bytes, need {}",
                mapped, needed
            )));
        }

        log::info!(
            "[surface] {}x{} depth {} pitch {}",
            info.width,
            info.height,
            info.depth,
            info.pitch
        );

        Ok(Self {
            width: info.width as i32,
            height: info.height as i32,
            format,
            pitch,
            backbuffer: vec![0; info.width as usize * info.height as usize],
            scanout,
            font: Font::default(),
        })
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn bounds(&self) -> Rectangle {
        Rectangle::new(0, 0, self.width, self.height)
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        self.backbuffer[y as usize * self.width as usize + x as usize] = color;
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u32> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.backbuffer[y as usize * self.width as usize + x as usize])
    }

    pub fn fill_rect(&mut self, rect: Rectangle, color: u32) {
        let Some(clipped) = rect.intersect(&self.bounds()) else {
            return;
        };
        let stride = self.width as usize;
        let x0 = clipped.x as usize;
        let x1 = clipped.right() as usize;
        for y in clipped.y..clipped.bottom() {
            let row = y as usize * stride;
            self.backbuffer[row + x0..row + x1].fill(color);
        }
    }

    pub fn outline_rect(&mut self, rect: Rectangle, color: u32) {
        if rect.is_empty() {
            return;
        }
        for edge in rect.edges() {
            self.fill_rect(edge, color);
        }
    }

    pub fn clear(&mut self, color: u32) {
        self.backbuffer.fill(color);
    }

    /// Horizontal run of `len` pixels starting at (x, y), or `None` if any
    /// part of it falls outside the surface.
    pub fn span_mut(&mut self, x: i32, y: i32, len: i32) -> Option<&mut [u32]> {
        if x < 0 || y < 0 || len < 0 || y >= self.height || x + len > self.width {
            return None;
        }
        let start = y as usize * self.width as usize + x as usize;
        Some(&mut self.backbuffer[start..start + len as usize])
    }

    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: u32) {
        if x < 0 || y < 0 {
            return;
        }
        let stride = self.width as usize;
        self.font
            .draw_text(&mut self.backbuffer, stride, x as usize, y as usize, text, color);
    }

    /// Clears whatever is about to be repainted to the background colour.
    pub fn begin_frame(&mut self, tracker: &DirtyTracker, background: u32) {
        if tracker.is_full_dirty() {
            self.clear(background);
            return;
        }
        for rect in tracker.regions() {
            self.fill_rect(*rect, background);
        }
    }

    /// Pushes the whole backbuffer when fully dirty, otherwise each dirty
    /// rectangle on its own.
    pub fn present(&mut self, tracker: &DirtyTracker) {
        if tracker.is_full_dirty() {
            self.present_rect(self.bounds());
            return;
        }
        for rect in tracker.regions() {
            self.present_rect(*rect);
        }
    }

    pub fn present_rect(&mut self, rect: Rectangle) {
        let Some(clipped) = rect.intersect(&self.bounds()) else {
            return;
        };
        let stride = self.width as usize;
        let bpp = self.format.bytes_per_pixel();
        let format = self.format;
        let pitch = self.pitch;
        let dst = self.scanout.pixels_mut();

        for y in clipped.y..clipped.bottom() {
            let src_row = &self.backbuffer[y as usize * stride..][..stride];
            let dst_row = &mut dst[y as usize * pitch..];
            if format == PixelFormat::Xrgb8888 {
                for x in clipped.x as usize..clipped.right() as usize {
                    dst_row[x * 4..x * 4 + 4].copy_from_slice(&src_row[x].to_le_bytes());
                }
            } else {
                for x in clipped.x as usize..clipped.right() as usize {
                    format.write(&mut dst_row[x * bpp..], src_row[x]);
                }
            }
        }
        self.scanout.flush(clipped);
    }
}
