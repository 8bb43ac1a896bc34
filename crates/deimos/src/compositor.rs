use deimos_common::rgb;
use std::collections::HashMap;

use crate::damage::{DirtyTracker, Rectangle};
use crate::surface::FrameSurface;
use crate::wm::{WindowId, MAX_WINDOWS};

pub const PLACEHOLDER_WIDTH: usize = 48;
pub const PLACEHOLDER_HEIGHT: usize = 32;

const STRIP_FOCUSED: (i32, i32, i32) = (245, 245, 250);
const STRIP_UNFOCUSED: (i32, i32, i32) = (28, 32, 40);

/// Borrowed window content, row-major `0x00RRGGBB`.
#[derive(Clone, Copy, Debug)]
pub struct ContentView<'a> {
    pixels: &'a [u32],
    width: usize,
    height: usize,
}

impl<'a> ContentView<'a> {
    pub fn new(pixels: &'a [u32], width: usize, height: usize) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() < width.checked_mul(height)? {
            return None;
        }
        Some(Self { pixels, width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn row(&self, y: usize) -> &'a [u32] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }
}

/// Procedural stand-in texture for windows without an application buffer.
pub struct Placeholder {
    pixels: Vec<u32>,
}

impl Placeholder {
    pub fn generate(id: WindowId) -> Self {
        let id = id as i32;
        let base_r = 40 + (id * 53) % 120;
        let base_g = 60 + (id * 31) % 120;
        let base_b = 80 + (id * 19) % 120;

        let mut pixels = vec![0u32; PLACEHOLDER_WIDTH * PLACEHOLDER_HEIGHT];
        for y in 0..PLACEHOLDER_HEIGHT as i32 {
            for x in 0..PLACEHOLDER_WIDTH as i32 {
                let checker = if ((x / 4 + y / 4) & 1) != 0 { 10 } else { -6 };
                let glow = x * 18 / PLACEHOLDER_WIDTH as i32;
                let shade = y * 20 / PLACEHOLDER_HEIGHT as i32;
                pixels[y as usize * PLACEHOLDER_WIDTH + x as usize] = rgb(
                    base_r + glow + checker,
                    base_g + shade / 2 + checker,
                    base_b + shade - checker,
                );
            }
        }

        let accent = rgb(230, 230, 240);
        let ax = 4 + (id as usize * 7) % 20;
        let ay = 4 + (id as usize * 5) % 12;
        for y in ay..(ay + 8).min(PLACEHOLDER_HEIGHT) {
            for x in ax..(ax + 14).min(PLACEHOLDER_WIDTH) {
                pixels[y * PLACEHOLDER_WIDTH + x] = accent;
            }
        }

        Self { pixels }
    }

    pub fn view(&self) -> ContentView<'_> {
        ContentView {
            pixels: &self.pixels,
            width: PLACEHOLDER_WIDTH,
            height: PLACEHOLDER_HEIGHT,
        }
    }
}

/// Height of the decorative band atop placeholder content.
pub fn title_strip_height(inner_height: i32) -> i32 {
    if inner_height > 14 {
        12
    } else {
        (inner_height / 2).max(0)
    }
}

/// Region repainted when only a window's focus state changes: its border
/// edges and, for placeholder content, the title strip.
pub fn focus_visual_rects(rect: Rectangle, has_content: bool) -> Vec<Rectangle> {
    if rect.is_empty() {
        return Vec::new();
    }
    let mut rects = rect.edges().to_vec();
    let inner = rect.inset(1);
    if !has_content && !inner.is_empty() {
        let strip = title_strip_height(inner.height);
        if strip > 0 {
            rects.push(Rectangle::new(inner.x, inner.y, inner.width, strip));
        }
    }
    rects
}

/// Source row for destination row `dst_offset` of a `dst_height`-tall target.
#[inline]
pub fn source_row(dst_offset: usize, src_height: usize, dst_height: usize) -> usize {
    (dst_offset * src_height / dst_height).min(src_height - 1)
}

/// Nearest-neighbour source columns for a run of destination pixels,
/// stepped with an error accumulator instead of a division per pixel.
#[derive(Clone, Debug)]
pub struct ColumnStepper {
    sx: usize,
    err: usize,
    src_width: usize,
    dst_width: usize,
    remaining: usize,
}

impl ColumnStepper {
    /// Starts at destination column `dst_offset` and yields `count` columns.
    pub fn new(src_width: usize, dst_width: usize, dst_offset: usize, count: usize) -> Self {
        let remaining = if src_width == 0 || dst_width == 0 { 0 } else { count };
        let scaled = dst_offset * src_width;
        Self {
            sx: if dst_width == 0 { 0 } else { scaled / dst_width },
            err: if dst_width == 0 { 0 } else { scaled % dst_width },
            src_width,
            dst_width,
            remaining,
        }
    }
}

impl Iterator for ColumnStepper {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let column = self.sx.min(self.src_width - 1);
        self.err += self.src_width;
        if self.err >= self.dst_width {
            self.sx += self.err / self.dst_width;
            self.err %= self.dst_width;
        }
        Some(column)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for ColumnStepper {}

/// Scales `source` onto `dst`, writing only the part inside `clip`, `dst`
/// and the surface.
pub fn blit_scaled(surface: &mut FrameSurface, source: ContentView<'_>, dst: Rectangle, clip: Rectangle) {
    let Some(clip) = clip
        .intersect(&dst)
        .and_then(|c| c.intersect(&surface.bounds()))
    else {
        return;
    };
    let dst_w = dst.width as usize;
    let dst_h = dst.height as usize;
    let dx0 = (clip.x - dst.x) as usize;
    let run = clip.width;

    if source.width == dst_w && source.height == dst_h {
        for y in clip.y..clip.bottom() {
            let src = &source.row((y - dst.y) as usize)[dx0..dx0 + run as usize];
            if let Some(row) = surface.span_mut(clip.x, y, run) {
                row.copy_from_slice(src);
            }
        }
        return;
    }

    for y in clip.y..clip.bottom() {
        let src = source.row(source_row((y - dst.y) as usize, source.height, dst_h));
        let Some(row) = surface.span_mut(clip.x, y, run) else {
            continue;
        };
        let columns = ColumnStepper::new(source.width, dst_w, dx0, run as usize);
        for (px, sx) in row.iter_mut().zip(columns) {
            *px = src[sx];
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameColors {
    pub border: u32,
    pub focus: u32,
}

/// One window to paint.
#[derive(Clone, Copy, Debug)]
pub struct WindowFrame<'a> {
    pub id: WindowId,
    pub rect: Rectangle,
    pub focused: bool,
    pub content: Option<ContentView<'a>>,
}

/// Paints window frames into the surface, caching placeholder textures per id.
pub struct WindowCompositor {
    colors: FrameColors,
    placeholders: HashMap<WindowId, Placeholder>,
}

impl WindowCompositor {
    pub fn new(colors: FrameColors) -> Self {
        Self {
            colors,
            placeholders: HashMap::new(),
        }
    }

    pub fn colors(&self) -> FrameColors {
        self.colors
    }

    pub fn border_color(&self, focused: bool) -> u32 {
        if focused {
            self.colors.focus
        } else {
            self.colors.border
        }
    }

    pub fn cached_placeholders(&self) -> usize {
        self.placeholders.len()
    }

    /// Repaints the frame wherever it overlaps the tracker's dirty state.
    pub fn draw_dirty(&mut self, surface: &mut FrameSurface, tracker: &DirtyTracker, frame: &WindowFrame<'_>) {
        if tracker.is_full_dirty() {
            self.draw_full(surface, frame);
            return;
        }
        for dirty in tracker.regions() {
            if let Some(clip) = dirty.intersect(&frame.rect) {
                self.draw_clipped(surface, frame, clip);
            }
        }
    }

    pub fn draw_full(&mut self, surface: &mut FrameSurface, frame: &WindowFrame<'_>) {
        self.draw_clipped(surface, frame, frame.rect);
    }

    /// Paints the part of the frame inside `clip`. Frames of 2 pixels or
    /// less in either dimension, and unknown ids, draw nothing.
    pub fn draw_clipped(&mut self, surface: &mut FrameSurface, frame: &WindowFrame<'_>, clip: Rectangle) {
        let rect = frame.rect;
        if frame.id == 0 || frame.id as usize > MAX_WINDOWS || rect.width <= 2 || rect.height <= 2 {
            return;
        }
        let Some(clip) = clip
            .intersect(&rect)
            .and_then(|c| c.intersect(&surface.bounds()))
        else {
            return;
        };

        let border = self.border_color(frame.focused);
        for edge in rect.edges() {
            if let Some(visible) = edge.intersect(&clip) {
                surface.fill_rect(visible, border);
            }
        }

        let inner = rect.inset(1);
        let Some(content_clip) = clip.intersect(&inner) else {
            return;
        };

        match frame.content {
            Some(content) => blit_scaled(surface, content, inner, content_clip),
            None => {
                let placeholder = self
                    .placeholders
                    .entry(frame.id)
                    .or_insert_with(|| Placeholder::generate(frame.id));
                blit_scaled(surface, placeholder.view(), inner, content_clip);

                let strip_h = title_strip_height(inner.height);
                let strip = Rectangle::new(inner.x, inner.y, inner.width, strip_h);
                if let Some(visible) = strip.intersect(&content_clip) {
                    let (r, g, b) = if frame.focused { STRIP_FOCUSED } else { STRIP_UNFOCUSED };
                    surface.fill_rect(visible, rgb(r, g, b));
                }
            }
        }
    }
}
