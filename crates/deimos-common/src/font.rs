//! Minimal 5x7 glyph set covering the status overlay text.

pub const GLYPH_WIDTH: usize = 5;
pub const GLYPH_HEIGHT: usize = 7;
const GLYPH_ADVANCE: usize = GLYPH_WIDTH + 1;

fn glyph(ch: char) -> [u8; GLYPH_HEIGHT] {
    match ch.to_ascii_uppercase() {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        _ => [0; GLYPH_HEIGHT],
    }
}

pub struct Font {
    pub scale: usize,
}

impl Default for Font {
    fn default() -> Self {
        Self { scale: 1 }
    }
}

impl Font {
    pub fn new(scale: usize) -> Self {
        Self { scale: scale.max(1) }
    }

    pub fn char_width(&self) -> usize {
        GLYPH_ADVANCE * self.scale
    }

    pub fn char_height(&self) -> usize {
        GLYPH_HEIGHT * self.scale
    }

    pub fn text_width(&self, text: &str) -> usize {
        text.chars().count() * self.char_width()
    }

    /// Draws into a row-major pixel slice. Pixels past `stride` or the end
    /// of the slice are dropped.
    pub fn draw_char(&self, pixels: &mut [u32], stride: usize, x: usize, y: usize, ch: char, color: u32) {
        let rows = glyph(ch);
        for (cy, bits) in rows.iter().enumerate() {
            for cx in 0..GLYPH_WIDTH {
                if bits & (0x10 >> cx) == 0 {
                    continue;
                }
                for sy in 0..self.scale {
                    for sx in 0..self.scale {
                        let screen_x = x + cx * self.scale + sx;
                        let screen_y = y + cy * self.scale + sy;
                        if screen_x >= stride {
                            continue;
                        }
                        let pixel_idx = screen_y * stride + screen_x;
                        if pixel_idx < pixels.len() {
                            pixels[pixel_idx] = color;
                        }
                    }
                }
            }
        }
    }

    pub fn draw_text(&self, pixels: &mut [u32], stride: usize, x: usize, y: usize, text: &str, color: u32) {
        for (i, ch) in text.chars().enumerate() {
            self.draw_char(pixels, stride, x + i * self.char_width(), y, ch, color);
        }
    }
}
