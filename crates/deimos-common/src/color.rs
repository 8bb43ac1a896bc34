/// Parses `#RRGGBB`, `#AARRGGBB` or `0xRRGGBB` into a packed `0xAARRGGBB` value.
/// Six-digit forms get an opaque alpha byte.
pub fn parse_color(s: &str) -> Option<u32> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
        .trim_start_matches('#');
    if !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let value = u32::from_str_radix(s, 16).ok()?;
    match s.len() {
        6 => Some(0xFF00_0000 | value),
        8 => Some(value),
        _ => None,
    }
}

/// Packs clamped channels into `0x00RRGGBB`.
pub fn rgb(r: i32, g: i32, b: i32) -> u32 {
    let r = r.clamp(0, 255) as u32;
    let g = g.clamp(0, 255) as u32;
    let b = b.clamp(0, 255) as u32;
    (r << 16) | (g << 8) | b
}

pub fn to_rgb565(xrgb: u32) -> u16 {
    let r = ((xrgb >> 16) & 0xFF) as u16;
    let g = ((xrgb >> 8) & 0xFF) as u16;
    let b = (xrgb & 0xFF) as u16;
    ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)
}

pub fn from_rgb565(px: u16) -> u32 {
    let r = ((px >> 11) & 0x1F) as u32;
    let g = ((px >> 5) & 0x3F) as u32;
    let b = (px & 0x1F) as u32;
    ((r << 3 | r >> 2) << 16) | ((g << 2 | g >> 4) << 8) | (b << 3 | b >> 2)
}
