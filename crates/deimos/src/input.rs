use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl Modifiers {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" | "" => Some(Modifiers::empty()),
            "shift" => Some(Modifiers::SHIFT),
            "ctrl" | "control" => Some(Modifiers::CTRL),
            "alt" => Some(Modifiers::ALT),
            "super" | "mod4" | "logo" | "win" | "meta" => Some(Modifiers::SUPER),
            _ => None,
        }
    }

    /// True when every bit in `required` is held.
    pub fn satisfies(&self, required: Modifiers) -> bool {
        self.contains(required)
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Buttons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn mask(&self) -> Buttons {
        match self {
            MouseButton::Left => Buttons::LEFT,
            MouseButton::Right => Buttons::RIGHT,
            MouseButton::Middle => Buttons::MIDDLE,
        }
    }
}

/// One polled input event. Pointer coordinates are absolute screen pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InputEvent {
    Key {
        /// Translated character, 0 when the key has none.
        key: u8,
        /// Raw PS/2 set-1 make code.
        scancode: u8,
        modifiers: Modifiers,
        pressed: bool,
    },
    Motion {
        x: i32,
        y: i32,
        buttons: Buttons,
    },
    Button {
        x: i32,
        y: i32,
        buttons: Buttons,
        button: MouseButton,
        pressed: bool,
        modifiers: Modifiers,
    },
}

const SET1_ROWS: [(u8, &[u8]); 4] = [
    (0x02, b"1234567890-="),
    (0x10, b"qwertyuiop[]"),
    (0x1E, b"asdfghjkl;'`"),
    (0x2C, b"zxcvbnm,./"),
];

/// Unshifted character for a set-1 make code, if it produces one.
pub fn key_from_scancode(scancode: u8) -> Option<u8> {
    match scancode {
        0x01 => return Some(0x1B),
        0x0E => return Some(0x08),
        0x0F => return Some(b'\t'),
        0x1C => return Some(b'\n'),
        0x39 => return Some(b' '),
        _ => {}
    }
    SET1_ROWS.iter().find_map(|(start, chars)| {
        let offset = scancode.checked_sub(*start)? as usize;
        chars.get(offset).copied()
    })
}

pub fn key_matches(bound: u8, key: u8) -> bool {
    bound != 0 && bound.eq_ignore_ascii_case(&key)
}

/// Matches on the translated key first, then on the character the raw
/// scancode would produce.
pub fn key_event_matches(bound: u8, key: u8, scancode: u8) -> bool {
    key_matches(bound, key) || key_from_scancode(scancode).is_some_and(|k| key_matches(bound, k))
}

/// Accepts `n`, `'n'`, `"n"`, `110` or `0x6E`.
pub fn parse_key(value: &str) -> Option<u8> {
    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')));
    if let Some(inner) = unquoted {
        return single_ascii(inner);
    }
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        return u8::from_str_radix(hex, 16).ok();
    }
    if value.len() > 1 && value.bytes().all(|b| b.is_ascii_digit()) {
        return value.parse().ok();
    }
    single_ascii(value)
}

fn single_ascii(value: &str) -> Option<u8> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Some(*b),
        _ => None,
    }
}
