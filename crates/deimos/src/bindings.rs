use crate::input::{key_event_matches, Modifiers};
use crate::wm::{DEFAULT_LAUNCH_HEIGHT, DEFAULT_LAUNCH_WIDTH};

pub const MAX_BINDS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindAction {
    Launch(LaunchOptions),
    NewWindow,
    CloseFocused,
    Quit,
}

impl BindAction {
    pub fn parse(action: &str, arg: &str) -> Option<Self> {
        match action.trim().to_lowercase().as_str() {
            "launch" | "exec" => LaunchOptions::parse(arg).map(BindAction::Launch),
            "new_window" | "new" => Some(BindAction::NewWindow),
            "close_focused" | "close" => Some(BindAction::CloseFocused),
            "quit" | "exit" => Some(BindAction::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBind {
    pub key: u8,
    pub modifiers: Modifiers,
    pub action: BindAction,
}

impl KeyBind {
    pub fn matches(&self, key: u8, scancode: u8, held: Modifiers) -> bool {
        held.satisfies(self.modifiers) && key_event_matches(self.key, key, scancode)
    }
}

/// First bind in declaration order that matches the key press.
pub fn find_bind(binds: &[KeyBind], key: u8, scancode: u8, held: Modifiers) -> Option<&KeyBind> {
    binds.iter().find(|b| b.matches(key, scancode, held))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    pub path: String,
    pub floating: bool,
    /// Fire-and-forget: the process gets no window binding.
    pub external: bool,
    pub width: i32,
    pub height: i32,
}

impl LaunchOptions {
    /// Parses `"<path>[,| ]opt..."`. Unknown options are ignored.
    pub fn parse(arg: &str) -> Option<Self> {
        let is_sep = |c: char| c == ',' || c.is_ascii_whitespace();
        let mut tokens = arg.split(is_sep).filter(|t| !t.is_empty());
        let path = tokens.next()?.to_string();

        let mut opts = LaunchOptions {
            path,
            floating: false,
            external: false,
            width: DEFAULT_LAUNCH_WIDTH,
            height: DEFAULT_LAUNCH_HEIGHT,
        };
        for token in tokens {
            opts.apply(&token.to_ascii_lowercase());
        }
        Some(opts)
    }

    fn apply(&mut self, token: &str) {
        match token {
            "floating" | "float" => self.floating = true,
            "tiled" | "tile" => self.floating = false,
            "external" | "spawn" => self.external = true,
            "managed" | "windowed" => self.external = false,
            _ => {
                if let Some(v) = token.strip_prefix("w=").and_then(parse_positive) {
                    self.width = v;
                } else if let Some(v) = token.strip_prefix("h=").and_then(parse_positive) {
                    self.height = v;
                } else if let Some((w, h)) = token.strip_prefix("size=").and_then(|s| s.split_once('x')) {
                    if let Some(w) = parse_positive(w) {
                        self.width = w;
                    }
                    if let Some(h) = parse_positive(h) {
                        self.height = h;
                    }
                }
            }
        }
    }
}

fn parse_positive(text: &str) -> Option<i32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse::<i32>().ok().filter(|v| *v > 0)
}
