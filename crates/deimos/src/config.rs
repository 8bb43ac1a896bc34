use deimos_common::{deimos_config_dir, deimos_runtime_dir, parse_color};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::bindings::{BindAction, KeyBind, MAX_BINDS};
use crate::input::{parse_key, Modifiers};
use crate::layout::ForceSplit;

const DEFAULT_BACKGROUND: u32 = 0x101820;
const DEFAULT_CURSOR: u32 = 0xFFFFFF;
const DEFAULT_FPS_FG: u32 = 0xE6E6E6;
const DEFAULT_FPS_BG: u32 = 0x000000;
const DEFAULT_BORDER: u32 = 0x00AA66;
const DEFAULT_FOCUS: u32 = 0xFFFFFF;

fn default_new_window_key() -> KeyValue {
    KeyValue::Text("n".to_string())
}
fn default_quit_key() -> KeyValue {
    KeyValue::Text("x".to_string())
}

fn default_true() -> bool {
    true
}

fn default_drag_modifier() -> String {
    "super".to_string()
}
fn default_drag_preview() -> String {
    "full".to_string()
}

fn default_background() -> String {
    "#101820".to_string()
}
fn default_cursor() -> String {
    "#FFFFFF".to_string()
}
fn default_fps_fg() -> String {
    "#E6E6E6".to_string()
}
fn default_fps_bg() -> String {
    "#000000".to_string()
}
fn default_border() -> String {
    "#00AA66".to_string()
}
fn default_focus() -> String {
    "#FFFFFF".to_string()
}

fn default_gap() -> i32 {
    6
}
fn default_vertical_bias() -> i32 {
    160
}
fn default_force_split() -> String {
    "auto".to_string()
}

fn default_drm_device() -> String {
    "auto".to_string()
}
fn default_depth() -> u32 {
    32
}

/// A key written either as text (`"n"`, `"'n'"`, `"0x6E"`) or as a bare
/// integer code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Code(i64),
    Text(String),
}

impl KeyValue {
    pub fn resolve(&self) -> Option<u8> {
        match self {
            KeyValue::Code(code) => u8::try_from(*code).ok(),
            KeyValue::Text(text) => parse_key(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPreview {
    Full,
    Outline,
}

impl DragPreview {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "full" | "0" => Some(DragPreview::Full),
            "outline" | "1" => Some(DragPreview::Outline),
            _ => None,
        }
    }
}

fn parse_force_split(s: &str) -> Option<ForceSplit> {
    match s.trim().to_lowercase().as_str() {
        "auto" | "0" => Some(ForceSplit::Auto),
        "vertical" | "v" | "1" => Some(ForceSplit::Vertical),
        "horizontal" | "h" | "2" => Some(ForceSplit::Horizontal),
        _ => None,
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct KeysConfig {
    #[serde(default = "default_new_window_key")]
    pub new_window: KeyValue,
    #[serde(default = "default_quit_key")]
    pub quit: KeyValue,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            new_window: default_new_window_key(),
            quit: default_quit_key(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MouseConfig {
    #[serde(default)]
    pub new_window: bool,
    #[serde(default = "default_true")]
    pub focus_follows_hover: bool,
}

impl Default for MouseConfig {
    fn default() -> Self {
        Self {
            new_window: false,
            focus_follows_hover: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SplitConfig {
    #[serde(default = "default_true")]
    pub keyboard_uses_focus: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            keyboard_uses_focus: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DragConfig {
    #[serde(default = "default_drag_modifier")]
    pub modifier: String,
    #[serde(default = "default_drag_preview")]
    pub preview: String,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            modifier: default_drag_modifier(),
            preview: default_drag_preview(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ColorsConfig {
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_cursor")]
    pub cursor: String,
    #[serde(default = "default_fps_fg")]
    pub fps_fg: String,
    #[serde(default = "default_fps_bg")]
    pub fps_bg: String,
    #[serde(default = "default_border")]
    pub border: String,
    #[serde(default = "default_focus")]
    pub focus: String,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            cursor: default_cursor(),
            fps_fg: default_fps_fg(),
            fps_bg: default_fps_bg(),
            border: default_border(),
            focus: default_focus(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LayoutConfig {
    #[serde(default = "default_gap")]
    pub gap: i32,
    #[serde(default = "default_vertical_bias")]
    pub vertical_bias_percent: i32,
    #[serde(default = "default_force_split")]
    pub force_split: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            gap: default_gap(),
            vertical_bias_percent: default_vertical_bias(),
            force_split: default_force_split(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DisplayConfig {
    #[serde(default = "default_drm_device")]
    pub device: String,
    #[serde(default = "default_depth")]
    pub depth: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            device: default_drm_device(),
            depth: default_depth(),
        }
    }
}

impl DisplayConfig {
    pub fn drm_device_path(&self) -> Option<PathBuf> {
        match self.device.as_str() {
            "auto" | "" => None,
            path => Some(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SlotsConfig {
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BindEntry {
    pub key: KeyValue,
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub action: String,
    #[serde(default)]
    pub arg: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub keys: KeysConfig,
    pub mouse: MouseConfig,
    pub split: SplitConfig,
    pub drag: DragConfig,
    pub colors: ColorsConfig,
    pub layout: LayoutConfig,
    pub display: DisplayConfig,
    pub slots: SlotsConfig,
    pub bind: Vec<BindEntry>,
}

impl Config {
    /// Tries `explicit`, then the user config, then the system config. Files
    /// that fail to load are skipped.
    pub fn load(explicit: Option<&Path>) -> Self {
        let mut candidates = Vec::with_capacity(3);
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        }
        candidates.push(deimos_config_dir().join("config.toml"));
        candidates.push(PathBuf::from("/etc/deimos/config.toml"));

        for path in candidates {
            if !path.exists() {
                if explicit == Some(path.as_path()) {
                    log::warn!("Config file {} does not exist", path.display());
                }
                continue;
            }
            match Self::load_from_path(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", path.display(), e);
                }
            }
        }

        log::info!("Using default configuration");
        Self::default()
    }

    pub fn load_from_path(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("Failed to read file: {}", e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    pub fn new_window_key(&self) -> u8 {
        self.keys.new_window.resolve().unwrap_or(b'n')
    }

    pub fn quit_key(&self) -> u8 {
        self.keys.quit.resolve().unwrap_or(b'x')
    }

    pub fn drag_modifier(&self) -> Modifiers {
        Modifiers::parse(&self.drag.modifier).unwrap_or(Modifiers::SUPER)
    }

    pub fn drag_preview(&self) -> DragPreview {
        DragPreview::parse(&self.drag.preview).unwrap_or(DragPreview::Full)
    }

    pub fn background(&self) -> u32 {
        color_or(&self.colors.background, DEFAULT_BACKGROUND)
    }

    pub fn cursor(&self) -> u32 {
        color_or(&self.colors.cursor, DEFAULT_CURSOR)
    }

    pub fn fps_fg(&self) -> u32 {
        color_or(&self.colors.fps_fg, DEFAULT_FPS_FG)
    }

    pub fn fps_bg(&self) -> u32 {
        color_or(&self.colors.fps_bg, DEFAULT_FPS_BG)
    }

    pub fn border(&self) -> u32 {
        color_or(&self.colors.border, DEFAULT_BORDER)
    }

    pub fn focus(&self) -> u32 {
        color_or(&self.colors.focus, DEFAULT_FOCUS)
    }

    pub fn gap(&self) -> i32 {
        self.layout.gap.clamp(0, 64)
    }

    pub fn vertical_bias_percent(&self) -> i32 {
        self.layout.vertical_bias_percent.clamp(50, 400)
    }

    pub fn force_split(&self) -> ForceSplit {
        parse_force_split(&self.layout.force_split).unwrap_or_default()
    }

    pub fn depth(&self) -> u32 {
        match self.display.depth {
            16 | 24 | 32 => self.display.depth,
            _ => default_depth(),
        }
    }

    pub fn slots_dir(&self) -> PathBuf {
        self.slots.dir.clone().unwrap_or_else(deimos_runtime_dir)
    }

    /// Valid `[[bind]]` entries in declaration order, at most `MAX_BINDS`.
    pub fn binds(&self) -> Vec<KeyBind> {
        let mut binds = Vec::new();
        for entry in &self.bind {
            if binds.len() >= MAX_BINDS {
                log::warn!("Ignoring binds beyond the first {}", MAX_BINDS);
                break;
            }
            match parse_bind(entry) {
                Some(bind) => binds.push(bind),
                None => log::warn!("Ignoring invalid bind {:?} -> {}", entry.key, entry.action),
            }
        }
        binds
    }
}

fn color_or(value: &str, fallback: u32) -> u32 {
    parse_color(value).map_or(fallback, |c| c & 0x00FF_FFFF)
}

fn parse_bind(entry: &BindEntry) -> Option<KeyBind> {
    let key = entry.key.resolve()?;
    let mut modifiers = Modifiers::empty();
    for name in &entry.modifiers {
        modifiers |= Modifiers::parse(name)?;
    }
    let action = BindAction::parse(&entry.action, &entry.arg)?;
    Some(KeyBind { key, modifiers, action })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.new_window_key(), b'n');
        assert_eq!(config.quit_key(), b'x');
        assert!(!config.mouse.new_window);
        assert!(config.mouse.focus_follows_hover);
        assert!(config.split.keyboard_uses_focus);
        assert_eq!(config.drag_modifier(), Modifiers::SUPER);
        assert_eq!(config.drag_preview(), DragPreview::Full);
        assert_eq!(config.background(), 0x101820);
        assert_eq!(config.border(), 0x00AA66);
        assert_eq!(config.gap(), 6);
        assert_eq!(config.vertical_bias_percent(), 160);
        assert_eq!(config.force_split(), ForceSplit::Auto);
        assert_eq!(config.depth(), 32);
        assert!(config.binds().is_empty());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::from_toml(
            r#"
            [keys]
            quit = "q"

            [layout]
            gap = 12
            "#,
        )
        .unwrap();
        assert_eq!(config.quit_key(), b'q');
        assert_eq!(config.new_window_key(), b'n');
        assert_eq!(config.gap(), 12);
        assert_eq!(config.vertical_bias_percent(), 160);
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let config = Config::from_toml(
            r##"
            [keys]
            new_window = "nn"
            quit = 0x51

            [drag]
            modifier = "hyper"
            preview = "outline"

            [colors]
            border = "green"
            focus = "#80FF0000"

            [layout]
            gap = 100
            vertical_bias_percent = 10
            force_split = "diagonal"

            [display]
            depth = 8
            "##,
        )
        .unwrap();
        assert_eq!(config.new_window_key(), b'n');
        assert_eq!(config.quit_key(), 0x51);
        assert_eq!(config.drag_modifier(), Modifiers::SUPER);
        assert_eq!(config.drag_preview(), DragPreview::Outline);
        assert_eq!(config.border(), 0x00AA66);
        assert_eq!(config.focus(), 0xFF0000);
        assert_eq!(config.gap(), 64);
        assert_eq!(config.vertical_bias_percent(), 50);
        assert_eq!(config.force_split(), ForceSplit::Auto);
        assert_eq!(config.depth(), 32);
    }

    #[test]
    fn binds_are_parsed_in_order() {
        let config = Config::from_toml(
            r#"
            [[bind]]
            key = "t"
            modifiers = ["super"]
            action = "launch"
            arg = "/bin/term,floating"

            [[bind]]
            key = "q"
            modifiers = ["bogus"]
            action = "quit"

            [[bind]]
            key = 119
            action = "close_focused"
            "#,
        )
        .unwrap();
        let binds = config.binds();
        assert_eq!(binds.len(), 2);
        assert_eq!(binds[0].key, b't');
        assert_eq!(binds[0].modifiers, Modifiers::SUPER);
        assert!(matches!(&binds[0].action, BindAction::Launch(o) if o.floating));
        assert_eq!(binds[1].key, b'w');
        assert_eq!(binds[1].action, BindAction::CloseFocused);
    }

    #[test]
    fn bind_count_is_capped() {
        let mut config = Config::default();
        for _ in 0..MAX_BINDS + 4 {
            config.bind.push(BindEntry {
                key: KeyValue::Text("a".into()),
                modifiers: Vec::new(),
                action: "quit".into(),
                arg: String::new(),
            });
        }
        assert_eq!(config.binds().len(), MAX_BINDS);
    }

    #[test]
    fn broken_toml_is_an_error() {
        assert!(Config::from_toml("[layout\ngap = ").is_err());
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("\"focus_follows_hover\":true"));
        assert!(json.contains("\"new_window\":\"n\""));
    }
}
