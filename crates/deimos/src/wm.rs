use serde::{Deserialize, Serialize};

use crate::damage::Rectangle;

/// 1-based, dense. Closing window `k` renumbers every id above `k` down by one.
pub type WindowId = u32;
pub type Pid = i32;

pub const MAX_WINDOWS: usize = 16;
pub const MIN_FLOAT_WIDTH: i32 = 120;
pub const MIN_FLOAT_HEIGHT: i32 = 80;
pub const DEFAULT_LAUNCH_WIDTH: i32 = 420;
pub const DEFAULT_LAUNCH_HEIGHT: i32 = 260;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitTarget {
    /// Split whatever lies under the recorded point.
    #[default]
    Mouse,
    /// Split the window that was focused when the record was made.
    Focus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitRecord {
    pub x: i32,
    pub y: i32,
    pub target: SplitTarget,
    pub target_id: Option<WindowId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub slot: usize,
    pub pid: Option<Pid>,
}

#[derive(Clone, Debug)]
pub struct Window {
    pub split: SplitRecord,
    pub floating: Option<Rectangle>,
    pub binding: Option<Binding>,
}

impl Window {
    pub fn is_floating(&self) -> bool {
        self.floating.is_some()
    }
}

/// What a close removed, so callers can release the external side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClosedWindow {
    pub id: WindowId,
    pub binding: Option<Binding>,
}

/// Anything holding window ids must follow the renumbering a close causes.
pub trait IdShift {
    fn window_closed(&mut self, closed: WindowId);
}

/// New value of `id` after `closed` was removed; `None` if `id` was the
/// closed window itself.
pub fn shift_after_close(id: WindowId, closed: WindowId) -> Option<WindowId> {
    match id.cmp(&closed) {
        std::cmp::Ordering::Less => Some(id),
        std::cmp::Ordering::Equal => None,
        std::cmp::Ordering::Greater => Some(id - 1),
    }
}

fn floating_rect(cx: i32, cy: i32, width: i32, height: i32) -> Rectangle {
    let width = width.max(MIN_FLOAT_WIDTH);
    let height = height.max(MIN_FLOAT_HEIGHT);
    Rectangle::new(cx - width / 2, cy - height / 2, width, height)
}

#[derive(Default)]
pub struct WindowManager {
    windows: Vec<Window>,
    focused: Option<WindowId>,
}

impl WindowManager {
    pub fn new() -> Self {
        Self {
            windows: Vec::with_capacity(MAX_WINDOWS),
            focused: None,
        }
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.windows.len() >= MAX_WINDOWS
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn contains(&self, id: WindowId) -> bool {
        id >= 1 && id as usize <= self.windows.len()
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        if !self.contains(id) {
            return None;
        }
        self.windows.get(id as usize - 1)
    }

    fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        if !self.contains(id) {
            return None;
        }
        self.windows.get_mut(id as usize - 1)
    }

    pub fn windows(&self) -> impl Iterator<Item = (WindowId, &Window)> {
        self.windows
            .iter()
            .enumerate()
            .map(|(i, w)| (i as WindowId + 1, w))
    }

    pub fn split(&self, id: WindowId) -> Option<SplitRecord> {
        self.window(id).map(|w| w.split)
    }

    pub fn floating_rect(&self, id: WindowId) -> Option<Rectangle> {
        self.window(id).and_then(|w| w.floating)
    }

    pub fn binding(&self, id: WindowId) -> Option<Binding> {
        self.window(id).and_then(|w| w.binding)
    }

    pub fn add_split(&mut self, x: i32, y: i32, target: SplitTarget) -> Option<WindowId> {
        self.push(x, y, target, None)
    }

    /// Adds a window for a spawned application. Bindings are attached later
    /// via [`WindowManager::bind`] once the application's slot shows up.
    pub fn add_launch(
        &mut self,
        x: i32,
        y: i32,
        target: SplitTarget,
        floating: bool,
        width: i32,
        height: i32,
    ) -> Option<WindowId> {
        let float = floating.then(|| {
            let width = if width <= 0 { DEFAULT_LAUNCH_WIDTH } else { width };
            let height = if height <= 0 { DEFAULT_LAUNCH_HEIGHT } else { height };
            floating_rect(x, y, width, height)
        });
        self.push(x, y, target, float)
    }

    fn push(
        &mut self,
        x: i32,
        y: i32,
        target: SplitTarget,
        floating: Option<Rectangle>,
    ) -> Option<WindowId> {
        if self.is_full() {
            log::debug!("[wm] window limit {} reached, ignoring add", MAX_WINDOWS);
            return None;
        }
        let target_id = match target {
            SplitTarget::Focus => self.focused,
            SplitTarget::Mouse => None,
        };
        self.windows.push(Window {
            split: SplitRecord { x, y, target, target_id },
            floating,
            binding: None,
        });
        let id = self.windows.len() as WindowId;
        self.focused = Some(id);
        log::debug!(
            "[wm] added window {} at ({}, {}) {:?}{}",
            id,
            x,
            y,
            target,
            if floating.is_some() { " floating" } else { "" }
        );
        Some(id)
    }

    pub fn bind(&mut self, id: WindowId, slot: usize, pid: Option<Pid>) -> bool {
        match self.window_mut(id) {
            Some(window) => {
                window.binding = Some(Binding { slot, pid });
                true
            }
            None => false,
        }
    }

    /// Returns true only when the focused window actually changed.
    pub fn set_focus(&mut self, id: WindowId) -> bool {
        if !self.contains(id) || self.focused == Some(id) {
            return false;
        }
        self.focused = Some(id);
        true
    }

    /// Moves the split anchor. Floating windows are re-centred on the new
    /// point. Returns false when nothing observable changed.
    pub fn set_split(&mut self, id: WindowId, x: i32, y: i32) -> bool {
        let Some(window) = self.window_mut(id) else {
            return false;
        };

        if let Some(current) = window.floating {
            let moved = floating_rect(x, y, current.width, current.height);
            window.split.x = x;
            window.split.y = y;
            if moved == current {
                return false;
            }
            window.floating = Some(moved);
            return true;
        }

        if window.split.x == x && window.split.y == y {
            return false;
        }
        window.split.x = x;
        window.split.y = y;
        true
    }

    pub fn close_focused(&mut self) -> Option<ClosedWindow> {
        let id = self.focused?;
        self.close(id)
    }

    /// Removes `id`, shifting every higher window down one slot. Focus ends
    /// on the window that moved into `id`'s position, or the new last one.
    pub fn close(&mut self, id: WindowId) -> Option<ClosedWindow> {
        if !self.contains(id) {
            return None;
        }
        let removed = self.windows.remove(id as usize - 1);

        for window in &mut self.windows {
            if let Some(target) = window.split.target_id {
                window.split.target_id = shift_after_close(target, id);
            }
        }

        // Same outcome as focusing `id` and closing the focused window.
        let count = self.windows.len() as WindowId;
        self.focused = (count > 0).then(|| id.min(count));

        log::debug!("[wm] closed window {}, {} remaining", id, count);
        Some(ClosedWindow {
            id,
            binding: removed.binding,
        })
    }
}
