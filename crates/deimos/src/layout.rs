use serde::{Deserialize, Serialize};

use crate::damage::{DirtyTracker, Rectangle};
use crate::wm::{SplitTarget, WindowId, WindowManager, MAX_WINDOWS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportedRect {
    pub id: WindowId,
    pub rect: Rectangle,
}

/// Rectangles handed back by a layout engine, in paint order.
#[derive(Clone, Debug, Default)]
pub struct LayoutReport {
    entries: [Option<ReportedRect>; MAX_WINDOWS],
}

impl LayoutReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) {
        self.entries = [None; MAX_WINDOWS];
    }

    pub fn report_rect(&mut self, index: usize, id: WindowId, rect: Rectangle) {
        if index >= MAX_WINDOWS || id == 0 || id as usize > MAX_WINDOWS {
            return;
        }
        self.entries[index] = Some(ReportedRect { id, rect });
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReportedRect> {
        self.entries.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(Option::is_none)
    }

    pub fn find(&self, id: WindowId) -> Option<Rectangle> {
        self.iter().find(|e| e.id == id).map(|e| e.rect)
    }

    /// Topmost window under the point, i.e. the last one painted there.
    pub fn hit_test(&self, x: i32, y: i32) -> Option<WindowId> {
        self.entries
            .iter()
            .rev()
            .flatten()
            .find(|e| e.rect.contains(x, y))
            .map(|e| e.id)
    }
}

/// The last two layout passes, diffed to find what needs repainting.
#[derive(Clone, Debug, Default)]
pub struct WindowReports {
    pub previous: LayoutReport,
    pub current: LayoutReport,
}

impl WindowReports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vanished windows dirty their old rectangle, moved or resized ones
    /// both, new ones their new rectangle.
    pub fn diff_into(&self, tracker: &mut DirtyTracker) {
        for id in 1..=MAX_WINDOWS as WindowId {
            match (self.previous.find(id), self.current.find(id)) {
                (Some(old), None) => tracker.mark(old),
                (Some(old), Some(new)) if old != new => {
                    tracker.mark(old);
                    tracker.mark(new);
                }
                (None, Some(new)) => tracker.mark(new),
                _ => {}
            }
        }
    }

    pub fn promote(&mut self) {
        self.previous = self.current.clone();
    }
}

/// Turns split history into concrete rectangles.
pub trait LayoutEngine {
    fn layout(&mut self, wm: &WindowManager, screen: Rectangle, report: &mut LayoutReport);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceSplit {
    #[default]
    Auto,
    Vertical,
    Horizontal,
}

/// Binary-split tiler. Each tiled window halves an existing tile; floating
/// windows are stacked above all tiles at their own geometry.
#[derive(Clone, Debug)]
pub struct SplitLayout {
    pub gap: i32,
    pub vertical_bias_percent: i32,
    pub force: ForceSplit,
}

impl Default for SplitLayout {
    fn default() -> Self {
        Self {
            gap: 6,
            vertical_bias_percent: 160,
            force: ForceSplit::Auto,
        }
    }
}

impl SplitLayout {
    pub fn new(gap: i32, vertical_bias_percent: i32, force: ForceSplit) -> Self {
        Self {
            gap,
            vertical_bias_percent,
            force,
        }
    }

    fn split_vertically(&self, rect: &Rectangle) -> bool {
        match self.force {
            ForceSplit::Vertical => true,
            ForceSplit::Horizontal => false,
            ForceSplit::Auto => {
                rect.width as i64 * 100 >= rect.height as i64 * self.vertical_bias_percent as i64
            }
        }
    }

    fn target_tile(
        tiles: &[(WindowId, Rectangle)],
        target: SplitTarget,
        target_id: Option<WindowId>,
        x: i32,
        y: i32,
    ) -> usize {
        if target == SplitTarget::Focus {
            if let Some(pos) = target_id.and_then(|t| tiles.iter().position(|(id, _)| *id == t)) {
                return pos;
            }
        }
        tiles
            .iter()
            .rposition(|(_, r)| r.contains(x, y))
            .unwrap_or(tiles.len() - 1)
    }

    /// Returns (new window half, remaining half).
    fn split(&self, rect: Rectangle, x: i32, y: i32) -> (Rectangle, Rectangle) {
        if self.split_vertically(&rect) {
            let left_w = rect.width / 2;
            let left = Rectangle::new(rect.x, rect.y, left_w, rect.height);
            let right = Rectangle::new(rect.x + left_w, rect.y, rect.width - left_w, rect.height);
            if x < rect.x + left_w {
                (left, right)
            } else {
                (right, left)
            }
        } else {
            let top_h = rect.height / 2;
            let top = Rectangle::new(rect.x, rect.y, rect.width, top_h);
            let bottom = Rectangle::new(rect.x, rect.y + top_h, rect.width, rect.height - top_h);
            if y < rect.y + top_h {
                (top, bottom)
            } else {
                (bottom, top)
            }
        }
    }
}

impl LayoutEngine for SplitLayout {
    fn layout(&mut self, wm: &WindowManager, screen: Rectangle, report: &mut LayoutReport) {
        let half = self.gap / 2;
        let area = screen.inset(self.gap - half);
        let mut tiles: Vec<(WindowId, Rectangle)> = Vec::with_capacity(MAX_WINDOWS);

        for (id, window) in wm.windows() {
            if window.is_floating() {
                continue;
            }
            if tiles.is_empty() {
                tiles.push((id, area));
                continue;
            }
            let split = window.split;
            let idx = Self::target_tile(&tiles, split.target, split.target_id, split.x, split.y);
            let (taken, rest) = self.split(tiles[idx].1, split.x, split.y);
            tiles[idx].1 = rest;
            tiles.push((id, taken));
        }

        let mut index = 0;
        for (id, tile) in &tiles {
            report.report_rect(index, *id, tile.inset(half));
            index += 1;
        }
        for (id, window) in wm.windows() {
            if let Some(rect) = window.floating {
                report.report_rect(index, id, rect);
                index += 1;
            }
        }
    }
}
