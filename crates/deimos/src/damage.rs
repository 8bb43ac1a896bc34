pub const MAX_DIRTY_RECTS: usize = 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn intersect(&self, other: &Rectangle) -> Option<Rectangle> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rectangle::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.x < other.right()
            && self.right() > other.x
            && self.y < other.bottom()
            && self.bottom() > other.y
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Shrinks by `by` pixels on every side. May produce an empty rectangle.
    pub fn inset(&self, by: i32) -> Rectangle {
        Rectangle::new(self.x + by, self.y + by, self.width - 2 * by, self.height - 2 * by)
    }

    /// The four 1-pixel border edges: top, bottom, left, right.
    pub fn edges(&self) -> [Rectangle; 4] {
        [
            Rectangle::new(self.x, self.y, self.width, 1),
            Rectangle::new(self.x, self.bottom() - 1, self.width, 1),
            Rectangle::new(self.x, self.y, 1, self.height),
            Rectangle::new(self.right() - 1, self.y, 1, self.height),
        ]
    }
}

/// Bounded list of stale screen regions.
///
/// Once more than `N` rectangles are marked in a frame the tracker stops
/// recording individual regions and reports the whole surface as dirty.
#[derive(Clone, Debug)]
pub struct DirtyTracker<const N: usize = MAX_DIRTY_RECTS> {
    regions: [Rectangle; N],
    count: usize,
    full_dirty: bool,
    bounds: Rectangle,
}

impl DirtyTracker {
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_bounds(width, height)
    }
}

impl<const N: usize> DirtyTracker<N> {
    pub fn with_bounds(width: i32, height: i32) -> Self {
        Self {
            regions: [Rectangle::default(); N],
            count: 0,
            full_dirty: false,
            bounds: Rectangle::new(0, 0, width.max(0), height.max(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn bounds(&self) -> Rectangle {
        self.bounds
    }

    pub fn mark_rect(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let Some(rect) = Rectangle::new(x, y, width, height).intersect(&self.bounds) else {
            return;
        };
        if self.full_dirty {
            return;
        }
        if self.count >= N {
            self.mark_full_dirty();
            return;
        }
        self.regions[self.count] = rect;
        self.count += 1;
    }

    pub fn mark(&mut self, rect: Rectangle) {
        self.mark_rect(rect.x, rect.y, rect.width, rect.height);
    }

    /// Marks only the four border edges of `rect`.
    pub fn mark_outline(&mut self, rect: Rectangle) {
        if rect.is_empty() {
            return;
        }
        for edge in rect.edges() {
            self.mark(edge);
        }
    }

    pub fn mark_full_dirty(&mut self) {
        self.full_dirty = true;
        self.count = 0;
    }

    pub fn has_dirty(&self) -> bool {
        self.full_dirty || self.count > 0
    }

    pub fn is_full_dirty(&self) -> bool {
        self.full_dirty
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn regions(&self) -> &[Rectangle] {
        &self.regions[..self.count]
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.full_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_intersection() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Some(Rectangle::new(5, 5, 5, 5)));
        assert!(a.intersects(&b));
        assert_eq!(a.intersect(&Rectangle::new(10, 0, 5, 5)), None);
        assert!(!a.intersects(&Rectangle::new(10, 0, 5, 5)));
    }

    #[test]
    fn rect_edges_and_inset() {
        let r = Rectangle::new(10, 20, 30, 40);
        assert_eq!(r.inset(1), Rectangle::new(11, 21, 28, 38));
        assert!(Rectangle::new(0, 0, 2, 2).inset(1).is_empty());
        let [top, bottom, left, right] = r.edges();
        assert_eq!(top, Rectangle::new(10, 20, 30, 1));
        assert_eq!(bottom, Rectangle::new(10, 59, 30, 1));
        assert_eq!(left, Rectangle::new(10, 20, 1, 40));
        assert_eq!(right, Rectangle::new(39, 20, 1, 40));
    }

    #[test]
    fn mark_clips_to_bounds() {
        let mut tracker = DirtyTracker::new(100, 50);
        tracker.mark_rect(-10, -10, 20, 20);
        assert_eq!(tracker.regions(), &[Rectangle::new(0, 0, 10, 10)]);

        tracker.mark_rect(95, 45, 10, 10);
        assert_eq!(tracker.regions()[1], Rectangle::new(95, 45, 5, 5));
    }

    #[test]
    fn empty_and_offscreen_rects_are_discarded() {
        let mut tracker = DirtyTracker::new(100, 50);
        tracker.mark_rect(10, 10, 0, 5);
        tracker.mark_rect(10, 10, 5, -1);
        tracker.mark_rect(200, 10, 5, 5);
        assert!(!tracker.has_dirty());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn overflow_degrades_to_full_dirty() {
        let mut tracker: DirtyTracker<4> = DirtyTracker::with_bounds(100, 100);
        for i in 0..4 {
            tracker.mark_rect(i * 10, 0, 5, 5);
        }
        assert!(tracker.has_dirty());
        assert!(!tracker.is_full_dirty());
        assert_eq!(tracker.count(), 4);

        tracker.mark_rect(50, 50, 5, 5);
        assert!(tracker.is_full_dirty());
        assert_eq!(tracker.count(), 0);
        assert!(tracker.regions().is_empty());
    }

    #[test]
    fn full_dirty_absorbs_later_marks() {
        let mut tracker = DirtyTracker::new(64, 64);
        tracker.mark_full_dirty();
        tracker.mark_rect(1, 1, 4, 4);
        assert!(tracker.has_dirty());
        assert!(tracker.is_full_dirty());
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut tracker = DirtyTracker::new(64, 64);
        tracker.mark_rect(1, 1, 4, 4);
        tracker.mark_full_dirty();
        tracker.reset();
        assert!(!tracker.has_dirty());
        assert!(!tracker.is_full_dirty());
    }

    #[test]
    fn outline_marks_four_edges() {
        let mut tracker = DirtyTracker::new(64, 64);
        tracker.mark_outline(Rectangle::new(4, 4, 10, 10));
        assert_eq!(tracker.count(), 4);
        tracker.mark_outline(Rectangle::new(4, 4, 0, 10));
        assert_eq!(tracker.count(), 4);
    }
}
