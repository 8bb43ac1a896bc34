use std::time::{Duration, Instant};

use crate::bindings::{find_bind, BindAction, KeyBind, LaunchOptions};
use crate::compositor::{focus_visual_rects, FrameColors, WindowCompositor, WindowFrame};
use crate::config::{Config, DragPreview};
use crate::damage::{DirtyTracker, Rectangle};
use crate::discovery::{ManagedWindows, PendingLaunch};
use crate::input::{key_event_matches, Buttons, InputEvent, Modifiers, MouseButton};
use crate::layout::{LayoutEngine, WindowReports};
use crate::platform::Platform;
use crate::surface::FrameSurface;
use crate::wm::{shift_after_close, IdShift, SplitTarget, WindowId, WindowManager};

/// Presented frames between forced full repaints.
pub const FULL_REPAINT_INTERVAL: u64 = 6000;
const FPS_WINDOW: Duration = Duration::from_secs(1);
const CURSOR_SIZE: i32 = 3;

/// Resolved, validated options the loop runs with.
#[derive(Clone, Debug)]
pub struct Settings {
    pub new_window_key: u8,
    pub quit_key: u8,
    pub mouse_new_window: bool,
    pub focus_follows_hover: bool,
    pub keyboard_uses_focus: bool,
    pub drag_modifier: Modifiers,
    pub drag_preview: DragPreview,
    pub background: u32,
    pub cursor: u32,
    pub fps_fg: u32,
    pub fps_bg: u32,
    pub frame: FrameColors,
    pub binds: Vec<KeyBind>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            new_window_key: config.new_window_key(),
            quit_key: config.quit_key(),
            mouse_new_window: config.mouse.new_window,
            focus_follows_hover: config.mouse.focus_follows_hover,
            keyboard_uses_focus: config.split.keyboard_uses_focus,
            drag_modifier: config.drag_modifier(),
            drag_preview: config.drag_preview(),
            background: config.background(),
            cursor: config.cursor(),
            fps_fg: config.fps_fg(),
            fps_bg: config.fps_bg(),
            frame: FrameColors {
                border: config.border(),
                focus: config.focus(),
            },
            binds: config.binds(),
        }
    }

    fn keyboard_target(&self) -> SplitTarget {
        if self.keyboard_uses_focus {
            SplitTarget::Focus
        } else {
            SplitTarget::Mouse
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Quit,
}

/// An in-progress modifier drag of one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Drag {
    pub window: WindowId,
    pub offset_x: i32,
    pub offset_y: i32,
    pub preview: Rectangle,
}

impl IdShift for Option<Drag> {
    fn window_closed(&mut self, closed: WindowId) {
        if let Some(drag) = self {
            match shift_after_close(drag.window, closed) {
                Some(id) => drag.window = id,
                None => *self = None,
            }
        }
    }
}

struct FpsOverlay {
    started: Instant,
    frames: u32,
    value: u32,
    changed: bool,
    drawn: Option<Rectangle>,
}

impl FpsOverlay {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            frames: 0,
            value: 0,
            changed: false,
            drawn: None,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
        if self.started.elapsed() >= FPS_WINDOW {
            self.value = self.frames;
            self.frames = 0;
            self.started = Instant::now();
            self.changed = true;
        }
    }

    fn text(&self) -> String {
        format!("FPS: {}", self.value)
    }
}

/// The windowing layer's whole state, driven one frame at a time by
/// [`Desktop::step`].
pub struct Desktop {
    settings: Settings,
    surface: FrameSurface,
    tracker: DirtyTracker,
    wm: WindowManager,
    managed: ManagedWindows,
    reports: WindowReports,
    engine: Box<dyn LayoutEngine>,
    compositor: WindowCompositor,
    mouse_x: i32,
    mouse_y: i32,
    cursor_drawn: Option<(i32, i32)>,
    drag: Option<Drag>,
    drag_moved: bool,
    fps: FpsOverlay,
    layout_pending: bool,
    /// Focus moved by a close; borders are repainted after the next layout.
    focus_moved_by_close: bool,
    unfocused_by_close: Option<WindowId>,
    last_window_count: Option<usize>,
    presented_frames: u64,
    max_frames: u64,
}

impl Desktop {
    pub fn new(settings: Settings, surface: FrameSurface, engine: Box<dyn LayoutEngine>) -> Self {
        let width = surface.width();
        let height = surface.height();
        let compositor = WindowCompositor::new(settings.frame);
        let mut tracker = DirtyTracker::new(width, height);
        tracker.mark_full_dirty();

        log::info!("[window] {} key binds active", settings.binds.len());

        Self {
            settings,
            surface,
            tracker,
            wm: WindowManager::new(),
            managed: ManagedWindows::new(),
            reports: WindowReports::new(),
            engine,
            compositor,
            mouse_x: width / 2,
            mouse_y: height / 2,
            cursor_drawn: None,
            drag: None,
            drag_moved: false,
            fps: FpsOverlay::new(),
            layout_pending: false,
            focus_moved_by_close: false,
            unfocused_by_close: None,
            last_window_count: None,
            presented_frames: 0,
            max_frames: 0,
        }
    }

    /// Stop after `frames` presented frames; 0 runs until quit.
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = frames;
        self
    }

    pub fn wm(&self) -> &WindowManager {
        &self.wm
    }

    pub fn managed(&self) -> &ManagedWindows {
        &self.managed
    }

    pub fn reports(&self) -> &WindowReports {
        &self.reports
    }

    pub fn surface(&self) -> &FrameSurface {
        &self.surface
    }

    pub fn tracker(&self) -> &DirtyTracker {
        &self.tracker
    }

    pub fn mouse(&self) -> (i32, i32) {
        (self.mouse_x, self.mouse_y)
    }

    pub fn drag(&self) -> Option<Drag> {
        self.drag
    }

    pub fn presented_frames(&self) -> u64 {
        self.presented_frames
    }

    pub fn run(&mut self, platform: &mut dyn Platform) {
        log::info!("[window] entering main loop");
        while self.step(platform) == Step::Continue {}
        log::info!("[window] main loop finished after {} frames", self.presented_frames);
    }

    /// One frame: drain input, reconcile slots, lay out if needed, paint
    /// the dirty regions, yield.
    pub fn step(&mut self, platform: &mut dyn Platform) -> Step {
        let mut quit = false;
        while let Some(event) = platform.poll_input() {
            if self.handle_event(platform, event) == Step::Quit {
                quit = true;
            }
        }
        if quit {
            log::info!("[window] quit requested");
            return Step::Quit;
        }

        self.discover(platform);

        let count = self.wm.window_count();
        if self.last_window_count != Some(count) {
            self.last_window_count = Some(count);
            self.layout_pending = true;
        }

        self.update_drag_preview();
        self.update_cursor();
        self.update_fps();

        if self.layout_pending {
            self.layout_pass();
        }

        if self.settings.focus_follows_hover && self.drag.is_none() {
            if let Some(id) = self.reports.previous.hit_test(self.mouse_x, self.mouse_y) {
                self.focus_window(id);
            }
        }

        if self.presented_frames % FULL_REPAINT_INTERVAL == 0 {
            self.tracker.mark_full_dirty();
        }

        if self.tracker.has_dirty() {
            self.paint();
            if self.max_frames > 0 && self.presented_frames >= self.max_frames {
                platform.yield_frame();
                return Step::Quit;
            }
        }

        platform.yield_frame();
        Step::Continue
    }

    fn handle_event(&mut self, platform: &mut dyn Platform, event: InputEvent) -> Step {
        match event {
            InputEvent::Key {
                key,
                scancode,
                modifiers,
                pressed: true,
            } => return self.handle_key_press(platform, event, key, scancode, modifiers),
            InputEvent::Key { pressed: false, .. } => self.route_to_focused(platform, &event),
            InputEvent::Motion { x, y, buttons } => {
                self.move_pointer(x, y);
                self.check_drag_buttons(buttons);
            }
            InputEvent::Button {
                x,
                y,
                buttons,
                button,
                pressed,
                modifiers,
            } => {
                self.move_pointer(x, y);
                if button == MouseButton::Left {
                    if pressed {
                        self.left_press(modifiers);
                    } else {
                        self.end_drag();
                    }
                }
                self.check_drag_buttons(buttons);
            }
        }
        Step::Continue
    }

    fn handle_key_press(
        &mut self,
        platform: &mut dyn Platform,
        event: InputEvent,
        key: u8,
        scancode: u8,
        modifiers: Modifiers,
    ) -> Step {
        if let Some(bind) = find_bind(&self.settings.binds, key, scancode, modifiers) {
            let action = bind.action.clone();
            return self.run_action(platform, &action);
        }

        if key_event_matches(self.settings.quit_key, key, 0) {
            return Step::Quit;
        }
        if key_event_matches(self.settings.new_window_key, key, 0) {
            self.new_window(self.settings.keyboard_target());
            return Step::Continue;
        }
        self.route_to_focused(platform, &event);
        Step::Continue
    }

    fn run_action(&mut self, platform: &mut dyn Platform, action: &BindAction) -> Step {
        match action {
            BindAction::Quit => return Step::Quit,
            BindAction::NewWindow => self.new_window(self.settings.keyboard_target()),
            BindAction::CloseFocused => {
                if let Some(id) = self.wm.focused() {
                    self.close_window(platform, id, true);
                }
            }
            BindAction::Launch(options) => self.launch(platform, options),
        }
        Step::Continue
    }

    fn new_window(&mut self, target: SplitTarget) {
        if self.wm.add_split(self.mouse_x, self.mouse_y, target).is_some() {
            self.layout_pending = true;
        }
    }

    fn launch(&mut self, platform: &mut dyn Platform, options: &LaunchOptions) {
        let Some(pid) = platform.spawn(&options.path) else {
            log::warn!("[launch] failed to start {}", options.path);
            return;
        };
        if options.external {
            log::info!("[launch] started {} as pid {} (external)", options.path, pid);
            return;
        }
        log::info!("[launch] started {} as pid {}, waiting for its window", options.path, pid);
        self.managed.pending_mut().remember(PendingLaunch {
            pid,
            x: self.mouse_x,
            y: self.mouse_y,
            target: self.settings.keyboard_target(),
            floating: options.floating,
            width: options.width,
            height: options.height,
        });
    }

    fn route_to_focused(&mut self, platform: &mut dyn Platform, event: &InputEvent) {
        let Some(slot) = self
            .wm
            .focused()
            .and_then(|id| self.managed.slot_for_window(id))
        else {
            return;
        };
        if !platform.send_event(slot, event) {
            log::debug!("[window] slot {} did not accept input", slot);
        }
    }

    /// The single close path, shared by user closes and vanished owners.
    pub fn close_window(&mut self, platform: &mut dyn Platform, id: WindowId, terminate_owner: bool) -> bool {
        let previous_focus = self.wm.focused();
        let Some(closed) = self.wm.close(id) else {
            return false;
        };

        if let Some(binding) = closed.binding {
            if terminate_owner {
                self.managed.dismiss(binding.slot);
                if let Some(pid) = binding.pid {
                    if !platform.terminate(pid) {
                        log::warn!("[window] could not terminate pid {}, leaving it running", pid);
                    }
                }
            }
        }

        if let Some(drag) = self.drag.filter(|d| d.window == id) {
            self.mark_preview(drag.preview);
        }
        self.managed.window_closed(id);
        self.drag.window_closed(id);
        self.layout_pending = true;
        self.focus_moved_by_close = true;
        self.unfocused_by_close = previous_focus
            .and_then(|f| shift_after_close(f, id))
            .or(self.unfocused_by_close.and_then(|f| shift_after_close(f, id)));
        log::info!("[window] closed window {}", id);
        true
    }

    fn discover(&mut self, platform: &mut dyn Platform) {
        let found = self
            .managed
            .discover(platform, &mut self.wm, (self.mouse_x, self.mouse_y));

        for slot in &found.vanished {
            if let Some(id) = self.managed.window_for_slot(*slot) {
                self.close_window(platform, id, false);
            }
        }
        for id in &found.content_dirty {
            if let Some(rect) = self.reports.previous.find(*id) {
                self.tracker.mark(rect);
            }
        }
        if !found.added.is_empty() {
            self.layout_pending = true;
        }
    }

    fn move_pointer(&mut self, x: i32, y: i32) {
        self.mouse_x = x.clamp(0, self.surface.width() - 1);
        self.mouse_y = y.clamp(0, self.surface.height() - 1);
        if self.drag.is_some() {
            self.drag_moved = true;
        }
    }

    fn left_press(&mut self, modifiers: Modifiers) {
        // Ids in the last report are stale after an add or close earlier
        // in this drain.
        if self.layout_pending {
            self.layout_pass();
        }
        let hovered = self.reports.previous.hit_test(self.mouse_x, self.mouse_y);
        match hovered {
            Some(id) => {
                self.focus_window(id);
                if modifiers.satisfies(self.settings.drag_modifier) {
                    self.begin_drag(id);
                }
            }
            None if self.settings.mouse_new_window => self.new_window(SplitTarget::Mouse),
            None => {}
        }
    }

    fn begin_drag(&mut self, id: WindowId) {
        let Some(rect) = self.reports.previous.find(id) else {
            return;
        };
        let offset_x = (self.mouse_x - rect.x).clamp(0, (rect.width - 1).max(0));
        let offset_y = (self.mouse_y - rect.y).clamp(0, (rect.height - 1).max(0));
        let drag = Drag {
            window: id,
            offset_x,
            offset_y,
            preview: rect,
        };
        log::debug!("[window] drag start for window {}", id);
        self.tracker.mark(rect);
        self.mark_preview(rect);
        self.drag = Some(drag);
        self.drag_moved = false;
    }

    /// A pointer event without the left button ends any drag.
    fn check_drag_buttons(&mut self, buttons: Buttons) {
        if self.drag.is_some() && !buttons.contains(Buttons::LEFT) {
            self.end_drag();
        }
    }

    fn end_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        self.mark_preview(drag.preview);
        if let Some(rect) = self.reports.previous.find(drag.window) {
            self.tracker.mark(rect);
        }
        if self.wm.set_split(drag.window, self.mouse_x, self.mouse_y) {
            self.layout_pending = true;
        }
        log::debug!(
            "[window] drag end for window {} at ({}, {})",
            drag.window,
            self.mouse_x,
            self.mouse_y
        );
    }

    fn mark_preview(&mut self, preview: Rectangle) {
        match self.settings.drag_preview {
            DragPreview::Outline => self.tracker.mark_outline(preview),
            DragPreview::Full => self.tracker.mark(preview),
        }
    }

    fn update_drag_preview(&mut self) {
        if !self.drag_moved {
            return;
        }
        self.drag_moved = false;
        let Some(mut drag) = self.drag else {
            return;
        };
        let preview = drag.preview;
        let max_x = (self.surface.width() - preview.width).max(0);
        let max_y = (self.surface.height() - preview.height).max(0);
        let next = Rectangle::new(
            (self.mouse_x - drag.offset_x).clamp(0, max_x),
            (self.mouse_y - drag.offset_y).clamp(0, max_y),
            preview.width,
            preview.height,
        );
        if next == preview {
            return;
        }
        self.mark_preview(preview);
        self.mark_preview(next);
        drag.preview = next;
        self.drag = Some(drag);
    }

    fn update_cursor(&mut self) {
        let now = (self.mouse_x, self.mouse_y);
        if self.cursor_drawn == Some(now) {
            return;
        }
        if let Some(old) = self.cursor_drawn {
            self.tracker.mark(cursor_rect(old));
        }
        self.tracker.mark(cursor_rect(now));
        self.cursor_drawn = Some(now);
    }

    fn fps_box(&self) -> (Rectangle, i32, i32) {
        let text_w = self.surface.font().text_width(&self.fps.text()) as i32;
        let text_x = (self.surface.width() - text_w - 8).max(0);
        let text_y = 8;
        (Rectangle::new(text_x - 3, text_y - 2, text_w + 6, 11), text_x, text_y)
    }

    fn update_fps(&mut self) {
        self.fps.tick();
        let (next, _, _) = self.fps_box();
        match self.fps.drawn {
            None => self.tracker.mark(next),
            Some(old) if self.fps.changed || old != next => {
                self.tracker.mark(old);
                self.tracker.mark(next);
            }
            Some(_) => {}
        }
        self.fps.changed = false;
        self.fps.drawn = Some(next);
    }

    fn layout_pass(&mut self) {
        self.reports.current.begin();
        self.engine
            .layout(&self.wm, self.surface.bounds(), &mut self.reports.current);
        self.reports.diff_into(&mut self.tracker);
        self.reports.promote();
        self.layout_pending = false;
        if self.focus_moved_by_close {
            self.focus_moved_by_close = false;
            let unfocused = self.unfocused_by_close.take();
            for window in unfocused.into_iter().chain(self.wm.focused()) {
                self.mark_focus_visuals(window);
            }
        }
        log::debug!(
            "[window] layout pass: {} windows, {} reported",
            self.wm.window_count(),
            self.reports.previous.len()
        );
    }

    fn focus_window(&mut self, id: WindowId) {
        let old = self.wm.focused();
        if !self.wm.set_focus(id) {
            return;
        }
        for window in old.into_iter().chain(Some(id)) {
            self.mark_focus_visuals(window);
        }
    }

    fn mark_focus_visuals(&mut self, window: WindowId) {
        let Some(rect) = self.reports.previous.find(window) else {
            return;
        };
        let has_content = self.managed.content(window).is_some();
        for r in focus_visual_rects(rect, has_content) {
            self.tracker.mark(r);
        }
    }

    fn paint(&mut self) {
        self.surface.begin_frame(&self.tracker, self.settings.background);

        let focused = self.wm.focused();
        let dragged = self.drag.map(|d| d.window);
        for entry in self.reports.previous.iter() {
            if Some(entry.id) == dragged {
                continue;
            }
            let frame = WindowFrame {
                id: entry.id,
                rect: entry.rect,
                focused: focused == Some(entry.id),
                content: self.managed.content(entry.id),
            };
            self.compositor.draw_dirty(&mut self.surface, &self.tracker, &frame);
        }

        if let Some(drag) = self.drag {
            let focus = self.settings.frame.focus;
            if self.settings.drag_preview == DragPreview::Full {
                let frame = WindowFrame {
                    id: drag.window,
                    rect: drag.preview,
                    focused: true,
                    content: self.managed.content(drag.window),
                };
                self.compositor.draw_full(&mut self.surface, &frame);
            }
            self.surface.outline_rect(drag.preview, focus);
        }

        self.surface
            .fill_rect(cursor_rect((self.mouse_x, self.mouse_y)), self.settings.cursor);

        let (fps_box, text_x, text_y) = self.fps_box();
        self.surface.fill_rect(fps_box, self.settings.fps_bg);
        let text = self.fps.text();
        self.surface.draw_text(text_x, text_y, &text, self.settings.fps_fg);

        self.surface.present(&self.tracker);
        self.tracker.reset();
        self.presented_frames += 1;
    }
}

fn cursor_rect((x, y): (i32, i32)) -> Rectangle {
    Rectangle::new(x - 1, y - 1, CURSOR_SIZE, CURSOR_SIZE)
}
