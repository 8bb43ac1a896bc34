use std::collections::VecDeque;

use deimos::bindings::{BindAction, KeyBind, LaunchOptions};
use deimos::discovery::MAX_SLOTS;
use deimos::input::{Buttons, InputEvent, Modifiers, MouseButton};
use deimos::platform::OwnedSlotBuffer;
use deimos::wm::Pid;
use deimos::{Desktop, FrameSurface, MemoryScanout, Platform, Settings, SlotBuffer, SlotInfo, SplitLayout, Step};

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

#[derive(Default)]
struct ScriptedHost {
    queue: VecDeque<InputEvent>,
    slots: [SlotInfo; MAX_SLOTS],
    next_pid: Pid,
    spawned: Vec<String>,
    terminated: Vec<Pid>,
    sent: Vec<(usize, InputEvent)>,
    yields: usize,
}

impl ScriptedHost {
    fn new() -> Self {
        Self {
            next_pid: 500,
            ..Default::default()
        }
    }

    fn push(&mut self, event: InputEvent) {
        self.queue.push_back(event);
    }

    fn open_slot(&mut self, slot: usize, pid: Pid, width: u32, height: u32) {
        self.slots[slot] = SlotInfo {
            active: true,
            width,
            height,
            owner: Some(pid),
            content_dirty: false,
        };
    }

    fn close_slot(&mut self, slot: usize) {
        self.slots[slot] = SlotInfo::default();
    }
}

impl Platform for ScriptedHost {
    fn poll_input(&mut self) -> Option<InputEvent> {
        self.queue.pop_front()
    }

    fn slot_info(&mut self, slot: usize) -> Option<SlotInfo> {
        let info = self.slots.get(slot).copied();
        if let Some(s) = self.slots.get_mut(slot) {
            s.content_dirty = false;
        }
        info
    }

    fn map_slot(&mut self, slot: usize) -> Option<Box<dyn SlotBuffer>> {
        let info = self.slots.get(slot)?;
        Some(Box::new(OwnedSlotBuffer::filled(
            info.width as usize,
            info.height as usize,
            0x0033_6699,
        )))
    }

    fn send_event(&mut self, slot: usize, event: &InputEvent) -> bool {
        self.sent.push((slot, *event));
        true
    }

    fn spawn(&mut self, path: &str) -> Option<Pid> {
        self.spawned.push(path.to_string());
        self.next_pid += 1;
        Some(self.next_pid)
    }

    fn terminate(&mut self, pid: Pid) -> bool {
        self.terminated.push(pid);
        true
    }

    fn yield_frame(&mut self) {
        self.yields += 1;
    }
}

fn desktop(settings: Settings) -> Desktop {
    let surface = FrameSurface::new(Box::new(MemoryScanout::new(WIDTH, HEIGHT, 32))).unwrap();
    Desktop::new(settings, surface, Box::new(SplitLayout::default()))
}

fn key(ch: u8, modifiers: Modifiers) -> InputEvent {
    InputEvent::Key {
        key: ch,
        scancode: 0,
        modifiers,
        pressed: true,
    }
}

fn left(x: i32, y: i32, pressed: bool, modifiers: Modifiers) -> InputEvent {
    InputEvent::Button {
        x,
        y,
        buttons: if pressed { Buttons::LEFT } else { Buttons::empty() },
        button: MouseButton::Left,
        pressed,
        modifiers,
    }
}

#[test]
fn new_window_key_then_quit_key() {
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(Settings::default());

    host.push(key(b'n', Modifiers::empty()));
    assert_eq!(desktop.step(&mut host), Step::Continue);
    assert_eq!(desktop.wm().window_count(), 1);
    assert_eq!(desktop.wm().focused(), Some(1));
    assert!(desktop.reports().previous.find(1).is_some());
    assert_eq!(desktop.presented_frames(), 1);

    host.push(key(b'x', Modifiers::empty()));
    assert_eq!(desktop.step(&mut host), Step::Quit);
}

#[test]
fn first_frame_is_a_full_repaint_of_the_background() {
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(Settings::default());
    desktop.step(&mut host);

    let background = Settings::default().background;
    assert_eq!(desktop.surface().get_pixel(0, HEIGHT as i32 - 1), Some(background));
    assert!(!desktop.tracker().has_dirty());
    assert_eq!(host.yields, 1);
}

#[test]
fn max_frames_stops_the_loop() {
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(Settings::default()).with_max_frames(3);
    for _ in 0..3 {
        // Each step moves the pointer so every frame has something to present.
        host.push(InputEvent::Motion {
            x: 10 + host.yields as i32,
            y: 10,
            buttons: Buttons::empty(),
        });
        if desktop.step(&mut host) == Step::Quit {
            break;
        }
    }
    assert_eq!(desktop.presented_frames(), 3);
}

#[test]
fn launch_bind_places_window_from_pending_request() {
    let mut settings = Settings::default();
    settings.binds.push(KeyBind {
        key: b'l',
        modifiers: Modifiers::SUPER,
        action: BindAction::Launch(LaunchOptions::parse("/usr/bin/demo floating size=200x100").unwrap()),
    });
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(settings);

    host.push(key(b'l', Modifiers::SUPER));
    desktop.step(&mut host);
    assert_eq!(host.spawned, vec!["/usr/bin/demo".to_string()]);
    assert_eq!(desktop.wm().window_count(), 0);

    host.open_slot(2, 501, 64, 48);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 1);
    assert_eq!(desktop.managed().window_for_slot(2), Some(1));
    let float = desktop.wm().floating_rect(1).unwrap();
    assert_eq!((float.width, float.height), (200, 100));
    assert_eq!(desktop.wm().binding(1).and_then(|b| b.pid), Some(501));
}

#[test]
fn unbound_key_is_routed_to_focused_slot() {
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(Settings::default());
    host.open_slot(0, 42, 32, 32);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().focused(), Some(1));

    let press = key(b'a', Modifiers::empty());
    host.push(press);
    desktop.step(&mut host);
    assert_eq!(host.sent, vec![(0, press)]);
}

#[test]
fn vanished_owner_closes_without_signal() {
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(Settings::default());
    host.open_slot(0, 10, 32, 32);
    host.open_slot(1, 11, 32, 32);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 2);

    host.close_slot(0);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 1);
    assert_eq!(desktop.managed().window_for_slot(1), Some(1));
    assert!(host.terminated.is_empty());
}

#[test]
fn close_bind_terminates_owner_and_slot_stays_dismissed() {
    let mut settings = Settings::default();
    settings.binds.push(KeyBind {
        key: b'q',
        modifiers: Modifiers::SUPER,
        action: BindAction::CloseFocused,
    });
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(settings);
    host.open_slot(0, 77, 32, 32);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 1);

    host.push(key(b'q', Modifiers::SUPER));
    desktop.step(&mut host);
    assert_eq!(host.terminated, vec![77]);
    assert!(desktop.wm().is_empty());

    // Slot still reported active until the owner exits.
    desktop.step(&mut host);
    assert!(desktop.wm().is_empty());

    host.close_slot(0);
    desktop.step(&mut host);
    host.open_slot(0, 78, 32, 32);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 1);
}

#[test]
fn modifier_drag_moves_split_point() {
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(Settings::default());
    host.push(key(b'n', Modifiers::empty()));
    desktop.step(&mut host);

    host.push(left(100, 100, true, Modifiers::SUPER));
    desktop.step(&mut host);
    let drag = desktop.drag().unwrap();
    assert_eq!(drag.window, 1);

    host.push(InputEvent::Motion {
        x: 150,
        y: 120,
        buttons: Buttons::LEFT,
    });
    desktop.step(&mut host);
    assert!(desktop.drag().is_some());

    host.push(left(150, 120, false, Modifiers::empty()));
    desktop.step(&mut host);
    assert!(desktop.drag().is_none());
    let split = desktop.wm().split(1).unwrap();
    assert_eq!((split.x, split.y), (150, 120));
}

#[test]
fn plain_click_focuses_without_dragging() {
    let mut settings = Settings::default();
    settings.focus_follows_hover = false;
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(settings);

    // The second window splits the first one.
    host.push(InputEvent::Motion {
        x: 40,
        y: 120,
        buttons: Buttons::empty(),
    });
    host.push(key(b'n', Modifiers::empty()));
    host.push(key(b'n', Modifiers::empty()));
    desktop.step(&mut host);
    assert_eq!(desktop.wm().focused(), Some(2));

    let first = desktop.reports().previous.find(1).unwrap();
    let (x, y) = (first.x + first.width / 2, first.y + first.height / 2);
    host.push(left(x, y, true, Modifiers::empty()));
    desktop.step(&mut host);
    assert_eq!(desktop.wm().focused(), Some(1));
    assert!(desktop.drag().is_none());
}

#[test]
fn vanished_unfocused_window_hands_focus_to_its_successor() {
    let mut settings = Settings::default();
    settings.focus_follows_hover = false;
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(settings);
    host.open_slot(0, 10, 32, 32);
    host.open_slot(1, 11, 32, 32);
    host.open_slot(2, 12, 32, 32);
    desktop.step(&mut host);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 3);
    assert_eq!(desktop.wm().focused(), Some(3));

    host.close_slot(0);
    desktop.step(&mut host);
    assert_eq!(desktop.wm().window_count(), 2);
    assert_eq!(desktop.wm().focused(), Some(1));
    assert_eq!(desktop.managed().window_for_slot(1), Some(1));
    assert_eq!(desktop.managed().window_for_slot(2), Some(2));
}

#[test]
fn click_after_close_in_same_frame_hits_current_layout() {
    let mut settings = Settings::default();
    settings.focus_follows_hover = false;
    settings.binds.push(KeyBind {
        key: b'q',
        modifiers: Modifiers::SUPER,
        action: BindAction::CloseFocused,
    });
    let mut host = ScriptedHost::new();
    let mut desktop = desktop(settings);

    host.push(InputEvent::Motion {
        x: 40,
        y: 120,
        buttons: Buttons::empty(),
    });
    host.push(key(b'n', Modifiers::empty()));
    host.push(key(b'n', Modifiers::empty()));
    desktop.step(&mut host);
    let first = desktop.reports().previous.find(1).unwrap();
    let second = desktop.reports().previous.find(2).unwrap();

    host.push(left(first.x + first.width / 2, first.y + first.height / 2, true, Modifiers::empty()));
    host.push(left(first.x + first.width / 2, first.y + first.height / 2, false, Modifiers::empty()));
    desktop.step(&mut host);
    assert_eq!(desktop.wm().focused(), Some(1));

    // Close window 1, then grab where window 2 used to be, in one drain.
    let (x, y) = (second.x + second.width / 2, second.y + second.height / 2);
    host.push(key(b'q', Modifiers::SUPER));
    host.push(left(x, y, true, Modifiers::SUPER));
    desktop.step(&mut host);

    assert_eq!(desktop.wm().window_count(), 1);
    let drag = desktop.drag().unwrap();
    assert_eq!(drag.window, 1);
    assert_eq!(Some(drag.preview), desktop.reports().previous.find(1));
}
