use crate::compositor::ContentView;
use crate::platform::{Platform, SlotBuffer, SlotInfo};
use crate::wm::{shift_after_close, IdShift, Pid, SplitTarget, WindowId, WindowManager};

pub const MAX_SLOTS: usize = 16;
pub const MAX_PENDING_LAUNCHES: usize = 16;

/// Placement requested for a process that has not created its window yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingLaunch {
    pub pid: Pid,
    pub x: i32,
    pub y: i32,
    pub target: SplitTarget,
    pub floating: bool,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Default)]
pub struct PendingLaunches {
    entries: [Option<PendingLaunch>; MAX_PENDING_LAUNCHES],
}

impl PendingLaunches {
    /// When the table is full the oldest slot (entry 0) is overwritten.
    pub fn remember(&mut self, launch: PendingLaunch) {
        let index = self
            .entries
            .iter()
            .position(|e| e.is_some_and(|p| p.pid == launch.pid))
            .or_else(|| self.entries.iter().position(Option::is_none))
            .unwrap_or_else(|| {
                log::warn!("[launch] pending table full, dropping oldest request");
                0
            });
        self.entries[index] = Some(launch);
    }

    pub fn take(&mut self, pid: Pid) -> Option<PendingLaunch> {
        self.entries
            .iter_mut()
            .find(|e| e.is_some_and(|p| p.pid == pid))
            .and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct ManagedEntry {
    slot: usize,
    window: WindowId,
    buffer: Option<Box<dyn SlotBuffer>>,
    width: u32,
    height: u32,
}

/// What one discovery pass found.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Discovery {
    pub added: Vec<WindowId>,
    /// Slots whose owner went away while still bound to a window.
    pub vanished: Vec<usize>,
    pub content_dirty: Vec<WindowId>,
}

impl Discovery {
    pub fn layout_changed(&self) -> bool {
        !self.added.is_empty() || !self.vanished.is_empty()
    }
}

/// Binds kernel window slots to window-manager windows.
#[derive(Default)]
pub struct ManagedWindows {
    entries: Vec<ManagedEntry>,
    /// Slots closed from our side whose owner has not exited yet.
    dismissed: [bool; MAX_SLOTS],
    pending: PendingLaunches,
}

impl ManagedWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_mut(&mut self) -> &mut PendingLaunches {
        &mut self.pending
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window_for_slot(&self, slot: usize) -> Option<WindowId> {
        self.entries.iter().find(|e| e.slot == slot).map(|e| e.window)
    }

    pub fn slot_for_window(&self, window: WindowId) -> Option<usize> {
        self.entries.iter().find(|e| e.window == window).map(|e| e.slot)
    }

    pub fn content(&self, window: WindowId) -> Option<ContentView<'_>> {
        let entry = self.entries.iter().find(|e| e.window == window)?;
        let buffer = entry.buffer.as_ref()?;
        let (width, height) = buffer.size();
        ContentView::new(buffer.pixels(), width, height)
    }

    /// Ignores `slot` until its owner deactivates it.
    pub fn dismiss(&mut self, slot: usize) {
        if let Some(flag) = self.dismissed.get_mut(slot) {
            *flag = true;
        }
    }

    /// Scans every slot once. New active slots get a window, placed by a
    /// pending launch of the same owner if there is one. Vanished slots are
    /// reported, not closed, so the caller can funnel them through its
    /// single close path.
    pub fn discover(
        &mut self,
        platform: &mut dyn Platform,
        wm: &mut WindowManager,
        mouse: (i32, i32),
    ) -> Discovery {
        let mut found = Discovery::default();

        for slot in 0..MAX_SLOTS {
            let info = platform.slot_info(slot).unwrap_or_default();
            let bound = self.entries.iter().position(|e| e.slot == slot);

            if !info.active {
                self.dismissed[slot] = false;
                if bound.is_some() {
                    log::info!("[discovery] slot {} went inactive", slot);
                    found.vanished.push(slot);
                }
                continue;
            }
            if self.dismissed[slot] {
                continue;
            }

            match bound {
                Some(index) => {
                    let entry = &mut self.entries[index];
                    if entry.width != info.width || entry.height != info.height {
                        log::debug!(
                            "[discovery] slot {} resized to {}x{}",
                            slot,
                            info.width,
                            info.height
                        );
                        entry.buffer = platform.map_slot(slot);
                        entry.width = info.width;
                        entry.height = info.height;
                        found.content_dirty.push(entry.window);
                    } else if info.content_dirty {
                        found.content_dirty.push(entry.window);
                    }
                }
                None => {
                    if let Some(id) = self.adopt(platform, wm, slot, &info, mouse) {
                        found.added.push(id);
                    }
                }
            }
        }

        found
    }

    fn adopt(
        &mut self,
        platform: &mut dyn Platform,
        wm: &mut WindowManager,
        slot: usize,
        info: &SlotInfo,
        mouse: (i32, i32),
    ) -> Option<WindowId> {
        let pending = info.owner.and_then(|pid| self.pending.take(pid));
        let id = match pending {
            Some(p) => {
                // Unset requested sizes follow the slot's own size.
                let width = if p.width > 0 { p.width } else { info.width as i32 };
                let height = if p.height > 0 { p.height } else { info.height as i32 };
                wm.add_launch(p.x, p.y, p.target, p.floating, width, height)?
            }
            None => wm.add_launch(
                mouse.0,
                mouse.1,
                SplitTarget::Mouse,
                false,
                info.width as i32,
                info.height as i32,
            )?,
        };

        let buffer = platform.map_slot(slot);
        if buffer.is_none() {
            log::warn!("[discovery] could not map slot {}, using placeholder", slot);
        }
        wm.bind(id, slot, info.owner);
        self.entries.push(ManagedEntry {
            slot,
            window: id,
            buffer,
            width: info.width,
            height: info.height,
        });
        log::info!(
            "[discovery] slot {} (pid {:?}) is window {}{}",
            slot,
            info.owner,
            id,
            if pending.is_some() { " from pending launch" } else { "" }
        );
        Some(id)
    }
}

impl IdShift for ManagedWindows {
    fn window_closed(&mut self, closed: WindowId) {
        self.entries.retain_mut(|entry| match shift_after_close(entry.window, closed) {
            Some(id) => {
                entry.window = id;
                true
            }
            None => false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputEvent;
    use crate::platform::OwnedSlotBuffer;

    #[derive(Default)]
    struct Slots {
        info: [SlotInfo; MAX_SLOTS],
        maps: usize,
    }

    impl Slots {
        fn open(&mut self, slot: usize, pid: Pid, width: u32, height: u32) {
            self.info[slot] = SlotInfo {
                active: true,
                width,
                height,
                owner: Some(pid),
                content_dirty: false,
            };
        }
    }

    impl Platform for Slots {
        fn poll_input(&mut self) -> Option<InputEvent> {
            None
        }

        fn slot_info(&mut self, slot: usize) -> Option<SlotInfo> {
            let info = self.info.get(slot).copied();
            if let Some(s) = self.info.get_mut(slot) {
                s.content_dirty = false;
            }
            info
        }

        fn map_slot(&mut self, slot: usize) -> Option<Box<dyn SlotBuffer>> {
            self.maps += 1;
            let info = self.info[slot];
            Some(Box::new(OwnedSlotBuffer::filled(
                info.width as usize,
                info.height as usize,
                0xABCDEF,
            )))
        }

        fn send_event(&mut self, _slot: usize, _event: &InputEvent) -> bool {
            true
        }

        fn spawn(&mut self, _path: &str) -> Option<Pid> {
            None
        }

        fn terminate(&mut self, _pid: Pid) -> bool {
            true
        }

        fn yield_frame(&mut self) {}
    }

    fn pending(pid: Pid) -> PendingLaunch {
        PendingLaunch {
            pid,
            x: 50,
            y: 60,
            target: SplitTarget::Focus,
            floating: true,
            width: 300,
            height: 200,
        }
    }

    #[test]
    fn pending_table_overwrites_first_entry_when_full() {
        let mut table = PendingLaunches::default();
        for pid in 1..=MAX_PENDING_LAUNCHES as Pid {
            table.remember(pending(pid));
        }
        assert_eq!(table.len(), MAX_PENDING_LAUNCHES);
        table.remember(pending(99));
        assert_eq!(table.len(), MAX_PENDING_LAUNCHES);
        assert!(table.take(1).is_none());
        assert!(table.take(99).is_some());
        assert!(table.take(99).is_none());
    }

    #[test]
    fn pending_table_replaces_same_pid() {
        let mut table = PendingLaunches::default();
        table.remember(pending(5));
        table.remember(PendingLaunch { x: 1, ..pending(5) });
        assert_eq!(table.len(), 1);
        assert_eq!(table.take(5).map(|p| p.x), Some(1));
        assert!(table.is_empty());
    }

    #[test]
    fn new_slot_uses_pending_launch() {
        let mut platform = Slots::default();
        let mut wm = WindowManager::new();
        let mut managed = ManagedWindows::new();
        managed.pending_mut().remember(pending(42));

        platform.open(3, 42, 64, 48);
        let found = managed.discover(&mut platform, &mut wm, (0, 0));
        assert_eq!(found.added, vec![1]);
        assert!(found.layout_changed());
        assert!(managed.pending_mut().is_empty());

        let rect = wm.floating_rect(1).unwrap();
        assert_eq!((rect.width, rect.height), (300, 200));
        assert_eq!(wm.split(1).map(|s| (s.x, s.y)), Some((50, 60)));
        assert_eq!(wm.binding(1).map(|b| (b.slot, b.pid)), Some((3, Some(42))));
        assert_eq!(managed.window_for_slot(3), Some(1));
        let content = managed.content(1).unwrap();
        assert_eq!((content.width(), content.height()), (64, 48));
    }

    #[test]
    fn pending_launch_without_size_takes_slot_size() {
        let mut platform = Slots::default();
        let mut wm = WindowManager::new();
        let mut managed = ManagedWindows::new();
        managed.pending_mut().remember(PendingLaunch {
            width: 0,
            height: -1,
            ..pending(42)
        });

        platform.open(0, 42, 200, 150);
        managed.discover(&mut platform, &mut wm, (0, 0));
        let rect = wm.floating_rect(1).unwrap();
        assert_eq!((rect.width, rect.height), (200, 150));
    }

    #[test]
    fn unannounced_slot_is_tiled_at_mouse() {
        let mut platform = Slots::default();
        let mut wm = WindowManager::new();
        let mut managed = ManagedWindows::new();
        platform.open(0, 7, 10, 10);
        managed.discover(&mut platform, &mut wm, (123, 45));
        let split = wm.split(1).unwrap();
        assert_eq!((split.x, split.y, split.target), (123, 45, SplitTarget::Mouse));
        assert!(wm.floating_rect(1).is_none());

        // second pass finds nothing new
        let found = managed.discover(&mut platform, &mut wm, (0, 0));
        assert_eq!(found, Discovery::default());
    }

    #[test]
    fn inactive_slot_is_reported_once_closed() {
        let mut platform = Slots::default();
        let mut wm = WindowManager::new();
        let mut managed = ManagedWindows::new();
        platform.open(1, 10, 10, 10);
        platform.open(2, 11, 10, 10);
        managed.discover(&mut platform, &mut wm, (0, 0));

        platform.info[1].active = false;
        let found = managed.discover(&mut platform, &mut wm, (0, 0));
        assert_eq!(found.vanished, vec![1]);

        let id = managed.window_for_slot(1).unwrap();
        wm.close(id);
        managed.window_closed(id);
        assert_eq!(managed.window_for_slot(1), None);
        assert_eq!(managed.window_for_slot(2), Some(1));

        let found = managed.discover(&mut platform, &mut wm, (0, 0));
        assert!(found.vanished.is_empty());
    }

    #[test]
    fn dismissed_slot_is_not_readopted() {
        let mut platform = Slots::default();
        let mut wm = WindowManager::new();
        let mut managed = ManagedWindows::new();
        platform.open(4, 10, 10, 10);
        managed.discover(&mut platform, &mut wm, (0, 0));

        wm.close(1);
        managed.window_closed(1);
        managed.dismiss(4);
        assert!(managed.discover(&mut platform, &mut wm, (0, 0)).added.is_empty());

        platform.info[4].active = false;
        managed.discover(&mut platform, &mut wm, (0, 0));
        platform.open(4, 12, 10, 10);
        assert_eq!(managed.discover(&mut platform, &mut wm, (0, 0)).added, vec![1]);
    }

    #[test]
    fn content_dirty_and_resize() {
        let mut platform = Slots::default();
        let mut wm = WindowManager::new();
        let mut managed = ManagedWindows::new();
        platform.open(0, 10, 10, 10);
        managed.discover(&mut platform, &mut wm, (0, 0));
        assert_eq!(platform.maps, 1);

        platform.info[0].content_dirty = true;
        assert_eq!(managed.discover(&mut platform, &mut wm, (0, 0)).content_dirty, vec![1]);
        assert!(managed.discover(&mut platform, &mut wm, (0, 0)).content_dirty.is_empty());

        platform.info[0].width = 20;
        assert_eq!(managed.discover(&mut platform, &mut wm, (0, 0)).content_dirty, vec![1]);
        assert_eq!(platform.maps, 2);
        assert_eq!(managed.content(1).map(|c| c.width()), Some(20));
    }
}
