use crate::input::InputEvent;
use crate::wm::Pid;

/// Snapshot of one kernel window slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotInfo {
    pub active: bool,
    pub width: u32,
    pub height: u32,
    pub owner: Option<Pid>,
    /// The owner wrote new content since the previous query.
    pub content_dirty: bool,
}

/// Pixels of a slot, written by another process. Reads are unsynchronised,
/// so a frame may show a partially updated buffer.
pub trait SlotBuffer {
    fn size(&self) -> (usize, usize);
    fn pixels(&self) -> &[u32];
}

/// Everything the interaction loop needs from the host system.
pub trait Platform {
    /// Next queued input event, or `None` once the queue is drained.
    fn poll_input(&mut self) -> Option<InputEvent>;

    fn slot_info(&mut self, slot: usize) -> Option<SlotInfo>;

    fn map_slot(&mut self, slot: usize) -> Option<Box<dyn SlotBuffer>>;

    /// Best effort; false if the slot's owner could not be reached.
    fn send_event(&mut self, slot: usize, event: &InputEvent) -> bool;

    fn spawn(&mut self, path: &str) -> Option<Pid>;

    fn terminate(&mut self, pid: Pid) -> bool;

    /// Frame-end suspension point.
    fn yield_frame(&mut self);
}

/// A slot buffer held in ordinary memory.
#[derive(Clone, Debug, Default)]
pub struct OwnedSlotBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl OwnedSlotBuffer {
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width * height],
        }
    }
}

impl SlotBuffer for OwnedSlotBuffer {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}
