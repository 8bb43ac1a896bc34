//! Linux host: DRM scanout, libinput, shared-memory window slots.

pub mod scanout;
pub mod libinput;
pub mod slots;

use calloop::generic::Generic;
use calloop::{EventLoop, Interest, Mode, PostAction};
use nix::sys::signal::{kill, Signal};
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, Instant};

use crate::input::InputEvent;
use crate::platform::{Platform, SlotBuffer, SlotInfo};
use crate::wm::Pid;

pub use self::scanout::DrmScanout;
pub use self::libinput::InputHandler;
pub use self::slots::SlotDirectory;

const FRAME_BUDGET: Duration = Duration::from_millis(16);

struct LoopData {
    input: Option<InputHandler>,
}

pub struct HostPlatform {
    event_loop: EventLoop<'static, LoopData>,
    data: LoopData,
    slots: SlotDirectory,
    children: Vec<Child>,
    frame_start: Instant,
}

impl HostPlatform {
    pub fn new(
        screen_width: u32,
        screen_height: u32,
        slots_dir: PathBuf,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let event_loop = EventLoop::<LoopData>::try_new()?;

        let input = match InputHandler::new(screen_width, screen_height) {
            Ok(handler) => {
                log::info!("[input] libinput initialized on seat0");
                Some(handler)
            }
            Err(e) => {
                log::warn!("[input] failed to initialize libinput: {}", e);
                log::info!("[input] running without keyboard/mouse input");
                None
            }
        };

        if let Some(ref handler) = input {
            let input_fd = handler.as_fd().try_clone_to_owned()?;
            event_loop
                .handle()
                .insert_source(
                    Generic::new(input_fd, Interest::READ, Mode::Level),
                    |_, _, data: &mut LoopData| {
                        if let Some(ref mut handler) = data.input {
                            if let Err(e) = handler.dispatch() {
                                log::warn!("[input] dispatch failed: {}", e);
                            }
                        }
                        Ok(PostAction::Continue)
                    },
                )
                .map_err(|e| format!("failed to insert input source: {}", e))?;
        }

        Ok(HostPlatform {
            event_loop,
            data: LoopData { input },
            slots: SlotDirectory::new(slots_dir),
            children: Vec::new(),
            frame_start: Instant::now(),
        })
    }

    fn reap_children(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                log::info!("[launch] process {} exited: {}", child.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("[launch] cannot query process {}: {}", child.id(), e);
                false
            }
        });
    }
}

impl Platform for HostPlatform {
    fn poll_input(&mut self) -> Option<InputEvent> {
        self.data.input.as_mut()?.pop()
    }

    fn slot_info(&mut self, slot: usize) -> Option<SlotInfo> {
        self.slots.info(slot)
    }

    fn map_slot(&mut self, slot: usize) -> Option<Box<dyn SlotBuffer>> {
        self.slots.map(slot)
    }

    fn send_event(&mut self, slot: usize, event: &InputEvent) -> bool {
        self.slots.send(slot, event)
    }

    fn spawn(&mut self, path: &str) -> Option<Pid> {
        match Command::new(path)
            .env("DEIMOS_SLOTS_DIR", self.slots.dir())
            .spawn()
        {
            Ok(child) => {
                let pid = child.id() as Pid;
                log::info!("[launch] {} launched with PID {}", path, pid);
                self.children.push(child);
                Some(pid)
            }
            Err(e) => {
                log::warn!("[launch] failed to launch {}: {}", path, e);
                None
            }
        }
    }

    fn terminate(&mut self, pid: Pid) -> bool {
        match kill(nix::unistd::Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {
                log::info!("[launch] sent SIGTERM to {}", pid);
                true
            }
            Err(e) => {
                log::warn!("[launch] failed to signal {}: {}", pid, e);
                false
            }
        }
    }

    fn yield_frame(&mut self) {
        let remaining = FRAME_BUDGET.saturating_sub(self.frame_start.elapsed());
        if let Err(e) = self.event_loop.dispatch(Some(remaining), &mut self.data) {
            log::warn!("[input] event loop error: {}", e);
        }
        self.reap_children();
        self.frame_start = Instant::now();
    }
}
