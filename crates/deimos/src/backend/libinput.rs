use input::event::keyboard::{KeyState, KeyboardEventTrait};
use input::event::pointer::{ButtonState, PointerEvent};
use input::event::{DeviceEvent, Event, EventTrait};
use input::{Libinput, LibinputInterface};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use xkbcommon::xkb;

use crate::input::{Buttons, InputEvent, Modifiers, MouseButton};

const BTN_LEFT: u32 = 0x110;
const BTN_RIGHT: u32 = 0x111;
const BTN_MIDDLE: u32 = 0x112;

/// Highest evdev code that shares its value with the set-1 make code.
const SET1_COMPATIBLE_MAX: u32 = 0x58;

struct Interface;

impl LibinputInterface for Interface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> Result<OwnedFd, i32> {
        OpenOptions::new()
            .custom_flags(flags)
            .read((flags & libc::O_RDWR != 0) || (flags & libc::O_ACCMODE == libc::O_RDONLY))
            .write((flags & libc::O_RDWR != 0) || (flags & libc::O_WRONLY != 0))
            .open(path)
            .map(|file| file.into())
            .map_err(|err| err.raw_os_error().unwrap_or(-1))
    }

    fn close_restricted(&mut self, fd: OwnedFd) {
        drop(File::from(fd));
    }
}

/// Translates libinput keyboard and pointer events into [`InputEvent`]s.
pub struct InputHandler {
    libinput: Libinput,
    xkb_context: xkb::Context,
    xkb_state: Option<xkb::State>,
    modifiers: Modifiers,
    buttons: Buttons,
    pointer: (f64, f64),
    screen: (u32, u32),
    queue: VecDeque<InputEvent>,
}

impl InputHandler {
    pub fn new(screen_width: u32, screen_height: u32) -> Result<Self, Box<dyn std::error::Error>> {
        let mut libinput = Libinput::new_with_udev(Interface);
        libinput
            .udev_assign_seat("seat0")
            .map_err(|_| "Failed to assign udev seat")?;

        Ok(InputHandler {
            libinput,
            xkb_context: xkb::Context::new(xkb::CONTEXT_NO_FLAGS),
            xkb_state: None,
            modifiers: Modifiers::empty(),
            buttons: Buttons::empty(),
            pointer: (screen_width as f64 / 2.0, screen_height as f64 / 2.0),
            screen: (screen_width, screen_height),
            queue: VecDeque::new(),
        })
    }

    pub fn dispatch(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.libinput.dispatch()?;
        self.process_events();
        Ok(())
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.queue.pop_front()
    }

    fn process_events(&mut self) {
        let events: Vec<Event> = (&mut self.libinput).collect();
        for event in events {
            match event {
                Event::Keyboard(keyboard_event) => {
                    self.handle_key(keyboard_event.key(), keyboard_event.key_state());
                }
                Event::Pointer(pointer_event) => self.handle_pointer(pointer_event),
                Event::Device(DeviceEvent::Added(added)) => {
                    let device = added.device();
                    log::info!("[input] device added: {}", device.name());
                    if device.has_capability(input::DeviceCapability::Keyboard) {
                        self.init_xkb_state();
                    }
                }
                _ => {}
            }
        }
    }

    fn init_xkb_state(&mut self) {
        if self.xkb_state.is_some() {
            return;
        }
        let keymap = xkb::Keymap::new_from_names(
            &self.xkb_context,
            "",
            "",
            "",
            "",
            None,
            xkb::KEYMAP_COMPILE_NO_FLAGS,
        );

        match keymap {
            Some(keymap) => self.xkb_state = Some(xkb::State::new(&keymap)),
            None => log::warn!("[input] failed to compile default keymap"),
        }
    }

    fn handle_key(&mut self, key: u32, state: KeyState) {
        self.init_xkb_state();
        let pressed = state == KeyState::Pressed;

        let mut translated = 0u8;
        if let Some(ref mut xkb_state) = self.xkb_state {
            let keycode = xkb::Keycode::from(key + 8);
            // Read the character before updating so a shift release still
            // reports what was typed.
            if pressed {
                let utf8 = xkb_state.key_get_utf8(keycode);
                if let [byte] = utf8.as_bytes() {
                    if byte.is_ascii() {
                        translated = *byte;
                    }
                }
            }

            xkb_state.update_key(
                keycode,
                if pressed {
                    xkb::KeyDirection::Down
                } else {
                    xkb::KeyDirection::Up
                },
            );

            let mut modifiers = Modifiers::empty();
            for (name, flag) in [
                (xkb::MOD_NAME_SHIFT, Modifiers::SHIFT),
                (xkb::MOD_NAME_CTRL, Modifiers::CTRL),
                (xkb::MOD_NAME_ALT, Modifiers::ALT),
                (xkb::MOD_NAME_LOGO, Modifiers::SUPER),
            ] {
                if xkb_state.mod_name_is_active(name, xkb::STATE_MODS_EFFECTIVE) {
                    modifiers |= flag;
                }
            }
            self.modifiers = modifiers;
        }

        let scancode = if key <= SET1_COMPATIBLE_MAX { key as u8 } else { 0 };
        self.queue.push_back(InputEvent::Key {
            key: translated,
            scancode,
            modifiers: self.modifiers,
            pressed,
        });
    }

    fn handle_pointer(&mut self, event: PointerEvent) {
        let (max_x, max_y) = (
            self.screen.0.saturating_sub(1) as f64,
            self.screen.1.saturating_sub(1) as f64,
        );
        match event {
            PointerEvent::Motion(motion) => {
                self.pointer.0 = (self.pointer.0 + motion.dx()).clamp(0.0, max_x);
                self.pointer.1 = (self.pointer.1 + motion.dy()).clamp(0.0, max_y);
                self.push_motion();
            }
            PointerEvent::MotionAbsolute(motion) => {
                self.pointer.0 = motion.absolute_x_transformed(self.screen.0).clamp(0.0, max_x);
                self.pointer.1 = motion.absolute_y_transformed(self.screen.1).clamp(0.0, max_y);
                self.push_motion();
            }
            PointerEvent::Button(button_event) => {
                let button = match button_event.button() {
                    BTN_LEFT => MouseButton::Left,
                    BTN_RIGHT => MouseButton::Right,
                    BTN_MIDDLE => MouseButton::Middle,
                    other => {
                        log::debug!("[input] ignoring pointer button {:#x}", other);
                        return;
                    }
                };
                let pressed = button_event.button_state() == ButtonState::Pressed;
                self.buttons.set(button.mask(), pressed);
                let (x, y) = self.position();
                self.queue.push_back(InputEvent::Button {
                    x,
                    y,
                    buttons: self.buttons,
                    button,
                    pressed,
                    modifiers: self.modifiers,
                });
            }
            _ => {}
        }
    }

    fn push_motion(&mut self) {
        let (x, y) = self.position();
        self.queue.push_back(InputEvent::Motion {
            x,
            y,
            buttons: self.buttons,
        });
    }

    fn position(&self) -> (i32, i32) {
        (self.pointer.0 as i32, self.pointer.1 as i32)
    }

    pub fn as_fd(&self) -> BorrowedFd<'_> {
        self.libinput.as_fd()
    }
}
