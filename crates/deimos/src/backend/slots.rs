use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid as NixPid;
use std::fs::File;
use std::io::Read;
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use crate::discovery::MAX_SLOTS;
use crate::input::InputEvent;
use crate::platform::{SlotBuffer, SlotInfo};
use crate::wm::Pid;

/// "DEMS"
pub const SLOT_MAGIC: u32 = 0x4445_4D53;
pub const HEADER_WORDS: usize = 8;
pub const HEADER_BYTES: usize = HEADER_WORDS * 4;

/// Parsed slot file header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SlotHeader {
    pub active: bool,
    pub width: u32,
    pub height: u32,
    pub pid: i32,
    pub generation: u32,
}

impl SlotHeader {
    pub fn parse(bytes: &[u8; HEADER_BYTES]) -> Option<Self> {
        let word = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        if word(0) != SLOT_MAGIC {
            return None;
        }
        Some(SlotHeader {
            active: word(1) != 0,
            width: word(2),
            height: word(3),
            pid: word(4) as i32,
            generation: word(5),
        })
    }

    pub fn encode(&self) -> [u8; HEADER_BYTES] {
        let words = [
            SLOT_MAGIC,
            self.active as u32,
            self.width,
            self.height,
            self.pid as u32,
            self.generation,
            0,
            0,
        ];
        let mut out = [0u8; HEADER_BYTES];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    pub fn pixel_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

fn process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    match kill(NixPid::from_raw(pid), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Read-only shared mapping of a slot file.
pub struct MappedSlot {
    file: File,
    base: NonNull<libc::c_void>,
    len: usize,
    width: usize,
    height: usize,
}

impl MappedSlot {
    fn map(path: &Path, header: &SlotHeader) -> Result<Self, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let len = HEADER_BYTES + header.pixel_bytes();
        let file_len = file.metadata()?.len() as usize;
        if file_len < len {
            return Err(format!("slot file holds {} bytes, header needs {}", file_len, len).into());
        }

        // SAFETY: fresh read-only mapping of a file we hold open; the length
        // was checked against the file size above.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error().into());
        }
        let base = NonNull::new(ptr).ok_or("mmap returned null")?;

        Ok(MappedSlot {
            file,
            base,
            len,
            width: header.width as usize,
            height: header.height as usize,
        })
    }
}

impl SlotBuffer for MappedSlot {
    fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn pixels(&self) -> &[u32] {
        // Pages past a truncated end of file fault on access.
        let covered = self
            .file
            .metadata()
            .is_ok_and(|m| m.len() >= self.len as u64);
        if !covered {
            return &[];
        }
        // SAFETY: the mapping is page aligned and spans the header plus
        // width*height words; the writer may race us, which only tears.
        unsafe {
            let start = (self.base.as_ptr() as *const u8).add(HEADER_BYTES) as *const u32;
            std::slice::from_raw_parts(start, self.width * self.height)
        }
    }
}

impl Drop for MappedSlot {
    fn drop(&mut self) {
        // SAFETY: base/len describe the mapping created in `map`.
        unsafe {
            libc::munmap(self.base.as_ptr(), self.len);
        }
    }
}

/// The directory of `win-<N>` slot files shared with applications.
pub struct SlotDirectory {
    dir: PathBuf,
    generations: [Option<u32>; MAX_SLOTS],
    socket: Option<UnixDatagram>,
}

impl SlotDirectory {
    pub fn new(dir: PathBuf) -> Self {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            log::warn!("[slots] cannot create {}: {}", dir.display(), e);
        }
        let socket = match UnixDatagram::unbound() {
            Ok(socket) => {
                if let Err(e) = socket.set_nonblocking(true) {
                    log::warn!("[slots] cannot make event socket non-blocking: {}", e);
                }
                Some(socket)
            }
            Err(e) => {
                log::warn!("[slots] event socket unavailable: {}", e);
                None
            }
        };
        log::info!("[slots] watching {}", dir.display());
        SlotDirectory {
            dir,
            generations: [None; MAX_SLOTS],
            socket,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, slot: usize) -> PathBuf {
        self.dir.join(format!("win-{}", slot))
    }

    pub fn socket_path(&self, slot: usize) -> PathBuf {
        self.dir.join(format!("win-{}.sock", slot))
    }

    /// Header plus the current file length.
    fn read_header(&self, slot: usize) -> Option<(SlotHeader, u64)> {
        let mut file = File::open(self.slot_path(slot)).ok()?;
        let mut bytes = [0u8; HEADER_BYTES];
        file.read_exact(&mut bytes).ok()?;
        let len = file.metadata().ok()?.len();
        SlotHeader::parse(&bytes).map(|header| (header, len))
    }

    pub fn info(&mut self, slot: usize) -> Option<SlotInfo> {
        if slot >= MAX_SLOTS {
            return None;
        }
        let (header, file_len) = match self.read_header(slot) {
            Some((header, len)) if header.active && process_alive(header.pid) => (header, len),
            _ => {
                self.generations[slot] = None;
                return Some(SlotInfo::default());
            }
        };

        let content_dirty = self.generations[slot].is_some_and(|g| g != header.generation);
        self.generations[slot] = Some(header.generation);

        // A file shorter than its header claims is not ready yet; report no
        // size so the old mapping is dropped and nothing is read from it.
        let ready = file_len >= (HEADER_BYTES + header.pixel_bytes()) as u64;
        if !ready {
            log::debug!("[slots] slot {} file is short ({} bytes)", slot, file_len);
        }
        let (width, height) = if ready {
            (header.width, header.height)
        } else {
            (0, 0)
        };

        Some(SlotInfo {
            active: true,
            width,
            height,
            owner: Some(header.pid),
            content_dirty,
        })
    }

    pub fn map(&mut self, slot: usize) -> Option<Box<dyn SlotBuffer>> {
        let (header, _) = self.read_header(slot)?;
        if header.width == 0 || header.height == 0 {
            return None;
        }
        match MappedSlot::map(&self.slot_path(slot), &header) {
            Ok(mapped) => Some(Box::new(mapped)),
            Err(e) => {
                log::warn!("[slots] failed to map slot {}: {}", slot, e);
                None
            }
        }
    }

    pub fn send(&self, slot: usize, event: &InputEvent) -> bool {
        let Some(socket) = self.socket.as_ref() else {
            return false;
        };
        let mut line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                log::warn!("[slots] cannot encode event: {}", e);
                return false;
            }
        };
        line.push('\n');
        match socket.send_to(line.as_bytes(), self.socket_path(slot)) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("[slots] event for slot {} dropped: {}", slot, e);
                false
            }
        }
    }
}
