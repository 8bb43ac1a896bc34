use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::paths::deimos_log_dir;

fn level_char(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}

/// A freshly numbered `session-N` directory with its two log files.
struct Session {
    number: u32,
    dir: PathBuf,
    info: File,
    debug: File,
}

impl Session {
    fn create(log_dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(log_dir)?;
        let number = next_session_number(log_dir);
        let dir = log_dir.join(format!("session-{}", number));
        fs::create_dir_all(&dir)?;

        let open = |name: &str| {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(dir.join(name))
        };
        let info = open("deimos.log")?;
        let debug = open("deimos.dbg.log")?;

        Ok(Session { number, dir, info, debug })
    }
}

/// Per-session file logger: `deimos.log` gets info and above, `deimos.dbg.log`
/// gets debug and trace. Every line is mirrored to stderr.
pub struct FileLogger {
    info: Mutex<File>,
    debug: Mutex<File>,
}

impl FileLogger {
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let session = Session::create(&deimos_log_dir())?;

        let logger = FileLogger {
            info: Mutex::new(session.info),
            debug: Mutex::new(session.debug),
        };
        log::set_max_level(LevelFilter::Debug);
        log::set_logger(Box::leak(Box::new(logger)))
            .map_err(|e| format!("Failed to set logger: {}", e))?;

        log::info!(
            "Deimos session {} started {} (logs in {})",
            session.number,
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            session.dir.display()
        );
        Ok(())
    }

    fn sink(&self, level: Level) -> &Mutex<File> {
        match level {
            Level::Debug | Level::Trace => &self.debug,
            _ => &self.info,
        }
    }
}

fn next_session_number(log_dir: &Path) -> u32 {
    let highest = fs::read_dir(log_dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|entry| parse_session_name(&entry.file_name().to_string_lossy()))
        .max()
        .unwrap_or(0);
    highest + 1
}

fn parse_session_name(name: &str) -> Option<u32> {
    name.strip_prefix("session-")?.parse::<u32>().ok()
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Debug
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let stamp = Local::now().format("%H:%M:%S%.3f");
        let line = format!("{} {} {}\n", stamp, record.target(), record.args());

        if let Ok(mut file) = self.sink(record.level()).lock() {
            let _ = file.write_all(line.as_bytes()).and_then(|_| file.flush());
        }
        eprint!("{} {} {}", stamp, level_char(record.level()), line);
    }

    fn flush(&self) {
        for sink in [&self.info, &self.debug] {
            if let Ok(mut file) = sink.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Fallback used when the log directory is not writable.
pub struct StderrLogger;

impl StderrLogger {
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        log::set_max_level(LevelFilter::Info);
        log::set_logger(&StderrLogger).map_err(|e| format!("Failed to set logger: {}", e))?;
        Ok(())
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%H:%M:%S%.3f");
        eprintln!(
            "{} {} {} {}",
            timestamp,
            level_char(record.level()),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}
