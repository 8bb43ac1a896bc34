use std::path::PathBuf;

pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg_config);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config");
    }
    PathBuf::from("/tmp")
}

pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg_data);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from("/tmp")
}

pub fn runtime_dir() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir);
    }
    PathBuf::from("/tmp").join(format!("deimos-{}", unsafe { libc::getuid() }))
}

pub fn deimos_config_dir() -> PathBuf {
    config_dir().join("deimos")
}

pub fn deimos_data_dir() -> PathBuf {
    data_dir().join("deimos")
}

pub fn deimos_log_dir() -> PathBuf {
    deimos_data_dir().join("logs")
}

/// Directory holding the shared-memory window slots.
pub fn deimos_runtime_dir() -> PathBuf {
    runtime_dir().join("deimos")
}
