pub mod color;
pub mod font;
pub mod logging;
pub mod paths;

pub use color::{parse_color, rgb};
pub use font::Font;
pub use logging::{FileLogger, StderrLogger};
pub use paths::{config_dir, data_dir, deimos_config_dir, deimos_data_dir, deimos_log_dir, deimos_runtime_dir, runtime_dir};
