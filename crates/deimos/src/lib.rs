//! Deimos windowing layer: window manager state, layout reporting,
//! dirty-rectangle compositing and the interaction loop that drives them.

pub mod backend;
pub mod bindings;
pub mod compositor;
pub mod config;
pub mod damage;
pub mod desktop;
pub mod discovery;
pub mod input;
pub mod layout;
pub mod platform;
pub mod surface;
pub mod wm;

pub use config::Config;
pub use damage::{DirtyTracker, Rectangle};
pub use desktop::{Desktop, Settings, Step};
pub use layout::{LayoutEngine, LayoutReport, SplitLayout};
pub use platform::{Platform, SlotBuffer, SlotInfo};
pub use surface::{FrameSurface, MemoryScanout, Scanout, SurfaceError};
pub use wm::{WindowId, WindowManager};
