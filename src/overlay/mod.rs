pub mod capture;
pub mod composite;
pub mod engine;
pub mod focus;
pub mod gesture;
pub mod keyboard_hook;
pub mod monitor;
pub mod platform;
pub mod state;
pub mod window;
pub mod worker;

pub use engine::{EngineConfig, OverlayEngine, TickReport};
pub use window::OverlayWindow;
