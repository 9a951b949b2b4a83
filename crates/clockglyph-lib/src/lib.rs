//! Clockglyph — companion hour and minute clock icons for the system tray.

pub mod cache;
pub mod clock;
pub mod color;
pub mod coordinator;
pub mod error;
pub mod render;
pub mod schedule;
pub mod settings;
pub mod surface;
pub mod sync;
pub mod updater;

pub use error::ClockglyphError;
