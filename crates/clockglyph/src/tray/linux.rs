//! Linux system tray — GTK event loop.

use std::path::PathBuf;

use clockglyph_lib::ClockglyphError;
use clockglyph_lib::clock::DisplayMode;

use super::shared::{self, PlatformAdapter};

pub struct LinuxAdapter;

impl PlatformAdapter for LinuxAdapter {
    fn platform_init() -> clockglyph_lib::error::Result<()> {
        gtk::init().map_err(|e| ClockglyphError::Config(format!("Failed to initialize GTK: {e}")))?;
        // Periodic wakeup so `gtk::main_iteration_do(true)` returns at least
        // every 50ms, keeping the loop responsive to sync messages and the
        // minute boundary.
        gtk::glib::timeout_add_local(std::time::Duration::from_millis(50), || {
            gtk::glib::ControlFlow::Continue
        });
        Ok(())
    }

    fn pump_events() {
        while gtk::events_pending() {
            gtk::main_iteration_do(false);
        }
    }

    fn wait_for_events() {
        // The 50ms timer registered in platform_init() bounds this wait.
        gtk::main_iteration_do(true);
    }
}

pub fn run(mode: DisplayMode, settings_path: Option<PathBuf>) -> clockglyph_lib::error::Result<()> {
    shared::run_core::<LinuxAdapter>(mode, settings_path)
}
