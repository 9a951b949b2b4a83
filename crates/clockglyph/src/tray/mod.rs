//! System tray — platform-specific event loops and shared state.

mod shared;
pub(crate) mod state;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(windows)]
mod windows;

use std::path::PathBuf;

use clockglyph_lib::clock::DisplayMode;

/// Run the tray for `mode` until quit. One instance per mode.
pub fn run(mode: DisplayMode, settings_path: Option<PathBuf>) -> clockglyph_lib::error::Result<()> {
    let instance = single_instance::SingleInstance::new(&format!("clockglyph-{mode}")).map_err(|e| {
        clockglyph_lib::ClockglyphError::Config(format!("Failed to create instance lock: {e}"))
    })?;

    if !instance.is_single() {
        log::warn!("Another {mode} instance of Clockglyph is already running.");
        state::show_notification(&format!("The {mode} icon is already running."));
        return Ok(());
    }

    // `instance` stays alive for the duration of run(), holding the lock.
    #[cfg(windows)]
    {
        windows::run(mode, settings_path)
    }

    #[cfg(target_os = "linux")]
    {
        linux::run(mode, settings_path)
    }
}
