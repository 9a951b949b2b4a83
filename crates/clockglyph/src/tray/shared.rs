//! Shared tray event loop. Platform-specific behavior is injected via the
//! [`PlatformAdapter`] trait.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver};
use std::time::Instant;

use clockglyph_lib::clock::DisplayMode;
use clockglyph_lib::settings::SettingsPatch;
use clockglyph_lib::sync::{self, SyncListener};

use muda::MenuEvent;

use super::state::{self, TrayState};
use crate::RUNNING;

/// Platform-specific hooks that differ between Windows and Linux.
///
/// Each platform implements this trait once; `run_core` provides the
/// shared event loop, settings load, menu build, etc.
pub trait PlatformAdapter {
    /// One-time platform init (GTK, etc.). Called before anything else.
    fn platform_init() -> clockglyph_lib::error::Result<()>;

    /// Pump platform-specific events (Win32 messages, GTK iterations).
    fn pump_events();

    /// Block until the next platform event or a reasonable timeout.
    fn wait_for_events();
}

/// Shared tray event loop.
///
/// Handles settings load, sync listener, menu/icon build, and the main
/// event loop. Platform-specific bits are injected via `P: PlatformAdapter`.
pub fn run_core<P: PlatformAdapter>(
    mode: DisplayMode,
    settings_path: Option<PathBuf>,
) -> clockglyph_lib::error::Result<()> {
    P::platform_init()?;

    let (mut state, warnings) = TrayState::init(mode, settings_path);
    state::show_startup_warnings(&warnings);

    // Build tray menu and icon
    let (menu, tray_menu) = state::build_tray_menu(mode, &state.settings);
    let tray = state::build_tray_icon(mode, menu)?;

    // Settings pushed by the companion arrive on this channel.
    let (tx, rx): (mpsc::Sender<SettingsPatch>, Receiver<SettingsPatch>) = mpsc::channel();
    let _listener = match SyncListener::bind(sync::listen_addr(mode), tx) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("[sync] {e}; settings from the companion will not be received");
            None
        }
    };

    let menu_rx = MenuEvent::receiver();

    loop {
        if !RUNNING.load(Ordering::SeqCst) {
            break;
        }

        // 1. Platform event pump
        P::pump_events();

        // 2. Settings from the companion (non-blocking)
        while let Ok(patch) = rx.try_recv() {
            if state.apply_remote_patch(&patch) {
                tray_menu.sync_with(&state.settings);
            }
        }

        // 3. Settings edited on disk
        if state.reload_if_changed() {
            tray_menu.sync_with(&state.settings);
        }

        // 4. Menu events
        while let Ok(event) = menu_rx.try_recv() {
            if state::handle_menu_event(&event, &tray_menu, &mut state) {
                RUNNING.store(false, Ordering::SeqCst);
                break;
            }
        }

        // 5. Redraw when due
        let now_wall = chrono::Local::now().naive_local();
        if let Some(outcome) = state.tick(now_wall, Instant::now()) {
            state::apply_outcome(&outcome, mode, &tray, &tray_menu);
        }

        // 6. Wait for events (platform-specific sleep/block)
        P::wait_for_events();
    }

    RUNNING.store(false, Ordering::SeqCst);
    log::info!("{mode} tray exiting");
    Ok(())
}
