//! Shared tray state and business logic — used by both Windows and Linux tray apps.
//!
//! Platform-specific event loops live in `windows.rs` / `linux.rs`.
//! This module provides:
//! - Core `TrayState` (settings store, watcher, icon updater, companion sync)
//! - Menu + tray icon construction (`build_tray_menu`, `build_tray_icon`)
//! - Menu event handling (`handle_menu_event`)

mod icon;
mod menu;

pub use icon::apply_outcome;
pub(crate) use menu::{show_notification, show_startup_warnings};
pub use menu::{TrayMenu, build_tray_icon, build_tray_menu};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDateTime;
use clockglyph_lib::clock::DisplayMode;
use clockglyph_lib::coordinator::DrawCoordinator;
use clockglyph_lib::settings::{Settings, SettingsPatch, SettingsWatcher};
use clockglyph_lib::surface::{OffscreenSurface, RenderTransport};
use clockglyph_lib::sync;
use clockglyph_lib::updater::{IconUpdater, UpdateOutcome};

use muda::MenuEvent;

// ── Shared tray state ──

/// Platform-independent tray application state for one display mode.
pub struct TrayState<T: RenderTransport = OffscreenSurface> {
    pub mode: DisplayMode,
    pub settings: Settings,
    settings_path: Option<PathBuf>,
    watcher: Option<SettingsWatcher>,
    companion: Option<SocketAddr>,
    pub updater: IconUpdater<T>,
}

impl TrayState {
    /// Load settings for `mode` and prepare the offscreen render surface.
    ///
    /// Returns the state plus any settings warnings to show the user.
    pub fn init(mode: DisplayMode, settings_path: Option<PathBuf>) -> (Self, Vec<String>) {
        let updater = IconUpdater::new(mode, DrawCoordinator::new(OffscreenSurface::default()));
        Self::with_updater(
            mode,
            settings_path.or_else(|| Settings::path(mode)),
            Some(sync::companion_addr(mode)),
            updater,
        )
    }
}

impl<T: RenderTransport> TrayState<T> {
    pub fn with_updater(
        mode: DisplayMode,
        settings_path: Option<PathBuf>,
        companion: Option<SocketAddr>,
        updater: IconUpdater<T>,
    ) -> (Self, Vec<String>) {
        let (settings, warnings) = match settings_path.as_deref() {
            Some(path) => Settings::load_from(path),
            None => (Settings::default(), vec![]),
        };
        for w in &warnings {
            log::warn!("[settings] {w}");
        }
        let watcher = settings_path.clone().map(SettingsWatcher::new);
        (
            TrayState {
                mode,
                settings,
                settings_path,
                watcher,
                companion,
                updater,
            },
            warnings,
        )
    }

    /// Redraw if an update is due.
    pub fn tick(&mut self, now_wall: NaiveDateTime, now: Instant) -> Option<UpdateOutcome> {
        self.updater
            .tick(&self.settings, now_wall, now)
            .map(|(_, outcome)| outcome)
    }

    /// Apply settings received from the companion. Saved, never forwarded.
    pub fn apply_remote_patch(&mut self, patch: &SettingsPatch) -> bool {
        if !self.settings.apply_patch(patch) {
            return false;
        }
        log::info!("[sync] settings updated by companion");
        self.persist();
        self.updater.settings_changed();
        true
    }

    /// Pick up edits made to our settings file by another process (e.g. the CLI).
    pub fn reload_if_changed(&mut self) -> bool {
        let Some(fresh) = self.watcher.as_mut().and_then(SettingsWatcher::poll) else {
            return false;
        };
        if fresh == self.settings {
            return false;
        }
        log::info!("[settings] reloaded from disk");
        self.settings = fresh;
        self.updater.settings_changed();
        true
    }

    /// Change settings locally: save, redraw, and push to the companion.
    pub fn change_local(&mut self, change: impl FnOnce(&mut Settings)) -> bool {
        let before = self.settings.clone();
        change(&mut self.settings);
        if self.settings == before {
            return false;
        }
        self.persist();
        self.updater.settings_changed();
        self.push_to_companion();
        true
    }

    /// Send the full settings record to the companion on a background thread.
    pub fn push_to_companion(&self) {
        let Some(addr) = self.companion else {
            return;
        };
        let patch = self.settings.to_patch();
        std::thread::spawn(move || {
            if let Err(e) = sync::send_to_companion(addr, &patch) {
                log::warn!("[sync] {e}");
            }
        });
    }

    fn persist(&mut self) {
        let Some(ref path) = self.settings_path else {
            return;
        };
        if let Err(e) = self.settings.save_to(path) {
            log::error!("[settings] could not save {}: {e}", path.display());
            return;
        }
        if let Some(ref mut watcher) = self.watcher {
            watcher.mark_seen();
        }
    }
}

/// Handle a menu event from the tray context menu.
///
/// Returns `true` if the event was a quit request.
pub fn handle_menu_event<T: RenderTransport>(
    event: &MenuEvent,
    menu: &TrayMenu,
    state: &mut TrayState<T>,
) -> bool {
    if event.id() == menu.quit_item.id() {
        return true;
    } else if event.id() == menu.format_24h_item.id() {
        state.change_local(|s| s.use_24_hour_format = !s.use_24_hour_format);
    } else if event.id() == menu.leading_zero_item.id() {
        state.change_local(|s| s.show_leading_zero = !s.show_leading_zero);
    } else if event.id() == menu.custom_color_item.id() {
        state.change_local(|s| s.use_custom_color = !s.use_custom_color);
    } else if event.id() == menu.sync_item.id() {
        state.push_to_companion();
    } else if let Some(index) = menu.recent_index(event.id())
        && let Some(hex) = state.settings.recent_colors.get(index).cloned()
    {
        state.change_local(|s| {
            if let Err(e) = s.set_custom_color(&hex) {
                log::warn!("[settings] {e}");
            }
        });
    }
    // Check items toggle themselves; re-sync them with the real settings.
    menu.sync_with(&state.settings);
    false
}
