//! Tray icon conversion and updates.

use clockglyph_lib::ClockglyphError;
use clockglyph_lib::clock::DisplayMode;
use clockglyph_lib::render::{Bitmap, RenderError};
use clockglyph_lib::updater::UpdateOutcome;

use tray_icon::Icon;

use super::menu::{TrayMenu, status_label};

/// Convert a rendered bitmap into a tray icon.
pub fn to_icon(bitmap: &Bitmap) -> clockglyph_lib::error::Result<Icon> {
    Icon::from_rgba(bitmap.rgba().to_vec(), bitmap.width(), bitmap.height()).map_err(|e| {
        ClockglyphError::Render(RenderError::Surface(format!("tray icon: {e}")))
    })
}

/// Placeholder shown until the first render completes.
pub fn initial_icon() -> clockglyph_lib::error::Result<Icon> {
    to_icon(&Bitmap::fallback())
}

/// Show a new update outcome in the tray.
pub fn apply_outcome(
    outcome: &UpdateOutcome,
    mode: DisplayMode,
    tray: &tray_icon::TrayIcon,
    menu: &TrayMenu,
) {
    match to_icon(&outcome.bitmap) {
        Ok(icon) => {
            tray.set_icon(Some(icon)).ok();
        }
        Err(e) => log::warn!("[tray] {e}"),
    }
    tray.set_tooltip(Some(&outcome.tooltip)).ok();
    let detail = if outcome.rendered {
        outcome.tooltip.clone()
    } else {
        format!("{} (render failed)", outcome.tooltip)
    };
    menu.set_status(&status_label(mode, &detail));
}
