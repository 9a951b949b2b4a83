//! Tray menu construction and notifications.

use clockglyph_lib::clock::DisplayMode;
use clockglyph_lib::settings::{MAX_RECENT_COLORS, Settings};

use muda::{CheckMenuItem, Menu, MenuId, MenuItem, PredefinedMenuItem, Submenu};

use super::icon::initial_icon;

// ── Shared menu construction ──

/// All menu items the tray uses, returned from `build_tray_menu`.
pub struct TrayMenu {
    pub status_item: MenuItem,
    pub format_24h_item: CheckMenuItem,
    pub leading_zero_item: CheckMenuItem,
    pub custom_color_item: CheckMenuItem,
    /// One fixed slot per recent color; unused slots are disabled.
    pub recent_items: Vec<MenuItem>,
    pub sync_item: MenuItem,
    pub quit_item: MenuItem,
}

impl TrayMenu {
    /// Bring check marks and recent-color slots in line with `settings`.
    pub fn sync_with(&self, settings: &Settings) {
        self.format_24h_item
            .set_checked(settings.use_24_hour_format);
        self.leading_zero_item
            .set_checked(settings.show_leading_zero);
        self.custom_color_item
            .set_checked(settings.use_custom_color);
        self.custom_color_item
            .set_text(format!("Use Custom Color ({})", settings.custom_color));

        for (i, item) in self.recent_items.iter().enumerate() {
            match settings.recent_colors.get(i) {
                Some(hex) => {
                    item.set_text(hex);
                    item.set_enabled(true);
                }
                None => {
                    item.set_text("(empty)");
                    item.set_enabled(false);
                }
            }
        }
    }

    /// Which recent-color slot `id` belongs to, if any.
    pub fn recent_index(&self, id: &MenuId) -> Option<usize> {
        self.recent_items.iter().position(|item| item.id() == id)
    }

    pub fn set_status(&self, text: &str) {
        self.status_item.set_text(text);
    }
}

/// Build the tray context menu with all standard items.
pub fn build_tray_menu(mode: DisplayMode, settings: &Settings) -> (Menu, TrayMenu) {
    let menu = Menu::new();
    let status_item = MenuItem::new(status_label(mode, "starting"), false, None);
    let format_24h_item = CheckMenuItem::new("24-Hour Clock", true, false, None);
    let leading_zero_item = CheckMenuItem::new("Leading Zero", true, false, None);
    let custom_color_item = CheckMenuItem::new("Use Custom Color", true, false, None);
    let recent_menu = Submenu::new("Recent Colors", true);
    let recent_items: Vec<MenuItem> = (0..MAX_RECENT_COLORS)
        .map(|_| MenuItem::new("(empty)", false, None))
        .collect();
    for item in &recent_items {
        let _ = recent_menu.append(item);
    }
    let sync_item = MenuItem::new(
        format!("Sync to {} Icon", capitalized(mode.companion())),
        true,
        None,
    );
    let quit_item = MenuItem::new("Quit", true, None);

    let _ = menu.append(&status_item);
    let _ = menu.append(&PredefinedMenuItem::separator());
    let _ = menu.append(&format_24h_item);
    let _ = menu.append(&leading_zero_item);
    let _ = menu.append(&PredefinedMenuItem::separator());
    let _ = menu.append(&custom_color_item);
    let _ = menu.append(&recent_menu);
    let _ = menu.append(&PredefinedMenuItem::separator());
    let _ = menu.append(&sync_item);
    let _ = menu.append(&PredefinedMenuItem::separator());
    let _ = menu.append(&quit_item);

    let tray_menu = TrayMenu {
        status_item,
        format_24h_item,
        leading_zero_item,
        custom_color_item,
        recent_items,
        sync_item,
        quit_item,
    };
    tray_menu.sync_with(settings);
    (menu, tray_menu)
}

/// Build the tray icon showing the placeholder until the first render.
pub fn build_tray_icon(
    mode: DisplayMode,
    menu: Menu,
) -> clockglyph_lib::error::Result<tray_icon::TrayIcon> {
    tray_icon::TrayIconBuilder::new()
        .with_tooltip(format!("Clockglyph ({mode})"))
        .with_icon(initial_icon()?)
        .with_menu(Box::new(menu))
        .build()
        .map_err(|e| {
            clockglyph_lib::ClockglyphError::Config(format!("Failed to create tray icon: {e}"))
        })
}

pub(super) fn status_label(mode: DisplayMode, detail: &str) -> String {
    format!("{} icon: {detail}", capitalized(mode))
}

fn capitalized(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::Hour => "Hour",
        DisplayMode::Minute => "Minute",
    }
}

/// Show settings warnings as a desktop notification.
pub(crate) fn show_startup_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    let body = warnings.join("\n");
    show_notification(&format!("Settings warnings:\n{body}"));
}

/// Show a desktop notification with the given body text.
pub(crate) fn show_notification(body: &str) {
    let mut n = notify_rust::Notification::new();
    n.summary("Clockglyph");
    n.body(body);
    let _ = n.show();
}
