//! What the icon shows — display mode, icon text, cache key and tooltip.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::render::{Align, RenderRequest};
use crate::settings::Settings;

/// Which half of the clock an instance displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Hour,
    Minute,
}

impl DisplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DisplayMode::Hour => "hour",
            DisplayMode::Minute => "minute",
        }
    }

    /// The mode the companion instance runs in.
    pub fn companion(self) -> DisplayMode {
        match self {
            DisplayMode::Hour => DisplayMode::Minute,
            DisplayMode::Minute => DisplayMode::Hour,
        }
    }

    /// Text placement: the hour hugs the right edge and the minute the left,
    /// so two adjacent tray icons read as one clock.
    pub fn align(self) -> Align {
        match self {
            DisplayMode::Hour => Align::Right,
            DisplayMode::Minute => Align::Left,
        }
    }

    /// Seconds per displayed slot.
    pub fn slot_seconds(self) -> i64 {
        match self {
            DisplayMode::Hour => 3600,
            DisplayMode::Minute => 60,
        }
    }

    /// Index of the hour or minute containing `now`. Changes exactly at a boundary.
    pub fn slot(self, now: NaiveDateTime) -> i64 {
        now.and_utc().timestamp().div_euclid(self.slot_seconds())
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" | "hours" => Ok(DisplayMode::Hour),
            "minute" | "minutes" => Ok(DisplayMode::Minute),
            other => Err(format!("unknown mode \"{other}\" (use hour or minute)")),
        }
    }
}

/// Icon text for `now`: the hour (12- or 24-hour clock) or the minute.
pub fn display_text(mode: DisplayMode, now: NaiveDateTime, settings: &Settings) -> String {
    let value = match mode {
        DisplayMode::Hour if settings.use_24_hour_format => now.hour(),
        DisplayMode::Hour => now.hour12().1,
        DisplayMode::Minute => now.minute(),
    };
    if settings.show_leading_zero {
        format!("{value:02}")
    } else {
        value.to_string()
    }
}

/// Tooltip time text: `14:05` on the 24-hour clock, `2:05 PM` otherwise.
pub fn tooltip_text(now: NaiveDateTime, use_24_hour_format: bool) -> String {
    if use_24_hour_format {
        now.format("%H:%M").to_string()
    } else {
        now.format("%-I:%M %p").to_string()
    }
}

/// Deterministic key identifying one renderable icon.
pub fn cache_key(text: &str, color: &str, mode: DisplayMode, settings: &Settings) -> String {
    format!(
        "{text}|{color}|{mode}|{}|{}",
        if settings.use_24_hour_format { "24h" } else { "12h" },
        if settings.show_leading_zero { "lz" } else { "nz" },
    )
}

/// Everything needed to draw and present one icon.
#[derive(Debug, Clone, PartialEq)]
pub struct IconSpec {
    pub mode: DisplayMode,
    pub text: String,
    pub color: String,
    pub cache_key: String,
    pub tooltip: String,
    pub slot: i64,
}

impl IconSpec {
    pub fn for_time(mode: DisplayMode, settings: &Settings, now: NaiveDateTime) -> Self {
        let text = display_text(mode, now, settings);
        let color = settings.display_color();
        let cache_key = cache_key(&text, &color, mode, settings);
        IconSpec {
            mode,
            tooltip: tooltip_text(now, settings.use_24_hour_format),
            slot: mode.slot(now),
            text,
            color,
            cache_key,
        }
    }

    pub fn to_request(&self) -> RenderRequest {
        RenderRequest {
            text: self.text.clone(),
            color: self.color.clone(),
            cache_key: self.cache_key.clone(),
            align: self.mode.align(),
        }
    }
}
