//! User settings — TOML-based, one file per display mode.
//!
//! Each tray instance owns its own settings file. Companions keep each other
//! up to date through [`crate::sync`], exchanging [`SettingsPatch`] records.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::clock::DisplayMode;
use crate::color;

/// Header comment prepended to saved settings files.
const SETTINGS_HEADER: &str =
    "# Clockglyph settings — changes made outside the app may be overwritten.\n\n";

/// Maximum number of entries kept in `recent_colors`.
pub const MAX_RECENT_COLORS: usize = 5;

/// Icon color used when no custom color is enabled.
pub const DEFAULT_ICON_COLOR: &str = "white";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Draw the icon in `custom_color` instead of the default color.
    #[serde(default)]
    pub use_custom_color: bool,

    /// Custom icon color, `#RRGGBB`. Default: "#FFFFFF".
    #[serde(default = "default_custom_color")]
    pub custom_color: String,

    /// Show hours 0–23 instead of 1–12.
    #[serde(default)]
    pub use_24_hour_format: bool,

    /// Pad single-digit values with a leading zero ("09" instead of "9").
    #[serde(default)]
    pub show_leading_zero: bool,

    /// Recently chosen custom colors, most recent first, at most five.
    #[serde(default)]
    pub recent_colors: Vec<String>,
}

fn default_custom_color() -> String {
    "#FFFFFF".into()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            use_custom_color: false,
            custom_color: default_custom_color(),
            use_24_hour_format: false,
            show_leading_zero: false,
            recent_colors: Vec::new(),
        }
    }
}

/// Partial settings record exchanged between companions.
///
/// Field names follow the companion wire format (camelCase). Absent fields
/// leave the receiver's value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_custom_color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_color: Option<String>,
    #[serde(
        default,
        rename = "use24HourFormat",
        skip_serializing_if = "Option::is_none"
    )]
    pub use_24_hour_format: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_leading_zero: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_colors: Option<Vec<String>>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == SettingsPatch::default()
    }
}

/// Validation errors that [`Settings::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `custom_color` is not a valid hex color.
    InvalidColor(String),
    /// A `recent_colors` entry is not a valid hex color.
    InvalidRecentColor(String),
    /// `recent_colors` holds more than [`MAX_RECENT_COLORS`] entries.
    TooManyRecentColors(usize),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidColor(c) => write!(f, "Invalid custom color: {c}"),
            ValidationError::InvalidRecentColor(c) => write!(f, "Invalid recent color: {c}"),
            ValidationError::TooManyRecentColors(n) => write!(
                f,
                "Too many recent colors: {n} (max {MAX_RECENT_COLORS})"
            ),
        }
    }
}

/// Normalize, deduplicate and truncate a recent-colors list. Invalid entries are dropped.
fn clean_recent_colors(colors: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(MAX_RECENT_COLORS);
    for c in colors.iter().filter_map(|c| color::normalize_hex(c)) {
        if !cleaned.contains(&c) {
            cleaned.push(c);
        }
        if cleaned.len() == MAX_RECENT_COLORS {
            break;
        }
    }
    cleaned
}

impl Settings {
    /// Platform-specific settings directory.
    pub fn dir() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            dirs::config_dir().map(|p| p.join("Clockglyph"))
        }
        #[cfg(not(windows))]
        {
            dirs::config_dir().map(|p| p.join("clockglyph"))
        }
    }

    /// Full path to the settings file of `mode`.
    pub fn path(mode: DisplayMode) -> Option<PathBuf> {
        Self::dir().map(|d| d.join(format!("{mode}.toml")))
    }

    /// Full path to the tray log file of `mode`.
    pub fn log_path(mode: DisplayMode) -> Option<PathBuf> {
        Self::dir().map(|d| d.join(format!("clockglyph-{mode}.log")))
    }

    /// Load settings for `mode`, or return defaults if not found.
    pub fn load(mode: DisplayMode) -> Self {
        let Some(path) = Self::path(mode) else {
            return Self::default();
        };
        let (settings, warnings) = Self::load_from(&path);
        for w in &warnings {
            log::warn!("{w}");
        }
        settings
    }

    /// Load settings from an arbitrary path, returning the settings and any warnings.
    ///
    /// Returns `(defaults, [])` if the file doesn't exist.
    /// Returns `(defaults, [warning])` if the file exists but can't be parsed.
    /// Invalid values are repaired and reported as warnings.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return (Self::default(), vec![]),
        };
        let mut settings: Settings = match toml::from_str(&contents) {
            Ok(settings) => settings,
            Err(e) => {
                let warning = format!(
                    "settings parse error ({}), using defaults: {e}",
                    path.display()
                );
                return (Self::default(), vec![warning]);
            }
        };
        let warnings = match settings.validate() {
            Ok(()) => vec![],
            Err(errors) => {
                settings.repair();
                errors.iter().map(ToString::to_string).collect()
            }
        };
        (settings, warnings)
    }

    /// Save settings to an arbitrary path atomically (write to temp file, then rename).
    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let serialized = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        let contents = format!("{SETTINGS_HEADER}{serialized}");
        let tmp = path.with_extension("toml.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems; fall back to direct write + cleanup
                let result = std::fs::write(path, &contents);
                let _ = std::fs::remove_file(&tmp);
                result
            }
        }
    }

    /// Save settings to the default platform path of `mode`.
    pub fn save(&self, mode: DisplayMode) -> std::io::Result<()> {
        let Some(path) = Self::path(mode) else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ));
        };
        self.save_to(&path)
    }

    /// Validate all fields, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if color::normalize_hex(&self.custom_color).is_none() {
            errors.push(ValidationError::InvalidColor(self.custom_color.clone()));
        }
        for c in &self.recent_colors {
            if color::normalize_hex(c).is_none() {
                errors.push(ValidationError::InvalidRecentColor(c.clone()));
            }
        }
        if self.recent_colors.len() > MAX_RECENT_COLORS {
            errors.push(ValidationError::TooManyRecentColors(self.recent_colors.len()));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Replace invalid values with something usable.
    fn repair(&mut self) {
        self.custom_color =
            color::normalize_hex(&self.custom_color).unwrap_or_else(default_custom_color);
        self.recent_colors = clean_recent_colors(&self.recent_colors);
    }

    /// The color the icon should be drawn in right now.
    pub fn display_color(&self) -> String {
        if self.use_custom_color
            && let Some(hex) = color::normalize_hex(&self.custom_color)
        {
            return hex;
        }
        DEFAULT_ICON_COLOR.to_string()
    }

    /// Put `hex` at the front of the recent colors, removing any earlier
    /// occurrence and dropping the oldest entry beyond the limit.
    ///
    /// Returns `false` (and changes nothing) if `hex` is not a valid color.
    pub fn add_recent_color(&mut self, hex: &str) -> bool {
        let Some(hex) = color::normalize_hex(hex) else {
            return false;
        };
        self.recent_colors
            .retain(|c| color::normalize_hex(c).as_deref() != Some(hex.as_str()));
        self.recent_colors.insert(0, hex);
        self.recent_colors.truncate(MAX_RECENT_COLORS);
        true
    }

    /// Enable the custom color and record it in the recent colors.
    pub fn set_custom_color(&mut self, hex: &str) -> crate::error::Result<()> {
        let normalized = color::normalize_hex(hex).ok_or_else(|| {
            crate::ClockglyphError::Color(format!("Invalid color: {hex} (use #RGB or #RRGGBB)"))
        })?;
        self.use_custom_color = true;
        self.add_recent_color(&normalized);
        self.custom_color = normalized;
        Ok(())
    }

    /// The full record as a patch, for pushing everything to the companion.
    pub fn to_patch(&self) -> SettingsPatch {
        SettingsPatch {
            use_custom_color: Some(self.use_custom_color),
            custom_color: Some(self.custom_color.clone()),
            use_24_hour_format: Some(self.use_24_hour_format),
            show_leading_zero: Some(self.show_leading_zero),
            recent_colors: Some(self.recent_colors.clone()),
        }
    }

    /// Apply the fields present in `patch`. Returns whether anything changed.
    ///
    /// An invalid `custom_color` is ignored; invalid recent colors are dropped.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) -> bool {
        let before = self.clone();
        if let Some(v) = patch.use_custom_color {
            self.use_custom_color = v;
        }
        if let Some(ref c) = patch.custom_color {
            match color::normalize_hex(c) {
                Some(hex) => self.custom_color = hex,
                None => log::warn!("[settings] ignoring invalid custom color {c:?}"),
            }
        }
        if let Some(v) = patch.use_24_hour_format {
            self.use_24_hour_format = v;
        }
        if let Some(v) = patch.show_leading_zero {
            self.show_leading_zero = v;
        }
        if let Some(ref colors) = patch.recent_colors {
            self.recent_colors = clean_recent_colors(colors);
        }
        *self != before
    }
}

/// Detects external edits to a settings file by watching its modification time.
#[derive(Debug)]
pub struct SettingsWatcher {
    path: PathBuf,
    last_seen: Option<SystemTime>,
}

impl SettingsWatcher {
    /// Start watching `path`; its current state counts as already seen.
    pub fn new(path: PathBuf) -> Self {
        let last_seen = modified(&path);
        Self { path, last_seen }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reload the file if it changed since the last poll or [`mark_seen`](Self::mark_seen).
    pub fn poll(&mut self) -> Option<Settings> {
        let current = modified(&self.path);
        if current == self.last_seen {
            return None;
        }
        self.last_seen = current;
        current?;
        let (settings, warnings) = Settings::load_from(&self.path);
        for w in &warnings {
            log::warn!("{w}");
        }
        Some(settings)
    }

    /// Treat the file's current state as seen (call after saving it ourselves).
    pub fn mark_seen(&mut self) {
        self.last_seen = modified(&self.path);
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults & serde ──

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert!(!s.use_custom_color);
        assert_eq!(s.custom_color, "#FFFFFF");
        assert!(!s.use_24_hour_format);
        assert!(!s.show_leading_zero);
        assert!(s.recent_colors.is_empty());
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let s: Settings = toml::from_str("").unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let s: Settings = toml::from_str("use_24_hour_format = true").unwrap();
        assert!(s.use_24_hour_format);
        assert_eq!(s.custom_color, "#FFFFFF");
    }

    #[test]
    fn wrong_type_toml_is_error() {
        let result: Result<Settings, _> = toml::from_str("show_leading_zero = \"yes\"");
        assert!(result.is_err());
    }

    #[test]
    fn settings_paths_are_per_mode() {
        let hour = Settings::path(DisplayMode::Hour).unwrap();
        let minute = Settings::path(DisplayMode::Minute).unwrap();
        assert_eq!(hour.file_name().unwrap(), "hour.toml");
        assert_eq!(minute.file_name().unwrap(), "minute.toml");
        assert_eq!(hour.parent(), minute.parent());
    }

    #[test]
    fn log_path_is_in_settings_dir() {
        let log = Settings::log_path(DisplayMode::Minute).unwrap();
        assert_eq!(log.parent().unwrap(), Settings::dir().unwrap());
        assert_eq!(log.file_name().unwrap(), "clockglyph-minute.log");
    }

    // ── persistence ──

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hour.toml");
        let mut s = Settings::default();
        s.set_custom_color("#12ab34").unwrap();
        s.use_24_hour_format = true;
        s.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("# Clockglyph settings"));
        assert!(!path.with_extension("toml.tmp").exists());

        let (loaded, warnings) = Settings::load_from(&path);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(loaded, s);
    }

    #[test]
    fn load_missing_file_gives_defaults_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let (s, warnings) = Settings::load_from(&dir.path().join("absent.toml"));
        assert_eq!(s, Settings::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn load_malformed_file_warns_and_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();
        let (s, warnings) = Settings::load_from(&path);
        assert_eq!(s, Settings::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("parse error"));
    }

    #[test]
    fn load_repairs_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odd.toml");
        std::fs::write(
            &path,
            r##"
custom_color = "not-a-color"
recent_colors = ["#abc", "nope", "#AABBCC", "#111111", "#222222", "#333333", "#444444", "#555555"]
"##,
        )
        .unwrap();
        let (s, warnings) = Settings::load_from(&path);
        assert!(warnings.iter().any(|w| w.contains("Invalid custom color")));
        assert!(warnings.iter().any(|w| w.contains("Invalid recent color: nope")));
        assert!(warnings.iter().any(|w| w.contains("Too many recent colors")));
        assert_eq!(s.custom_color, "#FFFFFF");
        assert_eq!(
            s.recent_colors,
            vec!["#AABBCC", "#111111", "#222222", "#333333", "#444444"]
        );
    }

    // ── recent colors ──

    #[test]
    fn recent_colors_most_recent_first() {
        let mut s = Settings::default();
        s.add_recent_color("#111111");
        s.add_recent_color("#222222");
        assert_eq!(s.recent_colors, vec!["#222222", "#111111"]);
    }

    #[test]
    fn recent_color_already_present_moves_to_front() {
        let mut s = Settings::default();
        for c in ["#111111", "#222222", "#333333"] {
            s.add_recent_color(c);
        }
        s.add_recent_color("#111111");
        assert_eq!(s.recent_colors, vec!["#111111", "#333333", "#222222"]);
    }

    #[test]
    fn recent_color_dedup_is_case_and_shorthand_insensitive() {
        let mut s = Settings::default();
        s.add_recent_color("#aabbcc");
        s.add_recent_color("#ABC");
        assert_eq!(s.recent_colors, vec!["#AABBCC"]);
    }

    #[test]
    fn recent_colors_capped_oldest_dropped() {
        let mut s = Settings::default();
        for i in 1..=7 {
            s.add_recent_color(&format!("#{i}{i}{i}"));
        }
        assert_eq!(s.recent_colors.len(), MAX_RECENT_COLORS);
        assert_eq!(s.recent_colors[0], "#777777");
        assert_eq!(s.recent_colors[4], "#333333");
        assert!(!s.recent_colors.contains(&"#111111".to_string()));
        assert!(!s.recent_colors.contains(&"#222222".to_string()));
    }

    #[test]
    fn invalid_recent_color_is_rejected() {
        let mut s = Settings::default();
        assert!(!s.add_recent_color("purple"));
        assert!(s.recent_colors.is_empty());
    }

    // ── custom color ──

    #[test]
    fn set_custom_color_enables_and_records() {
        let mut s = Settings::default();
        s.set_custom_color("f80").unwrap();
        assert!(s.use_custom_color);
        assert_eq!(s.custom_color, "#FF8800");
        assert_eq!(s.recent_colors, vec!["#FF8800"]);
        assert_eq!(s.display_color(), "#FF8800");
    }

    #[test]
    fn set_custom_color_rejects_invalid() {
        let mut s = Settings::default();
        let err = s.set_custom_color("#12345").unwrap_err();
        assert!(err.to_string().contains("Invalid color"));
        assert!(!s.use_custom_color);
    }

    #[test]
    fn display_color_defaults_when_disabled() {
        let s = Settings {
            custom_color: "#00FF00".into(),
            ..Settings::default()
        };
        assert_eq!(s.display_color(), DEFAULT_ICON_COLOR);
    }

    // ── patches ──

    #[test]
    fn patch_applies_only_present_fields() {
        let mut s = Settings {
            show_leading_zero: true,
            ..Settings::default()
        };
        let patch = SettingsPatch {
            use_24_hour_format: Some(true),
            ..SettingsPatch::default()
        };
        assert!(s.apply_patch(&patch));
        assert!(s.use_24_hour_format);
        assert!(s.show_leading_zero);
    }

    #[test]
    fn patch_without_changes_reports_false() {
        let mut s = Settings::default();
        assert!(!s.apply_patch(&SettingsPatch::default()));
        assert!(!s.apply_patch(&s.to_patch()));
    }

    #[test]
    fn patch_ignores_invalid_custom_color() {
        let mut s = Settings::default();
        let patch = SettingsPatch {
            custom_color: Some("bogus".into()),
            ..SettingsPatch::default()
        };
        assert!(!s.apply_patch(&patch));
        assert_eq!(s.custom_color, "#FFFFFF");
    }

    #[test]
    fn full_patch_reproduces_settings() {
        let mut source = Settings::default();
        source.set_custom_color("#336699").unwrap();
        source.show_leading_zero = true;
        let mut target = Settings::default();
        target.apply_patch(&source.to_patch());
        assert_eq!(target, source);
    }

    #[test]
    fn patch_uses_camel_case_wire_names() {
        let patch = SettingsPatch {
            use_custom_color: Some(true),
            use_24_hour_format: Some(false),
            ..SettingsPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json["useCustomColor"], true);
        assert_eq!(json["use24HourFormat"], false);
        assert!(json.get("customColor").is_none());
    }

    #[test]
    fn patch_parses_partial_record() {
        let patch: SettingsPatch =
            serde_json::from_str(r##"{"customColor":"#FF0000","showLeadingZero":true}"##).unwrap();
        assert_eq!(patch.custom_color.as_deref(), Some("#FF0000"));
        assert_eq!(patch.show_leading_zero, Some(true));
        assert!(patch.recent_colors.is_none());
        assert!(!patch.is_empty());
    }

    // ── watcher ──

    #[test]
    fn watcher_reports_external_change_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minute.toml");
        Settings::default().save_to(&path).unwrap();
        let mut watcher = SettingsWatcher::new(path.clone());
        assert!(watcher.poll().is_none());

        // Make sure the modification time moves even on coarse-grained filesystems.
        std::thread::sleep(std::time::Duration::from_millis(1100));
        let changed = Settings {
            use_24_hour_format: true,
            ..Settings::default()
        };
        changed.save_to(&path).unwrap();

        let seen = watcher.poll().expect("change should be reported");
        assert!(seen.use_24_hour_format);
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn watcher_ignores_own_saves_after_mark_seen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hour.toml");
        let mut watcher = SettingsWatcher::new(path.clone());
        Settings::default().save_to(&path).unwrap();
        watcher.mark_seen();
        assert!(watcher.poll().is_none());
    }

    #[test]
    fn watcher_on_missing_file_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = SettingsWatcher::new(dir.path().join("absent.toml"));
        assert!(watcher.poll().is_none());
    }
}
