//! CLI subcommands — icon rendering, settings, colors, companion sync.

mod color;
mod config_cmd;
mod format;
mod render;
mod sync_cmd;
mod watch;

use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use clockglyph_lib::ClockglyphError;
pub(super) use clockglyph_lib::clock::{DisplayMode, IconSpec};
pub(super) use clockglyph_lib::error::Result;
pub(super) use clockglyph_lib::settings::Settings;

const PADDING: usize = 2;

/// Compute alignment width for a command's key-value output.
/// Ensures at least PADDING spaces after the longest key in either level,
/// with top-level and indent values aligned to the same column.
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let top_max = top.iter().map(|k| k.len()).max().unwrap_or(0);
    let indent_max = indent.iter().map(|k| k.len()).max().unwrap_or(0);
    let top_need = if top.is_empty() { 0 } else { top_max + PADDING };
    // Indent keys lose 2 chars of inner width to the "  " prefix
    let indent_need = if indent.is_empty() {
        0
    } else {
        indent_max + PADDING + 2
    };
    top_need.max(indent_need)
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<width$}{value}", width = w)
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("  {key:<width$}{value}", width = w - 2);
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ClockglyphError::Config(format!("JSON output: {e}")))?;
    println!("{text}");
    Ok(())
}

// ── Invocation context ──

/// Global options shared by every subcommand.
pub struct CliContext {
    pub mode: DisplayMode,
    pub settings_path: Option<PathBuf>,
    pub sync: bool,
    pub json: bool,
}

impl CliContext {
    pub(super) fn path(&self) -> Option<PathBuf> {
        self.settings_path
            .clone()
            .or_else(|| Settings::path(self.mode))
    }

    /// Load settings for the selected mode, logging any repair warnings.
    pub(super) fn load(&self) -> Settings {
        let Some(path) = self.path() else {
            return Settings::default();
        };
        let (settings, warnings) = Settings::load_from(&path);
        for w in &warnings {
            log::warn!("[settings] {w}");
        }
        settings
    }

    pub(super) fn save(&self, settings: &Settings) -> Result<()> {
        let path = self
            .path()
            .ok_or_else(|| ClockglyphError::Config("No config directory".into()))?;
        settings.save_to(&path)?;
        log::debug!("saved {}", path.display());
        Ok(())
    }

    /// Push `settings` to the companion unless `--no-sync` was given.
    ///
    /// Returns the delivery error, if any; an absent companion is not fatal.
    pub(super) fn push(&self, settings: &Settings) -> Option<String> {
        if !self.sync {
            return None;
        }
        let addr = clockglyph_lib::sync::companion_addr(self.mode);
        match clockglyph_lib::sync::send_to_companion(addr, &settings.to_patch()) {
            Ok(()) => None,
            Err(e) => {
                log::warn!("[sync] {e}");
                Some(e.to_string())
            }
        }
    }
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub mode: DisplayMode,
    pub settings_file: Option<String>,
    pub settings_file_exists: bool,
    pub log_file: Option<String>,
    pub display_color: String,
    pub companion: String,
    pub settings: Settings,
}

#[derive(Serialize)]
pub(super) struct RenderOutput {
    pub output: String,
    pub text: String,
    pub color: String,
    pub cache_key: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Serialize)]
pub(super) struct ColorInspectOutput {
    pub hex: String,
    pub rgb: [u8; 3],
    pub hsv: HsvJson,
    pub spectrum: SpectrumJson,
}

#[derive(Serialize)]
pub(super) struct HsvJson {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

#[derive(Serialize)]
pub(super) struct SpectrumJson {
    pub x: f64,
    pub y: f64,
}

#[derive(Serialize)]
pub(super) struct SettingsChangeOutput {
    pub changed: bool,
    pub settings: Settings,
    pub synced: bool,
    pub sync_error: Option<String>,
}

#[derive(Serialize)]
pub(super) struct WatchEventJson {
    pub time: String,
    pub reason: String,
    pub text: String,
    pub tooltip: String,
    pub rendered: bool,
}

/// `on` / `off` switch value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(t: Toggle) -> bool {
        t == Toggle::On
    }
}

#[derive(Subcommand)]
pub enum ColorAction {
    /// Use a custom icon color (#RGB or #RRGGBB) and remember it
    Set {
        /// Hex color, e.g. "#FF8800" or "f80"
        hex: String,
    },
    /// Go back to the default icon color
    Reset,
    /// List recently used colors, newest first
    Recent,
    /// Show a color's RGB, HSV and spectrum position
    Inspect {
        /// Hex color to inspect
        hex: String,
    },
}

#[derive(Subcommand)]
pub enum Command {
    /// Draw an icon and save it as PNG
    Render {
        /// Text to draw (default: the current hour or minute)
        #[arg(long)]
        text: Option<String>,
        /// Color, hex or name (default: the configured icon color)
        #[arg(long)]
        color: Option<String>,
        /// Horizontal placement: left, center or right (default: by mode)
        #[arg(long)]
        align: Option<clockglyph_lib::render::Align>,
        /// PNG file to write
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Show current settings and file paths
    Config,

    /// Manage the icon color
    Color {
        #[command(subcommand)]
        action: ColorAction,
    },

    /// Change the clock format
    Format {
        /// Use the 24-hour clock
        #[arg(long = "24h", value_enum)]
        h24: Option<Toggle>,
        /// Pad single digits with a zero
        #[arg(long, value_enum)]
        leading_zero: Option<Toggle>,
    },

    /// Push all settings to the companion icon
    Sync,

    /// Run the icon update loop headless, printing each new icon (Ctrl+C to stop)
    Watch {
        /// Stop after this many updates
        #[arg(long)]
        count: Option<u32>,
    },
}

pub fn run(cmd: Command, ctx: &CliContext) -> Result<()> {
    match cmd {
        Command::Render {
            text,
            color,
            align,
            output,
        } => render::cmd_render(ctx, text, color, align, &output),
        Command::Config => config_cmd::cmd_config(ctx),
        Command::Color { action } => match action {
            ColorAction::Set { hex } => color::cmd_color_set(ctx, &hex),
            ColorAction::Reset => color::cmd_color_reset(ctx),
            ColorAction::Recent => color::cmd_color_recent(ctx),
            ColorAction::Inspect { hex } => color::cmd_color_inspect(ctx, &hex),
        },
        Command::Format { h24, leading_zero } => {
            format::cmd_format(ctx, h24.map(bool::from), leading_zero.map(bool::from))
        }
        Command::Sync => sync_cmd::cmd_sync(ctx),
        Command::Watch { count } => watch::cmd_watch(ctx, count),
    }
}

/// Print the outcome of a settings change (shared by `color` and `format`).
pub(super) fn report_change(ctx: &CliContext, changed: bool, settings: &Settings) -> Result<()> {
    let sync_error = if changed { ctx.push(settings) } else { None };
    let synced = changed && ctx.sync && sync_error.is_none();
    if ctx.json {
        return print_json(&SettingsChangeOutput {
            changed,
            settings: settings.clone(),
            synced,
            sync_error,
        });
    }
    if !changed {
        println!("Settings unchanged.");
        return Ok(());
    }
    println!("Settings saved.");
    if synced {
        println!("Companion {} icon updated.", ctx.mode.companion());
    } else if let Some(e) = sync_error {
        println!("Companion not updated: {e}");
    }
    Ok(())
}
