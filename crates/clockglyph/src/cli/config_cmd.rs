//! `config` subcommand — show current settings and file paths.

use super::{CliContext, ConfigOutput, Result, Settings, kv, kv_indent, kv_width, print_json};

pub(super) fn cmd_config(ctx: &CliContext) -> Result<()> {
    let settings = ctx.load();
    let settings_path = ctx.path();
    let settings_exists = settings_path.as_ref().is_some_and(|p| p.exists());
    let log_path = Settings::log_path(ctx.mode);
    let companion = clockglyph_lib::sync::companion_addr(ctx.mode);

    if ctx.json {
        return print_json(&ConfigOutput {
            mode: ctx.mode,
            settings_file: settings_path.as_ref().map(|p| p.display().to_string()),
            settings_file_exists: settings_exists,
            log_file: log_path.as_ref().map(|p| p.display().to_string()),
            display_color: settings.display_color(),
            companion: companion.to_string(),
            settings,
        });
    }

    // Human-readable output
    let w = kv_width(
        &["Mode:", "Settings file:", "Log file:", "Companion:"],
        &[
            "use_custom_color:",
            "custom_color:",
            "use_24_hour_format:",
            "show_leading_zero:",
            "recent_colors:",
            "Icon color:",
        ],
    );

    kv("Mode:", ctx.mode, w);
    match &settings_path {
        Some(p) if settings_exists => kv("Settings file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Settings file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Settings file:", "(no config directory)", w),
    }
    match &log_path {
        Some(p) => kv("Log file:", p.display(), w),
        None => kv("Log file:", "(no config directory)", w),
    }
    kv(
        "Companion:",
        format_args!("{} icon at {companion}", ctx.mode.companion()),
        w,
    );
    println!();

    println!("Settings:");
    kv_indent("use_custom_color:", settings.use_custom_color, w);
    kv_indent("custom_color:", &settings.custom_color, w);
    kv_indent("use_24_hour_format:", settings.use_24_hour_format, w);
    kv_indent("show_leading_zero:", settings.show_leading_zero, w);
    let recent = if settings.recent_colors.is_empty() {
        "(none)".to_string()
    } else {
        settings.recent_colors.join(", ")
    };
    kv_indent("recent_colors:", recent, w);
    kv_indent("Icon color:", settings.display_color(), w);
    Ok(())
}
