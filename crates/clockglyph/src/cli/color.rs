//! `color` subcommands — set, reset, list and inspect icon colors.

use clockglyph_lib::color;

use super::{
    CliContext, ClockglyphError, ColorInspectOutput, HsvJson, Result, SpectrumJson, kv, kv_width,
    print_json, report_change,
};

pub(super) fn cmd_color_set(ctx: &CliContext, hex: &str) -> Result<()> {
    let mut settings = ctx.load();
    let before = settings.clone();
    settings.set_custom_color(hex)?;
    let changed = settings != before;
    if changed {
        ctx.save(&settings)?;
    }
    report_change(ctx, changed, &settings)
}

pub(super) fn cmd_color_reset(ctx: &CliContext) -> Result<()> {
    let mut settings = ctx.load();
    let changed = settings.use_custom_color;
    if changed {
        settings.use_custom_color = false;
        ctx.save(&settings)?;
    }
    report_change(ctx, changed, &settings)
}

pub(super) fn cmd_color_recent(ctx: &CliContext) -> Result<()> {
    let settings = ctx.load();
    if ctx.json {
        return print_json(&settings.recent_colors);
    }
    if settings.recent_colors.is_empty() {
        println!("No recent colors.");
        return Ok(());
    }
    for (i, hex) in settings.recent_colors.iter().enumerate() {
        let marker = if settings.use_custom_color && *hex == settings.custom_color {
            "  (current)"
        } else {
            ""
        };
        println!("{}. {hex}{marker}", i + 1);
    }
    Ok(())
}

pub(super) fn cmd_color_inspect(ctx: &CliContext, hex: &str) -> Result<()> {
    let normalized = color::normalize_hex(hex).ok_or_else(|| {
        ClockglyphError::Color(format!("Invalid color: {hex} (use #RGB or #RRGGBB)"))
    })?;
    let rgb = color::hex_to_rgb(&normalized);
    let hsv = color::rgb_to_hsv(rgb);
    let pos = color::color_to_position(rgb);

    if ctx.json {
        return print_json(&ColorInspectOutput {
            hex: normalized,
            rgb: [rgb.r, rgb.g, rgb.b],
            hsv: HsvJson {
                h: round2(hsv.h),
                s: round2(hsv.s),
                v: round2(hsv.v),
            },
            spectrum: SpectrumJson {
                x: round2(pos.x),
                y: round2(pos.y),
            },
        });
    }

    let w = kv_width(&["Hex:", "RGB:", "HSV:", "Spectrum:"], &[]);
    kv("Hex:", &normalized, w);
    kv("RGB:", rgb, w);
    kv(
        "HSV:",
        format_args!("{:.0}°, {:.0}%, {:.0}%", hsv.h, hsv.s * 100.0, hsv.v * 100.0),
        w,
    );
    kv("Spectrum:", format_args!("x={:.2}, y={:.2}", pos.x, pos.y), w);
    Ok(())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round2_keeps_two_decimals() {
        assert_eq!(round2(0.123_456), 0.12);
        assert_eq!(round2(359.999), 360.0);
        assert_eq!(round2(0.0), 0.0);
    }
}
