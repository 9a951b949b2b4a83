//! Color conversions for icon text — hex, RGB, HSV and spectrum placement.
//!
//! Malformed input never errors here: anything that is not a recognisable
//! hex color maps to black. Callers that need to reject bad input use
//! [`is_valid_hex_color`] or [`normalize_hex`] first.

use std::fmt;

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format as `#rrggbb`.
    pub fn to_hex(self) -> String {
        rgb_to_hex(self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// HSV triple: hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// Marker position on the 2-D color spectrum, both axes in `[0, 1]`.
///
/// `x` runs along the hue axis (0° at the left edge), `y` runs from full
/// value at the top to black at the bottom. Saturation is not representable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumPosition {
    pub x: f64,
    pub y: f64,
}

/// Named colors accepted wherever a render color is accepted.
const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("white", Rgb::new(0xFF, 0xFF, 0xFF)),
    ("black", Rgb::new(0x00, 0x00, 0x00)),
    ("red", Rgb::new(0xFF, 0x00, 0x00)),
    ("green", Rgb::new(0x00, 0xFF, 0x00)),
    ("blue", Rgb::new(0x00, 0x00, 0xFF)),
    ("orange", Rgb::new(0xFF, 0x80, 0x00)),
    ("yellow", Rgb::new(0xFF, 0xFF, 0x00)),
    ("purple", Rgb::new(0x80, 0x00, 0xFF)),
    ("cyan", Rgb::new(0x00, 0xFF, 0xFF)),
];

/// Expand `#RGB` / `#RRGGBB` (with or without `#`) into six hex digits.
fn expand_hex_digits(hex: &str) -> Option<String> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match digits.len() {
        3 => Some(digits.chars().flat_map(|c| [c, c]).collect()),
        6 => Some(digits.to_string()),
        _ => None,
    }
}

/// Parse a hex color. Shorthand digits are doubled; anything else is black.
pub fn hex_to_rgb(hex: &str) -> Rgb {
    let Some(digits) = expand_hex_digits(hex) else {
        return Rgb::BLACK;
    };
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0);
    Rgb::new(channel(0), channel(2), channel(4))
}

/// Format channels as lower-case `#rrggbb`.
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// `^#([0-9A-F]{3}){1,2}$`, case-insensitive.
pub fn is_valid_hex_color(s: &str) -> bool {
    s.starts_with('#') && expand_hex_digits(s).is_some()
}

/// Validate and normalize to upper-case `#RRGGBB`. A missing `#` is tolerated.
pub fn normalize_hex(s: &str) -> Option<String> {
    let s = s.trim();
    let with_hash = if s.starts_with('#') {
        s.to_string()
    } else {
        format!("#{s}")
    };
    if !is_valid_hex_color(&with_hash) {
        return None;
    }
    let digits = expand_hex_digits(&with_hash)?;
    Some(format!("#{}", digits.to_ascii_uppercase()))
}

/// Resolve a render color: a named color or hex, black otherwise.
pub fn resolve_color(s: &str) -> Rgb {
    let s = s.trim();
    let lower = s.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgb)| *rgb)
        .unwrap_or_else(|| hex_to_rgb(s))
}

/// Sector-based HSV → RGB. `h` in degrees, `s` and `v` in `[0, 1]`.
pub fn hsv_to_rgb(h: f64, s: f64, v: f64) -> Rgb {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);

    let c = v * s;
    let h6 = h / 60.0;
    let x = c * (1.0 - (h6 % 2.0 - 1.0).abs());
    let m = v - c;

    let (r1, g1, b1) = match h6 as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    let to_u8 = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(to_u8(r1), to_u8(g1), to_u8(b1))
}

/// RGB → HSV. Grays report hue 0.
pub fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    Hsv {
        h: h.rem_euclid(360.0),
        s,
        v: max,
    }
}

/// Color under a spectrum marker. Always fully saturated.
pub fn position_to_color(pos: SpectrumPosition) -> Rgb {
    let x = pos.x.clamp(0.0, 1.0);
    let y = pos.y.clamp(0.0, 1.0);
    hsv_to_rgb(x * 360.0, 1.0, 1.0 - y)
}

/// Where to place the spectrum marker for `rgb`: the nearest point on the
/// fully-saturated slice, keeping hue and value.
pub fn color_to_position(rgb: Rgb) -> SpectrumPosition {
    let hsv = rgb_to_hsv(rgb);
    SpectrumPosition {
        x: hsv.h / 360.0,
        y: 1.0 - hsv.v,
    }
}
