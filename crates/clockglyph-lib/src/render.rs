//! Icon rasterizer — runs on the render surface, never on the caller's thread.
//!
//! Text is drawn with a bitmap font, cropped to its ink, and scaled to the
//! largest font size that still fits the icon. The result is a straight RGBA
//! buffer that the tray can hand to the platform as-is.

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle, ascii::FONT_9X18_BOLD};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, PrimitiveStyle};
use embedded_graphics::text::{Baseline, Text};
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use crate::color::{self, Rgb};

/// Edge length of the tray icon in pixels.
pub const ICON_SIZE: u32 = 32;

/// Largest font size (in pixels of ink height) the fit search starts from.
pub const MAX_FONT_SIZE: u32 = 64;

/// Overflow, in pixels, tolerated on either axis when fitting text.
const FIT_TOLERANCE: u32 = 1;

/// Source font. Glyphs are scaled up from this, so a bold face keeps strokes legible.
const GLYPH_FONT: &MonoFont<'static> = &FONT_9X18_BOLD;

/// Fallback icon ring color.
const FALLBACK_COLOR: Rgb = Rgb::new(0x80, 0x80, 0x80);

// ── Errors ──

/// Why a render did not produce a bitmap.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// No response from the render surface within the deadline.
    Timeout(Duration),
    /// The render surface reported a failure.
    Surface(String),
    /// The render surface went away before replying.
    Disconnected,
    /// The coordinator was cleared while the render was in flight.
    Cleared,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Timeout(d) => write!(f, "Render timed out after {:.1}s", d.as_secs_f64()),
            RenderError::Surface(e) => write!(f, "Render failed: {e}"),
            RenderError::Disconnected => write!(f, "Render surface disconnected"),
            RenderError::Cleared => write!(f, "Render cancelled by cache reset"),
        }
    }
}

impl std::error::Error for RenderError {}

// ── Wire types ──

/// Horizontal placement of the text inside the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

impl std::str::FromStr for Align {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Align::Left),
            "center" | "centre" => Ok(Align::Center),
            "right" => Ok(Align::Right),
            other => Err(format!("unknown alignment \"{other}\" (use left, center or right)")),
        }
    }
}

/// A request to draw `text` in `color` (hex or named) on the render surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub text: String,
    pub color: String,
    pub cache_key: String,
    pub align: Align,
}

/// The render surface's reply, always tagged with the request's cache key.
#[derive(Debug, Clone)]
pub enum RenderResponse {
    Rendered { bitmap: Bitmap, cache_key: String },
    Failed { error: String, cache_key: String },
}

impl RenderResponse {
    pub fn cache_key(&self) -> &str {
        match self {
            RenderResponse::Rendered { cache_key, .. } | RenderResponse::Failed { cache_key, .. } => {
                cache_key
            }
        }
    }
}

// ── Bitmap ──

/// Straight (non-premultiplied) RGBA icon image.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    image: RgbaImage,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("opaque_pixels", &self.opaque_pixels())
            .finish()
    }
}

impl From<RgbaImage> for Bitmap {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

impl Bitmap {
    /// Fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        RgbaImage::new(width, height).into()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw RGBA bytes, row-major.
    pub fn rgba(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }

    /// RGBA value at `(x, y)`, or `None` outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Paint an opaque pixel. Out-of-bounds coordinates are clipped.
    pub fn set_pixel(&mut self, x: i64, y: i64, rgb: Rgb) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if let Some(px) = self.image.get_pixel_mut_checked(x, y) {
            *px = opaque(rgb);
        }
    }

    /// Number of pixels with non-zero alpha.
    pub fn opaque_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p[3] != 0).count()
    }

    /// Leftmost and rightmost opaque columns.
    pub fn ink_columns(&self) -> Option<(u32, u32)> {
        let cols: Vec<u32> = (0..self.width())
            .filter(|&x| (0..self.height()).any(|y| self.image.get_pixel(x, y)[3] != 0))
            .collect();
        Some((*cols.first()?, *cols.last()?))
    }

    /// Write the bitmap as a PNG file.
    pub fn save_png(&self, path: &Path) -> crate::error::Result<()> {
        self.image
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| crate::ClockglyphError::Io(std::io::Error::other(e)))
    }

    /// Static icon shown when nothing has rendered successfully yet.
    pub fn fallback() -> Self {
        let mut mask = GlyphMask::new(ICON_SIZE, ICON_SIZE);
        let ring = Circle::new(Point::new(3, 3), ICON_SIZE - 6)
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 3));
        let _ = ring.draw(&mut mask);
        mask.paint(FALLBACK_COLOR).into()
    }
}

fn opaque(rgb: Rgb) -> Rgba<u8> {
    Rgba([rgb.r, rgb.g, rgb.b, 0xFF])
}

// ── Glyph mask ──

/// 1-bit draw target used to rasterize glyphs before scaling.
struct GlyphMask {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl GlyphMask {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ink: vec![false; (width * height) as usize],
        }
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        self.ink[(y * self.width + x) as usize]
    }

    /// Tight bounding box of inked pixels: `(x, y, width, height)`.
    fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.is_ink(x, y) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds.map(|(x0, y0, x1, y1)| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    /// Inked pixels in `rgb`, everything else transparent.
    fn paint(&self, rgb: Rgb) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            if self.is_ink(x, y) {
                opaque(rgb)
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}

impl OriginDimensions for GlyphMask {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for GlyphMask {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            let (x, y) = (point.x as u32, point.y as u32);
            if x < self.width && y < self.height {
                self.ink[(y * self.width + x) as usize] = color.is_on();
            }
        }
        Ok(())
    }
}

// ── Font fitting ──

/// Width of the ink box once scaled to `size` pixels tall.
fn scaled_width(ink_w: u32, ink_h: u32, size: u32) -> u32 {
    (ink_w * size).div_ceil(ink_h)
}

/// Largest font size in `1..=max_size` whose scaled text fits `width × height`,
/// found by bisection. `None` if even size 1 overflows.
pub fn fit_font_size(ink_w: u32, ink_h: u32, width: u32, height: u32, max_size: u32) -> Option<u32> {
    if ink_w == 0 || ink_h == 0 || max_size == 0 {
        return None;
    }
    let fits = |size: u32| {
        scaled_width(ink_w, ink_h, size) <= width + FIT_TOLERANCE && size <= height + FIT_TOLERANCE
    };
    if !fits(1) {
        return None;
    }
    let (mut lo, mut hi) = (1, max_size);
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if fits(mid) {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    Some(lo)
}

/// Rasterize a request into an `ICON_SIZE` square bitmap.
pub fn render_icon(request: &RenderRequest) -> Result<Bitmap, RenderError> {
    render_text(&request.text, color::resolve_color(&request.color), request.align, ICON_SIZE, ICON_SIZE)
}

/// Rasterize `text` into a `width × height` bitmap.
pub fn render_text(
    text: &str,
    rgb: Rgb,
    align: Align,
    width: u32,
    height: u32,
) -> Result<Bitmap, RenderError> {
    let glyphs = text.chars().count() as u32;
    if glyphs == 0 {
        return Err(RenderError::Surface("nothing to draw".into()));
    }

    let cell = GLYPH_FONT.character_size;
    let mask_w = glyphs * cell.width + (glyphs - 1) * GLYPH_FONT.character_spacing;
    let mut mask = GlyphMask::new(mask_w, cell.height);
    let style = MonoTextStyle::new(GLYPH_FONT, BinaryColor::On);
    let _ = Text::with_baseline(text, Point::zero(), style, Baseline::Top).draw(&mut mask);

    let (ink_x, ink_y, ink_w, ink_h) = mask
        .ink_bounds()
        .ok_or_else(|| RenderError::Surface(format!("no visible glyphs in {text:?}")))?;

    let size = fit_font_size(ink_w, ink_h, width, height, MAX_FONT_SIZE)
        .ok_or_else(|| RenderError::Surface(format!("{text:?} does not fit {width}x{height}")))?;
    let out_w = scaled_width(ink_w, ink_h, size);

    let left = match align {
        Align::Left => 0,
        Align::Center => (width as i64 - out_w as i64) / 2,
        Align::Right => width as i64 - out_w as i64,
    };
    let top = (height as i64 - size as i64) / 2;

    let glyph = mask.paint(rgb);
    let ink = imageops::crop_imm(&glyph, ink_x, ink_y, ink_w, ink_h).to_image();
    let scaled = imageops::resize(&ink, out_w, size, FilterType::Nearest);

    let mut canvas = RgbaImage::new(width, height);
    imageops::overlay(&mut canvas, &scaled, left, top);
    log::debug!("rendered {text:?} at {size}px ({out_w}px wide)");
    Ok(canvas.into())
}
