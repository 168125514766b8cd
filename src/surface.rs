//! Drawing surface for the overlay.
//!
//! [`Surface`] is the small set of 2D primitives the render engine needs.
//! [`RasterSurface`] implements it on an in-memory RGBA buffer with
//! source-over blending and pixel-centre sampling, the same coverage rule a
//! browser canvas uses for non-antialiased shapes.

use std::path::Path;

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageResult, Rgba, RgbaImage};

pub type Color = Rgba<u8>;

pub const TRANSPARENT: Color = Rgba([0, 0, 0, 0]);

/// Glyph cell size of the bitmap font, in font pixels.
const GLYPH_SIZE: i64 = 8;

/// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(text: &str) -> Option<Color> {
    let hex = text.strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                rgb[i] = v * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 | 8 => {
            let r = channel(&hex[0..2])?;
            let g = channel(&hex[2..4])?;
            let b = channel(&hex[4..6])?;
            let a = if hex.len() == 8 { channel(&hex[6..8])? } else { 255 };
            Some(Rgba([r, g, b, a]))
        }
        _ => None,
    }
}

pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Reset every pixel to transparent.
    fn clear(&mut self);

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Color);

    /// Stroke centred on the circle's outline.
    fn stroke_circle(&mut self, cx: f64, cy: f64, radius: f64, width: f64, color: Color);

    /// Straight segment with butt ends.
    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color);

    /// Text centred on `(cx, cy)`, glyphs roughly `size` pixels tall.
    fn fill_text_centered(&mut self, text: &str, cx: f64, cy: f64, size: f64, color: Color);
}

/// Source-over compositing of `src` onto `dst`.
fn blend(dst: Color, src: Color) -> Color {
    let sa = f64::from(src[3]) / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = f64::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mix = |s: u8, d: u8| {
        let c = (f64::from(s) * sa + f64::from(d) * da * (1.0 - sa)) / out_a;
        c.round().clamp(0.0, 255.0) as u8
    };
    Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

/// In-memory RGBA overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.image.width() && y < self.image.height()).then(|| *self.image.get_pixel(x, y))
    }

    pub fn save_png(&self, path: &Path) -> ImageResult<()> {
        self.image.save(path)
    }

    /// Blend `color` into every pixel of the (clamped) box whose centre passes
    /// `covers`.
    fn paint_where(
        &mut self,
        (min_x, min_y, max_x, max_y): (f64, f64, f64, f64),
        color: Color,
        covers: impl Fn(f64, f64) -> bool,
    ) {
        let (w, h) = (i64::from(self.image.width()), i64::from(self.image.height()));
        if w == 0 || h == 0 {
            return;
        }
        let x0 = (min_x.floor() as i64).clamp(0, w - 1);
        let x1 = (max_x.ceil() as i64).clamp(0, w - 1);
        let y0 = (min_y.floor() as i64).clamp(0, h - 1);
        let y1 = (max_y.ceil() as i64).clamp(0, h - 1);
        for y in y0..=y1 {
            for x in x0..=x1 {
                if covers(x as f64 + 0.5, y as f64 + 0.5) {
                    self.blend_at(x, y, color);
                }
            }
        }
    }

    fn blend_at(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= i64::from(self.image.width()) || y >= i64::from(self.image.height()) {
            return;
        }
        let (x, y) = (x as u32, y as u32);
        let dst = *self.image.get_pixel(x, y);
        self.image.put_pixel(x, y, blend(dst, color));
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Color) {
        if radius.is_nan() || radius <= 0.0 {
            return;
        }
        let r2 = radius * radius;
        let bounds = (cx - radius, cy - radius, cx + radius, cy + radius);
        self.paint_where(bounds, color, |x, y| {
            let (dx, dy) = (x - cx, y - cy);
            dx * dx + dy * dy <= r2
        });
    }

    fn stroke_circle(&mut self, cx: f64, cy: f64, radius: f64, width: f64, color: Color) {
        if radius.is_nan() || radius <= 0.0 || width.is_nan() || width <= 0.0 {
            return;
        }
        let half = width / 2.0;
        let outer = radius + half;
        let bounds = (cx - outer, cy - outer, cx + outer, cy + outer);
        self.paint_where(bounds, color, |x, y| {
            let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();
            (d - radius).abs() < half
        });
    }

    fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        if width.is_nan() || width <= 0.0 {
            return;
        }
        let half = width / 2.0;
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len2 = dx * dx + dy * dy;
        if len2 == 0.0 {
            return;
        }
        let bounds = (
            from.0.min(to.0) - half,
            from.1.min(to.1) - half,
            from.0.max(to.0) + half,
            from.1.max(to.1) + half,
        );
        self.paint_where(bounds, color, |x, y| {
            let t = ((x - from.0) * dx + (y - from.1) * dy) / len2;
            if !(0.0..=1.0).contains(&t) {
                return false;
            }
            let (nx, ny) = (from.0 + t * dx, from.1 + t * dy);
            ((x - nx).powi(2) + (y - ny).powi(2)).sqrt() < half
        });
    }

    fn fill_text_centered(&mut self, text: &str, cx: f64, cy: f64, size: f64, color: Color) {
        if !(cx.is_finite() && cy.is_finite() && size.is_finite()) {
            return;
        }
        let (w, h) = (f64::from(self.image.width()), f64::from(self.image.height()));
        let glyph = GLYPH_SIZE as f64;
        // Layout stays in f64: positions far off the surface must not overflow.
        let scale = (size / glyph).round().max(1.0);
        let cell = glyph * scale;
        let count = text.chars().count() as f64;
        let left = (cx - count * cell / 2.0).round();
        let top = (cy - cell / 2.0).round();

        // Nothing of the text lands on the surface.
        if left >= w || top >= h || left + count * cell <= 0.0 || top + cell <= 0.0 {
            return;
        }

        for (i, ch) in text.chars().enumerate() {
            let origin_x = left + i as f64 * cell;
            if origin_x >= w || origin_x + cell <= 0.0 {
                continue;
            }
            let Some(bitmap) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
                continue;
            };
            for (row, &bits) in bitmap.iter().enumerate() {
                let py = top + row as f64 * scale;
                let (y0, y1) = (py.max(0.0), (py + scale).min(h));
                if y0 >= y1 {
                    continue;
                }
                for col in 0..GLYPH_SIZE {
                    if (bits >> col) & 1 == 0 {
                        continue;
                    }
                    let px = origin_x + col as f64 * scale;
                    let (x0, x1) = (px.max(0.0), (px + scale).min(w));
                    if x0 >= x1 {
                        continue;
                    }
                    // Only the part of the font pixel inside the surface.
                    for y in y0 as i64..y1 as i64 {
                        for x in x0 as i64..x1 as i64 {
                            self.blend_at(x, y, color);
                        }
                    }
                }
            }
        }
    }
}
