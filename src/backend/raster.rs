//! Pixel backend rendering into an RGBA image.

use std::{
    f64::consts::TAU,
    fs,
    io::Cursor,
    path::Path,
};

use ab_glyph::{point, Font as _, FontArc, GlyphId, PxScale, ScaleFont};
use image::{imageops, DynamicImage, ImageOutputFormat, RgbaImage};
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::{Backend, BackendError, DrawState, TransformStack};
use crate::domain::Color;

const DEFAULT_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static DEFAULT_FONT: Lazy<Option<FontArc>> = Lazy::new(|| {
    let font = DEFAULT_FONT_PATHS.iter().find_map(|path| {
        fs::read(path)
            .ok()
            .and_then(|data| FontArc::try_from_vec(data).ok())
            .inspect(|_| debug!(path = *path, "loaded font"))
    });
    if font.is_none() {
        warn!("no usable font found, text will not be rendered");
    }
    font
});

const ELLIPSE_SEGMENTS: usize = 64;
const ARC_STEP: f64 = TAU / 64.0;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PictureFormat {
    #[default]
    Png,
    Jpeg,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColorMode {
    Rgb,
    #[default]
    Rgba,
}

pub struct RasterBackend {
    width: f64,
    height: f64,
    scale: f64,
    state: DrawState,
    transforms: TransformStack,
    subpaths: Vec<Vec<(f64, f64)>>,
    image: RgbaImage,
    font: Option<FontArc>,
    format: PictureFormat,
    mode: ColorMode,
}

impl RasterBackend {
    pub fn new(width: f64, height: f64, scale: f64) -> Self {
        let mut backend = Self {
            width,
            height,
            scale,
            state: DrawState::default(),
            transforms: TransformStack::new(),
            subpaths: Vec::new(),
            image: RgbaImage::new(1, 1),
            font: DEFAULT_FONT.clone(),
            format: PictureFormat::default(),
            mode: ColorMode::default(),
        };
        backend.update_dimensions(width, height, scale);
        backend
    }

    pub fn with_font(mut self, font: Option<FontArc>) -> Self {
        self.font = font;
        self
    }

    pub fn with_format(mut self, format: PictureFormat) -> Self {
        self.format = format;
        self.check_mode();
        self
    }

    pub fn with_mode(mut self, mode: ColorMode) -> Self {
        self.mode = mode;
        self.check_mode();
        self.clear();
        self
    }

    pub fn format(&self) -> PictureFormat {
        self.format
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Encoded picture in the configured format.
    pub fn encode(&self) -> Result<Vec<u8>, BackendError> {
        let mut bytes = Cursor::new(Vec::new());
        let image = DynamicImage::ImageRgba8(self.image.clone());
        match (self.format, self.mode) {
            (PictureFormat::Png, ColorMode::Rgba) => {
                image.write_to(&mut bytes, ImageOutputFormat::Png)?
            }
            (PictureFormat::Png, ColorMode::Rgb) => DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut bytes, ImageOutputFormat::Png)?,
            (PictureFormat::Jpeg, _) => DynamicImage::ImageRgb8(image.to_rgb8())
                .write_to(&mut bytes, ImageOutputFormat::Jpeg(90))?,
        }
        Ok(bytes.into_inner())
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), BackendError> {
        let bytes = self.encode()?;
        fs::write(path, bytes).map_err(image::ImageError::from)?;
        Ok(())
    }

    fn check_mode(&mut self) {
        if self.format == PictureFormat::Jpeg && self.mode == ColorMode::Rgba {
            warn!("JPEG cannot store transparency, switching to RGB");
            self.mode = ColorMode::Rgb;
        }
    }

    fn device(&self, x: f64, y: f64) -> (f64, f64) {
        let (x, y) = self.transforms.apply(x, y);
        (x * self.scale, y * self.scale)
    }

    fn device_line_width(&self) -> f64 {
        self.state.line_width * self.scale
    }

    fn extend_path(&mut self, point: (f64, f64)) {
        match self.subpaths.last_mut() {
            Some(subpath) => subpath.push(point),
            None => self.subpaths.push(vec![point]),
        }
    }
}

impl Backend for RasterBackend {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn scale(&self) -> f64 {
        self.scale
    }

    fn state(&self) -> &DrawState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut DrawState {
        &mut self.state
    }

    fn update_dimensions(&mut self, width: f64, height: f64, scale: f64) {
        self.transforms.reset();
        self.subpaths.clear();
        self.width = width;
        self.height = height;
        self.scale = scale;
        self.image = RgbaImage::new(
            (width * scale).round().max(1.0) as u32,
            (height * scale).round().max(1.0) as u32,
        );
        self.clear();
    }

    fn begin_path(&mut self) {
        self.subpaths.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let point = self.device(x, y);
        self.subpaths.push(vec![point]);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let point = self.device(x, y);
        self.extend_path(point);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        let sweep = if end < start {
            (end - start).rem_euclid(TAU)
        } else {
            end - start
        };
        let segments = ((sweep / ARC_STEP).ceil() as usize).max(1);
        for i in 0..=segments {
            let angle = start + sweep * i as f64 / segments as f64;
            let point = self.device(x + radius * angle.cos(), y + radius * angle.sin());
            self.extend_path(point);
        }
    }

    fn fill(&mut self) {
        fill_polygon(&mut self.image, &self.subpaths, self.state.fill);
        self.subpaths.clear();
    }

    fn stroke(&mut self) {
        if let Some(color) = self.state.stroke {
            let width = self.device_line_width();
            for subpath in &self.subpaths {
                for segment in subpath.windows(2) {
                    stroke_segment(&mut self.image, segment[0], segment[1], width, color);
                }
            }
        }
        self.subpaths.clear();
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let corners = vec![
            self.device(x, y),
            self.device(x + width, y),
            self.device(x + width, y + height),
            self.device(x, y + height),
        ];
        fill_polygon(&mut self.image, &[corners], self.state.fill);
    }

    fn fill_ellipse(&mut self, x: f64, y: f64, radius_x: f64, radius_y: f64) {
        let points = (0..ELLIPSE_SEGMENTS)
            .map(|i| {
                let angle = TAU * i as f64 / ELLIPSE_SEGMENTS as f64;
                self.device(x + radius_x * angle.cos(), y + radius_y * angle.sin())
            })
            .collect();
        fill_polygon(&mut self.image, &[points], self.state.fill);
    }

    /// Text is drawn upright with a one unit black outline.
    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let Some(font) = &self.font else {
            return;
        };
        let size = (self.state.font.size * self.scale) as f32;
        for (dx, dy) in [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)] {
            let origin = self.device(x + dx, y + dy);
            draw_glyphs(&mut self.image, font, size, origin, text, Color::BLACK);
        }
        let origin = self.device(x, y);
        draw_glyphs(&mut self.image, font, size, origin, text, self.state.fill);
    }

    fn save(&mut self) {
        self.transforms.push();
    }

    fn restore(&mut self) -> Result<(), BackendError> {
        self.transforms.pop().map(|_| ())
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.transforms.translate(x, y);
    }

    fn rotate(&mut self, angle: f64) {
        self.transforms.rotate(angle);
    }

    fn transform_depth(&self) -> usize {
        self.transforms.depth()
    }

    fn clear(&mut self) {
        let background = match self.mode {
            ColorMode::Rgb => Color::BLACK,
            ColorMode::Rgba => Color::TRANSPARENT,
        };
        for pixel in self.image.pixels_mut() {
            *pixel = background.into();
        }
    }

    fn image_data(&self) -> Result<RgbaImage, BackendError> {
        Ok(self.image.clone())
    }

    fn put_image_data(&mut self, image: &RgbaImage, x: f64, y: f64) -> Result<(), BackendError> {
        let (x, y) = self.device(x, y);
        imageops::replace(&mut self.image, image, x.round() as i64, y.round() as i64);
        Ok(())
    }

    fn take_picture(&self) -> Option<RgbaImage> {
        Some(self.image.clone())
    }
}

/// Source-over compositing of `color` scaled by `coverage`.
fn blend(image: &mut RgbaImage, x: i64, y: i64, color: Color, coverage: f64) {
    if x < 0 || y < 0 || x >= i64::from(image.width()) || y >= i64::from(image.height()) {
        return;
    }
    let alpha = f64::from(color.alpha) / 255.0 * coverage.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    let pixel = image.get_pixel_mut(x as u32, y as u32);
    if alpha >= 1.0 {
        *pixel = color.into();
        return;
    }
    let [red, green, blue, destination] = pixel.0;
    let destination = f64::from(destination) / 255.0;
    let out = alpha + destination * (1.0 - alpha);
    let mix = |source: u8, target: u8| {
        ((f64::from(source) * alpha + f64::from(target) * destination * (1.0 - alpha)) / out)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    pixel.0 = [
        mix(color.red, red),
        mix(color.green, green),
        mix(color.blue, blue),
        (out * 255.0).round() as u8,
    ];
}

/// Even-odd scanline fill sampling pixel centers. Every ring is closed implicitly.
fn fill_polygon(image: &mut RgbaImage, rings: &[Vec<(f64, f64)>], color: Color) {
    let edges = rings
        .iter()
        .filter(|ring| ring.len() >= 3)
        .flat_map(|ring| {
            ring.iter()
                .zip(ring.iter().cycle().skip(1))
                .map(|(a, b)| (*a, *b))
        })
        .collect::<Vec<_>>();
    if edges.is_empty() {
        return;
    }

    let (min_y, max_y) = edges.iter().fold((f64::MAX, f64::MIN), |(lo, hi), (a, b)| {
        (lo.min(a.1).min(b.1), hi.max(a.1).max(b.1))
    });
    let first_row = ((min_y - 0.5).ceil() as i64).max(0);
    let last_row = ((max_y - 0.5).floor() as i64).min(i64::from(image.height()) - 1);
    let last_column = i64::from(image.width()) - 1;

    for row in first_row..=last_row {
        let center = row as f64 + 0.5;
        let mut crossings = edges
            .iter()
            .filter(|(a, b)| (a.1 <= center && b.1 > center) || (b.1 <= center && a.1 > center))
            .map(|(a, b)| a.0 + (center - a.1) * (b.0 - a.0) / (b.1 - a.1))
            .collect::<Vec<_>>();
        crossings.sort_by(f64::total_cmp);
        for span in crossings.chunks_exact(2) {
            let start = ((span[0] - 0.5).ceil() as i64).max(0);
            let end = ((span[1] - 0.5).ceil() as i64 - 1).min(last_column);
            for column in start..=end {
                blend(image, column, row, color, 1.0);
            }
        }
    }
}

fn stroke_segment(
    image: &mut RgbaImage,
    from: (f64, f64),
    to: (f64, f64),
    width: f64,
    color: Color,
) {
    if width <= 1.5 {
        draw_thin_line(image, from, to, color);
        return;
    }
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = dx.hypot(dy);
    if length < f64::EPSILON {
        return;
    }
    let (nx, ny) = (-dy / length * width / 2.0, dx / length * width / 2.0);
    let quad = vec![
        (from.0 + nx, from.1 + ny),
        (to.0 + nx, to.1 + ny),
        (to.0 - nx, to.1 - ny),
        (from.0 - nx, from.1 - ny),
    ];
    fill_polygon(image, &[quad], color);
}

/// Bresenham line between the pixels containing both endpoints.
fn draw_thin_line(image: &mut RgbaImage, from: (f64, f64), to: (f64, f64), color: Color) {
    let (mut x, mut y) = (from.0.floor() as i64, from.1.floor() as i64);
    let (x1, y1) = (to.0.floor() as i64, to.1.floor() as i64);
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut error = dx + dy;
    loop {
        blend(image, x, y, color, 1.0);
        if x == x1 && y == y1 {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += sx;
        }
        if doubled <= dx {
            error += dx;
            y += sy;
        }
    }
}

fn draw_glyphs(
    image: &mut RgbaImage,
    font: &FontArc,
    size: f32,
    origin: (f64, f64),
    text: &str,
    color: Color,
) {
    let scaled = font.as_scaled(PxScale::from(size));
    let mut caret = origin.0 as f32;
    let baseline = origin.1 as f32;
    let mut previous: Option<GlyphId> = None;
    for character in text.chars() {
        let id = scaled.glyph_id(character);
        if let Some(previous) = previous {
            caret += scaled.kern(previous, id);
        }
        let glyph = id.with_scale_and_position(size, point(caret, baseline));
        caret += scaled.h_advance(id);
        previous = Some(id);
        if let Some(outlined) = font.outline_glyph(glyph) {
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                blend(
                    image,
                    bounds.min.x as i64 + i64::from(gx),
                    bounds.min.y as i64 + i64::from(gy),
                    color,
                    f64::from(coverage),
                );
            });
        }
    }
}
