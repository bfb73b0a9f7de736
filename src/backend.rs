//! Backend-agnostic 2D drawing.
//!
//! A [`Backend`] exposes a small vector-graphics instruction set. The primitives (path building,
//! fill and stroke, transforms, text, pixel access) are mandatory for every backend; the
//! higher-level vocabulary used by the world and its robots (shapes, lines, arcs, push/pop) is
//! provided on top of them so that every backend produces the same logical picture.
//!
//! All coordinates are logical units. Backends multiply by their device scale factor after
//! applying the active transforms.

mod command;
mod raster;
mod transform;
mod vector;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Color;

pub use command::{replay, DrawCommand};
pub use raster::{ColorMode, PictureFormat, RasterBackend};
pub use transform::{Transform, TransformStack};
pub use vector::VectorBackend;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub size: f64,
    pub family: String,
}

impl Font {
    pub fn new(size: f64, family: impl Into<String>) -> Self {
        Self {
            size,
            family: family.into(),
        }
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(8.0, "sans-serif")
    }
}

/// Style state shared by all backends.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawState {
    pub fill: Color,
    /// `None` strokes nothing.
    pub stroke: Option<Color>,
    pub line_width: f64,
    pub font: Font,
    shape_started: bool,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            stroke: None,
            line_width: 1.0,
            font: Font::default(),
            shape_started: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("restore without a matching save")]
    UnbalancedRestore,
    #[error("{backend} backend does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },
    #[error("{0} is unavailable in this build")]
    Unavailable(&'static str),
    #[error("rasterization failed: {0}")]
    Rasterize(String),
    #[error("image encoding failed")]
    Encode(#[from] image::ImageError),
}

pub trait Backend {
    /// Logical width.
    fn width(&self) -> f64;

    /// Logical height.
    fn height(&self) -> f64;

    /// Device pixels per logical unit.
    fn scale(&self) -> f64;

    fn state(&self) -> &DrawState;

    fn state_mut(&mut self) -> &mut DrawState;

    /// Resizes the surface. Transforms are reset before the new size and scale take effect, so
    /// no transform from before the resize survives it.
    fn update_dimensions(&mut self, width: f64, height: f64, scale: f64);

    fn begin_path(&mut self);

    fn move_to(&mut self, x: f64, y: f64);

    fn line_to(&mut self, x: f64, y: f64);

    /// Adds a circular arc around `(x, y)` to the current path, angles in radians.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64);

    /// Fills and then discards the current path.
    fn fill(&mut self);

    /// Strokes and then discards the current path.
    fn stroke(&mut self);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Axis-aligned ellipse centered at `(x, y)`.
    fn fill_ellipse(&mut self, x: f64, y: f64, radius_x: f64, radius_y: f64);

    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    fn save(&mut self);

    fn restore(&mut self) -> Result<(), BackendError>;

    fn translate(&mut self, x: f64, y: f64);

    fn rotate(&mut self, angle: f64);

    /// Number of saves without a matching restore.
    fn transform_depth(&self) -> usize;

    fn clear(&mut self);

    fn image_data(&self) -> Result<RgbaImage, BackendError>;

    fn put_image_data(&mut self, image: &RgbaImage, x: f64, y: f64) -> Result<(), BackendError>;

    /// Still image of the current surface, `None` if this backend cannot produce one.
    fn take_picture(&self) -> Option<RgbaImage>;

    fn set_stroke_color(&mut self, color: Color) {
        self.state_mut().stroke = Some(color);
    }

    fn no_stroke(&mut self) {
        self.state_mut().stroke = None;
    }

    /// Stroke color and width in one go, `None` strokes nothing.
    fn stroke_style(&mut self, color: Option<Color>, width: f64) {
        let state = self.state_mut();
        state.stroke = color;
        state.line_width = width;
    }

    fn set_fill_color(&mut self, color: Color) {
        self.state_mut().fill = color;
    }

    fn set_line_width(&mut self, width: f64) {
        self.state_mut().line_width = width;
    }

    fn set_font(&mut self, font: Font) {
        self.state_mut().font = font;
    }

    fn begin_shape(&mut self) {
        self.state_mut().shape_started = false;
        self.begin_path();
    }

    /// The first vertex of a shape moves, every following one draws a line.
    fn vertex(&mut self, x: f64, y: f64) {
        if self.state().shape_started {
            self.line_to(x, y);
        } else {
            self.move_to(x, y);
            self.state_mut().shape_started = true;
        }
    }

    fn end_shape(&mut self) {
        self.fill();
        self.state_mut().shape_started = false;
    }

    fn draw_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.fill_rect(x, y, width, height);
    }

    fn draw_ellipse(&mut self, x: f64, y: f64, radius_x: f64, radius_y: f64) {
        self.fill_ellipse(x, y, radius_x, radius_y);
    }

    fn draw_line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.begin_path();
        self.move_to(x1, y1);
        self.line_to(x2, y2);
        self.stroke();
    }

    /// Filled wedge with a visible rim. The wedge is filled without outline first, then only the
    /// outer arc is stroked with the current stroke color, so the radial edges stay invisible.
    fn draw_arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        let stroke = self.state().stroke;

        self.no_stroke();
        self.begin_path();
        self.move_to(x, y);
        self.arc(x, y, radius, start, end);
        self.line_to(x, y);
        self.fill();

        self.state_mut().stroke = stroke;
        self.begin_path();
        self.arc(x, y, radius, start, end);
        self.stroke();
    }

    fn text(&mut self, text: &str, x: f64, y: f64) {
        self.fill_text(text, x, y);
    }

    fn push_matrix(&mut self) {
        self.save();
    }

    fn pop_matrix(&mut self) -> Result<(), BackendError> {
        self.restore()
    }
}

/// Rounds to two decimals, the precision used for vector output.
pub(crate) fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_vertex_moves_then_draws_lines() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.set_fill_color(Color::rgb(1, 2, 3));
        backend.begin_shape();
        backend.vertex(1.0, 1.0);
        backend.vertex(5.0, 1.0);
        backend.vertex(5.0, 5.0);
        backend.end_shape();
        assert!(backend
            .to_svg()
            .contains(r#"<polygon points="1,1 5,1 5,5" style="fill:#010203"/>"#));
    }

    #[test]
    fn test_draw_arc_restores_stroke() {
        let mut backend = RasterBackend::new(10.0, 10.0, 1.0);
        backend.set_stroke_color(Color::WHITE);
        backend.draw_arc(5.0, 5.0, 3.0, 0.0, 1.0);
        assert_eq!(backend.state().stroke, Some(Color::WHITE));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(3.3333), 3.33);
        assert_eq!(round2(-0.001), 0.0);
        assert_eq!(round2(2.0).to_string(), "2");
    }
}
