//! Recorded drawing instructions.
//!
//! Debug overlays are collected while the world computes a step and replayed later on whatever
//! backend is active.

use super::{Backend, BackendError, Font};
use crate::domain::Color;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    SetStrokeColor(Color),
    NoStroke,
    SetFillColor(Color),
    SetLineWidth(f64),
    SetFont(Font),
    BeginShape,
    Vertex {
        x: f64,
        y: f64,
    },
    EndShape,
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
    },
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start: f64,
        end: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
    },
    Push,
    Pop,
    Translate {
        x: f64,
        y: f64,
    },
    Rotate(f64),
    Clear,
}

impl DrawCommand {
    pub fn apply(&self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        match self {
            DrawCommand::SetStrokeColor(color) => backend.set_stroke_color(*color),
            DrawCommand::NoStroke => backend.no_stroke(),
            DrawCommand::SetFillColor(color) => backend.set_fill_color(*color),
            DrawCommand::SetLineWidth(width) => backend.set_line_width(*width),
            DrawCommand::SetFont(font) => backend.set_font(font.clone()),
            DrawCommand::BeginShape => backend.begin_shape(),
            DrawCommand::Vertex { x, y } => backend.vertex(*x, *y),
            DrawCommand::EndShape => backend.end_shape(),
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
            } => backend.draw_rect(*x, *y, *width, *height),
            DrawCommand::Ellipse {
                x,
                y,
                radius_x,
                radius_y,
            } => backend.draw_ellipse(*x, *y, *radius_x, *radius_y),
            DrawCommand::Arc {
                x,
                y,
                radius,
                start,
                end,
            } => backend.draw_arc(*x, *y, *radius, *start, *end),
            DrawCommand::Line { x1, y1, x2, y2 } => backend.draw_line(*x1, *y1, *x2, *y2),
            DrawCommand::Text { text, x, y } => backend.text(text, *x, *y),
            DrawCommand::Push => backend.push_matrix(),
            DrawCommand::Pop => backend.pop_matrix()?,
            DrawCommand::Translate { x, y } => backend.translate(*x, *y),
            DrawCommand::Rotate(angle) => backend.rotate(*angle),
            DrawCommand::Clear => backend.clear(),
        }
        Ok(())
    }
}

/// Applies `commands` in order, stopping at the first failing one.
pub fn replay(commands: &[DrawCommand], backend: &mut dyn Backend) -> Result<(), BackendError> {
    commands
        .iter()
        .try_for_each(|command| command.apply(backend))
}
