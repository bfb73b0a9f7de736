//! SVG backend building a scene graph of groups and primitives.

use std::{f64::consts::PI, fmt};

use image::RgbaImage;
use tracing::warn;

use super::{round2, Backend, BackendError, DrawState, Transform};
use crate::domain::Color;

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Group(Group),
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        style: String,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
        style: String,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        style: String,
    },
    Line {
        from: (f64, f64),
        to: (f64, f64),
        style: String,
    },
    Path {
        d: String,
        style: String,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        style: String,
    },
}

/// A `<g>` element. Groups opened by `save` count towards the transform depth; groups opened by a
/// transform issued after something was already drawn only scope that transform.
#[derive(Clone, Debug, Default, PartialEq)]
struct Group {
    transforms: Vec<Transform>,
    children: Vec<Node>,
    saved: bool,
}

struct Number(f64);

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", round2(self.0))
    }
}

fn point((x, y): (f64, f64)) -> String {
    format!("{},{}", Number(x), Number(y))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn opacity(color: Color) -> Option<f64> {
    (!color.is_opaque()).then(|| round2(f64::from(color.alpha) / 255.0))
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.transforms.is_empty() {
            writeln!(f, "<g>")?;
        } else {
            let transforms = self
                .transforms
                .iter()
                .map(|transform| match *transform {
                    Transform::Translate { x, y } => {
                        format!("translate({},{})", Number(x), Number(y))
                    }
                    Transform::Rotate(angle) => format!("rotate({})", Number(angle * 180.0 / PI)),
                })
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, r#"<g transform="{transforms}">"#)?;
        }
        for child in &self.children {
            write!(f, "{child}")?;
        }
        writeln!(f, "</g>")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Group(group) => write!(f, "{group}"),
            Node::Rect {
                x,
                y,
                width,
                height,
                style,
            } => writeln!(
                f,
                r#"<rect x="{}" y="{}" width="{}" height="{}" style="{style}"/>"#,
                Number(*x),
                Number(*y),
                Number(*width),
                Number(*height)
            ),
            Node::Ellipse {
                cx,
                cy,
                rx,
                ry,
                style,
            } => writeln!(
                f,
                r#"<ellipse cx="{}" cy="{}" rx="{}" ry="{}" style="{style}"/>"#,
                Number(*cx),
                Number(*cy),
                Number(*rx),
                Number(*ry)
            ),
            Node::Polygon { points, style } => {
                let points = points.iter().map(|p| point(*p)).collect::<Vec<_>>();
                writeln!(
                    f,
                    r#"<polygon points="{}" style="{style}"/>"#,
                    points.join(" ")
                )
            }
            Node::Line { from, to, style } => writeln!(
                f,
                r#"<line x1="{}" y1="{}" x2="{}" y2="{}" style="{style}"/>"#,
                Number(from.0),
                Number(from.1),
                Number(to.0),
                Number(to.1)
            ),
            Node::Path { d, style } => writeln!(f, r#"<path d="{d}" style="{style}"/>"#),
            Node::Text { x, y, text, style } => writeln!(
                f,
                r#"<text x="{}" y="{}" style="{style}">{}</text>"#,
                Number(*x),
                Number(*y),
                escape(text)
            ),
        }
    }
}

pub struct VectorBackend {
    width: f64,
    height: f64,
    scale: f64,
    state: DrawState,
    root: Group,
    /// Groups opened above the root, innermost last.
    groups: Vec<Group>,
    points: Vec<(f64, f64)>,
}

impl VectorBackend {
    pub fn new(width: f64, height: f64, scale: f64) -> Self {
        Self {
            width,
            height,
            scale,
            state: DrawState::default(),
            root: Group::default(),
            groups: Vec::new(),
            points: Vec::new(),
        }
    }

    /// The SVG document. Groups still open are closed in the output without being restored.
    pub fn to_svg(&self) -> String {
        let mut root = self.root.clone();
        let mut groups = self.groups.clone();
        while let Some(group) = groups.pop() {
            groups
                .last_mut()
                .unwrap_or(&mut root)
                .children
                .push(Node::Group(group));
        }

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">"#,
            Number(self.width * self.scale),
            Number(self.height * self.scale),
            Number(self.width),
            Number(self.height)
        );
        svg.push('\n');
        if root.transforms.is_empty() {
            root.children
                .iter()
                .for_each(|child| svg.push_str(&child.to_string()));
        } else {
            svg.push_str(&root.to_string());
        }
        svg.push_str("</svg>\n");
        svg
    }

    /// Innermost open group, the root when nothing is saved.
    fn current(&mut self) -> &mut Group {
        self.groups.last_mut().unwrap_or(&mut self.root)
    }

    fn push(&mut self, node: Node) {
        self.current().children.push(node);
    }

    fn transform(&mut self, transform: Transform) {
        let current = self.current();
        if current.children.is_empty() {
            current.transforms.push(transform);
        } else {
            self.groups.push(Group {
                transforms: vec![transform],
                ..Group::default()
            });
        }
    }

    fn fill_css(&self) -> String {
        let fill = self.state.fill;
        match opacity(fill) {
            Some(opacity) => format!("fill:{};fill-opacity:{opacity}", fill.to_rgb_hexcode()),
            None => format!("fill:{}", fill.to_rgb_hexcode()),
        }
    }

    fn stroke_css(&self) -> Option<String> {
        let stroke = self.state.stroke?;
        let mut style = format!(
            "stroke:{};stroke-width:{}",
            stroke.to_rgb_hexcode(),
            Number(self.state.line_width)
        );
        if let Some(opacity) = opacity(stroke) {
            style.push_str(&format!(";stroke-opacity:{opacity}"));
        }
        Some(style)
    }

    fn text_css(&self) -> String {
        format!(
            "{};font-size:{}px;font-family:{}",
            self.fill_css(),
            Number(self.state.font.size),
            self.state.font.family
        )
    }

    #[cfg(feature = "svg-raster")]
    fn rasterize(&self) -> Result<RgbaImage, BackendError> {
        use resvg::{tiny_skia, usvg};

        let tree = usvg::Tree::from_str(&self.to_svg(), &usvg::Options::default())
            .map_err(|e| BackendError::Rasterize(e.to_string()))?;
        let size = tree.size().to_int_size();
        let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
            .ok_or_else(|| BackendError::Rasterize("empty canvas".to_string()))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        let mut image = RgbaImage::new(size.width(), size.height());
        for (pixel, source) in image.pixels_mut().zip(pixmap.pixels()) {
            let color = source.demultiply();
            pixel.0 = [color.red(), color.green(), color.blue(), color.alpha()];
        }
        Ok(image)
    }

    #[cfg(not(feature = "svg-raster"))]
    fn rasterize(&self) -> Result<RgbaImage, BackendError> {
        Err(BackendError::Unavailable("SVG rasterization"))
    }
}

impl Backend for VectorBackend {
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
        self.root = Group::default();
        self.groups.clear();
        self.points.clear();
        self.width = width;
        self.height = height;
        self.scale = scale;
    }

    fn begin_path(&mut self) {
        self.points.clear();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.points.push((x, y));
    }

    /// With a path in progress the arc closes it into a filled wedge, otherwise the arc itself is
    /// stroked.
    ///
    /// A sweep of a full turn or more is split in two half arcs, a single SVG arc between
    /// coinciding end points draws nothing.
    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64) {
        let polar = |angle: f64| point((x + radius * angle.cos(), y + radius * angle.sin()));
        let r = Number(radius);
        let arc = if end - start >= 2.0 * PI {
            format!(
                "M {} A {r},{r} 0 0,0 {} A {r},{r} 0 0,0 {}",
                polar(end),
                polar(start + PI),
                polar(start)
            )
        } else {
            let large_arc = u8::from((end - start).rem_euclid(2.0 * PI) > PI);
            format!(
                "M {} A {r},{r} 0 {large_arc},0 {}",
                polar(end),
                polar(start)
            )
        };

        if let Some(last) = self.points.last().copied() {
            let style = self.fill_css();
            self.push(Node::Path {
                d: format!("{arc} L {} Z", point(last)),
                style,
            });
            self.points.clear();
        } else if let Some(stroke) = self.stroke_css() {
            self.push(Node::Path {
                d: arc,
                style: format!("fill:none;{stroke}"),
            });
        }
    }

    fn fill(&mut self) {
        if self.points.len() >= 3 {
            let style = self.fill_css();
            let points = std::mem::take(&mut self.points);
            self.push(Node::Polygon { points, style });
        }
        self.points.clear();
    }

    fn stroke(&mut self) {
        if let Some(style) = self.stroke_css() {
            let lines = self
                .points
                .windows(2)
                .map(|segment| Node::Line {
                    from: segment[0],
                    to: segment[1],
                    style: style.clone(),
                })
                .collect::<Vec<_>>();
            lines.into_iter().for_each(|line| self.push(line));
        }
        self.points.clear();
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        let style = self.fill_css();
        self.push(Node::Rect {
            x,
            y,
            width,
            height,
            style,
        });
    }

    fn fill_ellipse(&mut self, x: f64, y: f64, radius_x: f64, radius_y: f64) {
        let style = self.fill_css();
        self.push(Node::Ellipse {
            cx: x,
            cy: y,
            rx: radius_x,
            ry: radius_y,
            style,
        });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        let style = self.text_css();
        self.push(Node::Text {
            x,
            y,
            text: text.to_string(),
            style,
        });
    }

    fn save(&mut self) {
        self.groups.push(Group {
            saved: true,
            ..Group::default()
        });
    }

    /// Closes every group opened since the matching `save`.
    fn restore(&mut self) -> Result<(), BackendError> {
        if !self.groups.iter().any(|group| group.saved) {
            return Err(BackendError::UnbalancedRestore);
        }
        while let Some(group) = self.groups.pop() {
            let saved = group.saved;
            self.current().children.push(Node::Group(group));
            if saved {
                break;
            }
        }
        Ok(())
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.transform(Transform::Translate { x, y });
    }

    fn rotate(&mut self, angle: f64) {
        self.transform(Transform::Rotate(angle));
    }

    fn transform_depth(&self) -> usize {
        self.groups.iter().filter(|group| group.saved).count()
    }

    fn clear(&mut self) {
        self.root.children.clear();
        self.groups
            .iter_mut()
            .for_each(|group| group.children.clear());
        self.points.clear();
    }

    fn image_data(&self) -> Result<RgbaImage, BackendError> {
        self.rasterize()
    }

    fn put_image_data(
        &mut self,
        _image: &RgbaImage,
        _x: f64,
        _y: f64,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            backend: "vector",
            operation: "put_image_data",
        })
    }

    fn take_picture(&self) -> Option<RgbaImage> {
        self.rasterize()
            .inspect_err(|e| warn!("cannot take picture of vector surface: {e}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_document() {
        let mut backend = VectorBackend::new(40.0, 20.0, 2.0);
        backend.set_fill_color(Color::rgb(0, 128, 0));
        backend.fill_rect(0.0, 0.0, 40.0, 20.0);
        backend.save();
        backend.translate(10.0, 5.0);
        backend.rotate(0.5 * PI);
        backend.set_fill_color(Color::rgba(255, 0, 0, 128));
        backend.fill_ellipse(0.0, 0.0, 2.0, 1.0);
        backend.restore().unwrap();
        backend.set_fill_color(Color::WHITE);
        backend.fill_text("a < b", 1.0, 19.0);

        insta::assert_snapshot!(backend.to_svg(), @r###"
        <svg xmlns="http://www.w3.org/2000/svg" width="80" height="40" viewBox="0 0 40 20">
        <rect x="0" y="0" width="40" height="20" style="fill:#008000"/>
        <g transform="translate(10,5) rotate(90)">
        <ellipse cx="0" cy="0" rx="2" ry="1" style="fill:#FF0000;fill-opacity:0.5"/>
        </g>
        <text x="1" y="19" style="fill:#FFFFFF;font-size:8px;font-family:sans-serif">a &lt; b</text>
        </svg>
        "###);
    }

    #[test]
    fn test_transform_after_drawing_opens_group() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.save();
        backend.fill_rect(0.0, 0.0, 1.0, 1.0);
        backend.translate(3.0, 3.0);
        backend.fill_rect(0.0, 0.0, 1.0, 1.0);
        assert_eq!(backend.transform_depth(), 1);
        backend.restore().unwrap();
        assert_eq!(backend.transform_depth(), 0);
        let svg = backend.to_svg();
        let untransformed = svg.find(r#"<rect x="0""#).unwrap();
        let group = svg.find(r#"<g transform="translate(3,3)">"#).unwrap();
        assert!(untransformed < group);
    }

    #[test]
    fn test_pie_and_rim() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.set_fill_color(Color::BLACK);
        backend.set_stroke_color(Color::WHITE);
        backend.draw_arc(5.0, 5.0, 2.0, 0.0, 0.5 * PI);
        let svg = backend.to_svg();
        assert!(svg.contains(r#"<path d="M 5,7 A 2,2 0 0,0 7,5 L 5,5 Z" style="fill:#000000"/>"#));
        assert!(svg.contains(
            r#"<path d="M 5,7 A 2,2 0 0,0 7,5" style="fill:none;stroke:#FFFFFF;stroke-width:1"/>"#
        ));
        assert!(!svg.contains("<line"));
    }

    #[test]
    fn test_full_circle_arc_is_split() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.set_stroke_color(Color::WHITE);
        backend.arc(5.0, 5.0, 2.0, 0.0, 2.0 * PI);
        assert!(backend.to_svg().contains(
            r#"<path d="M 7,5 A 2,2 0 0,0 3,5 A 2,2 0 0,0 7,5" style="fill:none;stroke:#FFFFFF;stroke-width:1"/>"#
        ));
    }

    #[test]
    fn test_resize_drops_groups() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.save();
        backend.translate(3.0, 3.0);
        backend.update_dimensions(8.0, 8.0, 2.0);
        assert_eq!(backend.transform_depth(), 0);

        backend.fill_rect(0.0, 0.0, 1.0, 1.0);
        let svg = backend.to_svg();
        assert!(!svg.contains("<g"));
        assert!(svg.contains(r#"<rect x="0" y="0" width="1" height="1""#));
        assert!(svg.contains(r#"width="16" height="16" viewBox="0 0 8 8""#));
    }

    #[test]
    fn test_stroke_without_color_emits_nothing() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.no_stroke();
        backend.draw_line(0.0, 0.0, 1.0, 1.0);
        assert!(!backend.to_svg().contains("<line"));
    }

    #[test]
    fn test_unbalanced_restore() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.translate(1.0, 1.0);
        assert!(matches!(
            backend.restore(),
            Err(BackendError::UnbalancedRestore)
        ));
    }

    #[test]
    fn test_clear_keeps_open_groups() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        backend.fill_rect(0.0, 0.0, 1.0, 1.0);
        backend.save();
        backend.clear();
        assert_eq!(backend.transform_depth(), 1);
        assert!(!backend.to_svg().contains("<rect"));
    }

    #[test]
    fn test_put_image_data_is_unsupported() {
        let mut backend = VectorBackend::new(10.0, 10.0, 1.0);
        let image = RgbaImage::new(1, 1);
        assert!(matches!(
            backend.put_image_data(&image, 0.0, 0.0),
            Err(BackendError::Unsupported { .. })
        ));
    }

    #[cfg(not(feature = "svg-raster"))]
    #[test]
    fn test_take_picture_unavailable() {
        let backend = VectorBackend::new(10.0, 10.0, 1.0);
        assert!(backend.take_picture().is_none());
    }

    #[cfg(feature = "svg-raster")]
    #[test]
    fn test_take_picture_rasterizes() {
        let mut backend = VectorBackend::new(10.0, 5.0, 2.0);
        backend.set_fill_color(Color::rgb(255, 0, 0));
        backend.fill_rect(0.0, 0.0, 10.0, 5.0);
        let image = backend.take_picture().unwrap();
        assert_eq!(image.dimensions(), (20, 10));
        assert_eq!(image.get_pixel(10, 5).0, [255, 0, 0, 255]);
    }
}
