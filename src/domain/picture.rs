//! Picture synthesis from camera ray hits.
//!
//! Every column is painted in two passes. The first paints sky, the closest full-height wall and
//! ground. The second overlays the lower obstacles (other robots) standing in front of that wall,
//! then composites robot sprites into the boxes their bands covered.

use std::{collections::BTreeMap, f64::consts::FRAC_PI_2};

use image::{imageops, RgbaImage};
use tracing::warn;

use super::{Angle, Camera, Color, Position, RayHit, Robot, RobotId, SpriteError, World};

const SKY: Color = Color::rgb(0, 0, 128);
const FLAT_GRAY: Color = Color::gray(42);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PictureKind {
    #[default]
    Color,
    Depth,
    Gray,
}

/// A pixel of the depth picture, both coordinates flipped so that x grows to the left and y
/// grows upwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CloudPoint {
    pub x: u32,
    pub y: u32,
    pub depth: u8,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// `1 - distance / size * factor`, clamped to `[0, 1]`.
pub fn fade(distance: f64, size: f64, factor: f64) -> f64 {
    if size <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / size * factor).clamp(0.0, 1.0)
}

/// Rows taken by sky above and ground below a wall seen at `distance`, in total.
pub fn sky_rows(distance: f64, size: f64, size_fade: f64, height: u32) -> f64 {
    (1.0 - fade(distance, size, size_fade)) * f64::from(height)
}

/// Closest full-height hit of a column.
fn closest_wall(column: &[RayHit]) -> Option<&RayHit> {
    column.iter().rev().find(|hit| hit.height >= 1.0)
}

fn shade(kind: PictureKind, hit: &RayHit, size: f64, colors_fade: f64) -> Color {
    let sc = fade(hit.distance, size, colors_fade);
    match kind {
        PictureKind::Color => {
            let faded = hit.color.scaled(sc);
            Color::rgb(faded.red, faded.green, faded.blue)
        }
        PictureKind::Depth => Color::gray_f64(255.0 * fade(hit.distance, size, 1.0)),
        PictureKind::Gray => Color::gray_f64(hit.color.average() * sc),
    }
}

struct Painter<'a> {
    camera: &'a Camera,
    world: &'a World,
    kind: PictureKind,
    size: f64,
    /// Ground line pairs from near to far, only with a ground image.
    visible_area: Option<Vec<(Position, Position)>>,
}

impl Painter<'_> {
    fn sky(&self, dist: f64) -> Color {
        match self.kind {
            PictureKind::Depth if self.camera.reflect_sky() => Color::gray_f64(255.0 * dist),
            PictureKind::Depth => Color::BLACK,
            PictureKind::Color => SKY,
            PictureKind::Gray => FLAT_GRAY,
        }
    }

    fn ground(&self, dist: f64, column: u32, row: u32) -> Color {
        match self.kind {
            PictureKind::Depth if self.camera.reflect_ground() => Color::gray_f64(255.0 * dist),
            PictureKind::Depth => Color::BLACK,
            PictureKind::Color => self
                .ground_sample(column, row)
                .unwrap_or_else(|| self.world.ground_color()),
            PictureKind::Gray => FLAT_GRAY,
        }
    }

    /// Ground image pixel under a ground row, interpolated across the field of view.
    fn ground_sample(&self, column: u32, row: u32) -> Option<Color> {
        let area = self.visible_area.as_ref()?;
        let height = f64::from(self.camera.height());
        let index = ((height - f64::from(row)) / height / 2.0 * area.len() as f64).round() as usize;
        let (left, right) = area.get(index.min(area.len().checked_sub(1)?))?;
        let point = left.lerp(*right, f64::from(column) / f64::from(self.camera.width()));
        self.world.ground_pixel(point)
    }
}

/// Points along both edges of the field of view, one unit apart, no farther than the world
/// diagonal.
fn visible_area(camera: &Camera, robot: &Robot, world: &World) -> Vec<(Position, Position)> {
    let half = Angle::new(camera.fov().radians() / 2.0);
    let steps = camera
        .max_range()
        .min(world.width().hypot(world.height()))
        .max(0.0);
    (0..steps as usize)
        .map(|step| {
            let step = step as f64;
            (
                robot.rotate_around(step, -half),
                robot.rotate_around(step, half),
            )
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Obstacle {
    min_x: i64,
    max_x: i64,
    max_y: i64,
}

impl Obstacle {
    fn new() -> Self {
        Self {
            min_x: i64::MAX,
            max_x: i64::MIN,
            max_y: i64::MIN,
        }
    }

    /// Widens the box to a band standing on `bottom` in column `x`.
    fn record(&mut self, x: i64, bottom: i64) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(bottom);
    }

    /// Scales `frame` to the box width and stands it on the box bottom.
    fn composite(&self, image: &mut RgbaImage, frame: &RgbaImage) -> Result<(), SpriteError> {
        let width = self.max_x - self.min_x + 1;
        let height = i64::from(frame.height()) * width / i64::from(frame.width().max(1));
        if width <= 0 || height <= 0 {
            return Err(SpriteError::Degenerate { width, height });
        }
        let resized = imageops::resize(
            frame,
            width as u32,
            height as u32,
            imageops::FilterType::Triangle,
        );
        imageops::overlay(image, &resized, self.min_x, self.max_y - height + 1);
        Ok(())
    }
}

fn put(image: &mut RgbaImage, x: u32, y: i64, color: Color) {
    if (0..i64::from(image.height())).contains(&y) && x < image.width() {
        image.put_pixel(x, y as u32, color.into());
    }
}

pub(super) fn render(
    camera: &Camera,
    robot: &Robot,
    world: &World,
    hits: &[Vec<RayHit>],
    kind: PictureKind,
) -> RgbaImage {
    let painter = Painter {
        camera,
        world,
        kind,
        size: world.width().max(world.height()),
        visible_area: world
            .ground_image()
            .map(|_| visible_area(camera, robot, world)),
    };
    let (width, height) = (camera.width(), camera.height());
    let rows = f64::from(height);
    let horizon = rows / 2.0;
    let mut image = RgbaImage::new(width, height);

    for (column, hits) in (0..width).zip(hits) {
        let wall = closest_wall(hits).map(|hit| {
            (
                sky_rows(hit.distance, painter.size, camera.size_fade(), height),
                shade(kind, hit, painter.size, camera.colors_fade()),
            )
        });
        for row in 0..height {
            let y = f64::from(row);
            let dist = ((y - horizon).abs() / horizon).clamp(0.0, 1.0);
            let color = match wall {
                Some((high, _)) if y < high / 2.0 => painter.sky(dist),
                Some((high, color)) if y < rows - high / 2.0 => color,
                Some(_) => painter.ground(dist, column, row),
                None => painter.sky(dist),
            };
            image.put_pixel(column, row, color.into());
        }
    }

    let mut obstacles = BTreeMap::<RobotId, Obstacle>::new();
    for (column, hits) in (0..width).zip(hits) {
        let wall_distance = closest_wall(hits).map_or(f64::INFINITY, |hit| hit.distance);
        for hit in hits.iter().rev().filter(|hit| hit.height < 1.0) {
            if hit.distance > wall_distance {
                break;
            }
            let Some(id) = hit.robot else {
                continue;
            };
            let s = fade(hit.distance, painter.size, camera.size_fade());
            let sc = fade(hit.distance, painter.size, camera.colors_fade());
            let distance_to = (horizon * (1.0 - sc)).round() as i64;
            let band = (hit.height * horizon * s).round() as i64;
            let bottom = i64::from(height) - 1 - distance_to;
            obstacles
                .entry(id)
                .or_insert_with(Obstacle::new)
                .record(i64::from(column), bottom);
            if !world.robot(id).is_some_and(Robot::has_sprite) {
                let color = shade(kind, hit, painter.size, camera.colors_fade());
                for k in 0..band {
                    put(&mut image, column, bottom - k, color);
                }
            }
        }
    }

    for (id, obstacle) in &obstacles {
        let Some(other) = world.robot(*id) else {
            continue;
        };
        let Some(sprite) = other.sprite() else {
            continue;
        };
        let bearing = (other.x() - robot.x()).atan2(other.y() - robot.y())
            + FRAC_PI_2
            + other.direction().radians();
        let frame = sprite.frame(bearing.to_degrees().round() as i64);
        if let Err(error) = obstacle.composite(&mut image, frame) {
            warn!(robot = other.name(), "skipping sprite: {error}");
        }
    }

    image
}

pub(super) fn point_cloud(depth: &RgbaImage, color: &RgbaImage) -> Vec<CloudPoint> {
    let (width, height) = depth.dimensions();
    (0..width)
        .flat_map(|x| (0..height).map(move |y| (x, y)))
        .filter_map(|(x, y)| {
            let depth = depth.get_pixel(x, y).0[0];
            let [red, green, blue, _] = color.get_pixel(x, y).0;
            (depth != u8::MAX).then_some(CloudPoint {
                x: width - x - 1,
                y: height - y - 1,
                depth,
                red,
                green,
                blue,
            })
        })
        .collect()
}
