//! Mobile robot with a rectangular footprint, simple differential kinematics and mounted cameras.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use image::RgbaImage;
use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    Angle, Camera, CameraConfig, Color, HasCollision, Line, Position, Velocity, World,
};
use crate::backend::{Backend, BackendError};

/// Index of a robot in its world.
pub type RobotId = usize;

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(0);

/// Intersection of a ray with a wall or with a robot footprint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub distance: f64,
    /// 1.0 for walls, the robot's relative height for footprints.
    pub height: f64,
    pub color: Color,
    pub robot: Option<RobotId>,
    pub position: Position,
}

#[derive(Clone, Debug)]
pub struct Robot {
    name: String,
    /// Unique per constructed robot, shared by its clones.
    identity: u64,
    id: Option<RobotId>,
    position: Position,
    direction: Angle,
    color: Color,
    height: f64,
    width: f64,
    length: f64,
    /// Forward speed in world units per second.
    va: Velocity,
    /// Turn rate in radians per second, positive turns clockwise on screen.
    vr: Velocity,
    stalled: bool,
    cameras: Vec<Camera>,
    sprite: Option<Sprite>,
}

impl Robot {
    pub const DEFAULT_COLOR: Color = Color::rgb(255, 0, 0);

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity: NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed),
            id: None,
            position: Position::default(),
            direction: Angle::default(),
            color: Self::DEFAULT_COLOR,
            height: 0.25,
            width: 10.0,
            length: 14.0,
            va: Velocity::default(),
            vr: Velocity::default(),
            stalled: false,
            cameras: Vec::new(),
            sprite: None,
        }
    }

    pub fn from_config(config: &RobotConfig) -> Self {
        Self {
            position: Position::new(config.x, config.y),
            direction: Angle::from_deg(config.direction),
            color: config.color,
            height: config.height,
            width: config.width,
            length: config.length,
            va: Velocity::new(config.va),
            vr: Velocity::new(config.vr),
            cameras: config.cameras.iter().map(Camera::from_config).collect(),
            ..Self::new(config.name.clone())
        }
    }

    pub fn to_config(&self) -> RobotConfig {
        RobotConfig {
            name: self.name.clone(),
            x: self.position.x(),
            y: self.position.y(),
            direction: self.direction.as_deg(),
            color: self.color,
            height: self.height,
            width: self.width,
            length: self.length,
            va: self.va.into(),
            vr: self.vr.into(),
            cameras: self.cameras.iter().map(Camera::to_config).collect(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_direction(mut self, direction: Angle) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_size(mut self, width: f64, length: f64) -> Self {
        self.width = width;
        self.length = length;
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.cameras.push(camera);
        self
    }

    pub fn with_sprite(mut self, sprite: Sprite) -> Self {
        self.sprite = Some(sprite);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both are the same robot, a clone counts as the same robot.
    pub fn is_same(&self, other: &Robot) -> bool {
        self.identity == other.identity
    }

    /// Index in the world, `None` until the robot was added to one.
    pub fn id(&self) -> Option<RobotId> {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn x(&self) -> f64 {
        self.position.x()
    }

    pub fn y(&self) -> f64 {
        self.position.y()
    }

    pub fn direction(&self) -> Angle {
        self.direction
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Height relative to a wall.
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn velocity(&self) -> (Velocity, Velocity) {
        (self.va, self.vr)
    }

    /// Whether the last step was blocked by a collision.
    pub fn stalled(&self) -> bool {
        self.stalled
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn camera(&self, index: usize) -> Option<&Camera> {
        self.cameras.get(index)
    }

    pub fn sprite(&self) -> Option<&Sprite> {
        self.sprite.as_ref()
    }

    pub fn has_sprite(&self) -> bool {
        self.sprite.is_some()
    }

    pub fn set_pose(&mut self, position: Position, direction: Angle) {
        self.position = position;
        self.direction = direction;
    }

    pub fn set_velocity(&mut self, va: Velocity, vr: Velocity) {
        self.va = va;
        self.vr = vr;
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_sprite(&mut self, sprite: Option<Sprite>) {
        self.sprite = sprite;
    }

    /// Point at `length` from the robot's center, `angle` relative to its direction.
    pub fn rotate_around(&self, length: f64, angle: Angle) -> Position {
        self.position.offset(length, self.direction + angle)
    }

    pub fn footprint(&self) -> Footprint {
        Footprint {
            position: self.position,
            direction: self.direction,
            width: self.width,
            length: self.length,
        }
    }

    /// Footprint after moving for `dt` with the current velocities.
    pub fn advanced(&self, dt: Duration) -> Footprint {
        let dt = dt.as_secs_f64();
        let va: f64 = self.va.into();
        let vr: f64 = self.vr.into();
        Footprint {
            position: self.position.offset(va * dt, self.direction),
            direction: self.direction + Angle::new(vr * dt),
            ..self.footprint()
        }
    }

    /// Casts a ray from `(x, y)` against every wall except the robot's own footprint.
    ///
    /// The ray runs along `(sin angle, cos angle)`. Hits are ordered farthest first.
    pub fn cast_ray(
        &self,
        world: &World,
        x: f64,
        y: f64,
        angle: Angle,
        max_range: f64,
    ) -> Vec<RayHit> {
        let origin = Position::new(x, y);
        let ray = Line::new(
            origin,
            origin
                + Position::new(
                    angle.radians().sin() * max_range,
                    angle.radians().cos() * max_range,
                ),
        );
        let mut hits = world
            .walls()
            .iter()
            .filter(|wall| wall.robot.is_none() || wall.robot != self.id)
            .flat_map(|wall| {
                let height = wall
                    .robot
                    .and_then(|id| world.robot(id))
                    .map_or(1.0, Robot::height);
                wall.lines.iter().filter_map(move |line| {
                    super::intersect_segments(&ray, line).map(|position| RayHit {
                        distance: origin.distance(position),
                        height,
                        color: wall.color,
                        robot: wall.robot,
                        position,
                    })
                })
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        hits
    }

    /// Draws the body and its cameras in robot coordinates.
    pub fn draw(&self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        backend.push_matrix();
        backend.translate(self.position.x(), self.position.y());
        backend.rotate(self.direction.radians());

        backend.set_fill_color(self.color);
        backend.no_stroke();
        backend.begin_shape();
        for (x, y) in self.footprint().local_corners() {
            backend.vertex(x, y);
        }
        backend.end_shape();

        for camera in &self.cameras {
            camera.draw(backend);
        }

        backend.pop_matrix()
    }

    pub(crate) fn attach(&mut self, id: RobotId) {
        self.id = Some(id);
        for camera in &mut self.cameras {
            camera.mount(id);
        }
    }

    pub(crate) fn camera_mut(&mut self, index: usize) -> Option<&mut Camera> {
        self.cameras.get_mut(index)
    }

    pub(crate) fn cameras_mut(&mut self) -> impl Iterator<Item = &mut Camera> {
        self.cameras.iter_mut()
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub(crate) fn apply(&mut self, footprint: Footprint) {
        self.position = footprint.position;
        self.direction = footprint.direction;
        self.stalled = false;
    }

    pub(crate) fn stall(&mut self) {
        self.stalled = true;
    }
}

impl HasCollision for Robot {
    fn outline(&self) -> Vec<Line> {
        self.footprint().outline()
    }
}

/// Rectangular outline of a robot at some pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub position: Position,
    pub direction: Angle,
    pub width: f64,
    pub length: f64,
}

impl Footprint {
    /// Corners relative to the center with the front along the positive x-axis.
    fn local_corners(&self) -> [(f64, f64); 4] {
        let (front, side) = (self.length / 2.0, self.width / 2.0);
        [(front, -side), (front, side), (-front, side), (-front, -side)]
    }

    pub fn corners(&self) -> [Position; 4] {
        let rotation = Rotation2::new(self.direction.radians());
        self.local_corners().map(|(x, y)| {
            let corner = rotation * Vector2::new(x, y);
            self.position + Position::new(corner.x, corner.y)
        })
    }
}

impl HasCollision for Footprint {
    fn outline(&self) -> Vec<Line> {
        let corners = self.corners();
        (0..corners.len())
            .map(|i| Line::new(corners[i], corners[(i + 1) % corners.len()]))
            .collect()
    }
}

#[derive(Error, Debug)]
pub enum SpriteError {
    #[error("sprite has no frames")]
    NoFrames,
    #[error("sprite frame {0} is empty")]
    EmptyImage(usize),
    #[error("obstacle box {width}x{height} is too small for a sprite")]
    Degenerate { width: i64, height: i64 },
}

/// Views of a robot from evenly spaced bearings, starting at 0 degrees.
#[derive(Clone, Debug)]
pub struct Sprite {
    frames: Vec<RgbaImage>,
}

impl Sprite {
    pub fn new(frames: Vec<RgbaImage>) -> Result<Self, SpriteError> {
        if frames.is_empty() {
            return Err(SpriteError::NoFrames);
        }
        if let Some(index) = frames
            .iter()
            .position(|frame| frame.width() == 0 || frame.height() == 0)
        {
            return Err(SpriteError::EmptyImage(index));
        }
        Ok(Self { frames })
    }

    /// Frame closest to the bearing, in degrees.
    pub fn frame(&self, degrees: i64) -> &RgbaImage {
        let count = self.frames.len() as i64;
        let index = (degrees.rem_euclid(360) * count + 180) / 360 % count;
        &self.frames[index as usize]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Degrees.
    pub direction: f64,
    pub color: Color,
    pub height: f64,
    pub width: f64,
    pub length: f64,
    pub va: f64,
    pub vr: f64,
    pub cameras: Vec<CameraConfig>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Robot::new("Robot").to_config()
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{
        backend::VectorBackend,
        domain::{WorldConfig, WorldError},
    };

    const EPSILON: f64 = 1e-9;

    #[rstest]
    #[case::forward(0.0, 10.0, 0.0, (60.0, 50.0), 0.0)]
    #[case::facing_down(0.5 * PI, 10.0, 0.0, (50.0, 60.0), 0.5 * PI)]
    #[case::turning_in_place(0.0, 0.0, 0.5, (50.0, 50.0), 0.5)]
    fn test_advanced(
        #[case] direction: f64,
        #[case] va: f64,
        #[case] vr: f64,
        #[case] position: (f64, f64),
        #[case] expected_direction: f64,
    ) {
        let mut robot = Robot::new("r").with_position(50.0, 50.0);
        robot.set_pose(robot.position(), Angle::new(direction));
        robot.set_velocity(Velocity::new(va), Velocity::new(vr));
        let footprint = robot.advanced(Duration::from_secs(1));
        assert_abs_diff_eq!(footprint.position.x(), position.0, epsilon = EPSILON);
        assert_abs_diff_eq!(footprint.position.y(), position.1, epsilon = EPSILON);
        assert_abs_diff_eq!(
            footprint.direction.radians(),
            expected_direction,
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_footprint_corners_follow_direction() {
        let robot = Robot::new("r")
            .with_position(10.0, 10.0)
            .with_size(2.0, 4.0)
            .with_direction(Angle::new(0.5 * PI));
        let corners = robot.footprint().corners();
        assert_abs_diff_eq!(corners[0].x(), 11.0, epsilon = EPSILON);
        assert_abs_diff_eq!(corners[0].y(), 12.0, epsilon = EPSILON);
        assert_abs_diff_eq!(corners[2].x(), 9.0, epsilon = EPSILON);
        assert_abs_diff_eq!(corners[2].y(), 8.0, epsilon = EPSILON);
        assert_eq!(robot.outline().len(), 4);
    }

    #[test]
    fn test_rotate_around() {
        let robot = Robot::new("r")
            .with_position(5.0, 5.0)
            .with_direction(Angle::new(0.5 * PI));
        let point = robot.rotate_around(2.0, Angle::new(-0.5 * PI));
        assert_abs_diff_eq!(point.x(), 7.0, epsilon = EPSILON);
        assert_abs_diff_eq!(point.y(), 5.0, epsilon = EPSILON);
    }

    #[test]
    fn test_cast_ray_skips_own_footprint() -> Result<(), WorldError> {
        let mut world = World::new(WorldConfig {
            seed: 1,
            width: 100.0,
            height: 100.0,
            ..WorldConfig::default()
        })?;
        let viewer = world.add_robot(Robot::new("viewer").with_position(50.0, 50.0))?;
        world.add_robot(Robot::new("other").with_position(70.0, 50.0))?;

        let robot = world.robot(viewer).unwrap();
        let hits = robot.cast_ray(&world, 50.0, 50.0, Angle::new(0.5 * PI), 100.0);

        assert!(hits.iter().all(|hit| hit.robot != Some(viewer)));
        let distances = hits.iter().map(|hit| hit.distance).collect::<Vec<_>>();
        assert_eq!(distances.len(), 3);
        assert_abs_diff_eq!(distances[0], 50.0, epsilon = EPSILON);
        assert_abs_diff_eq!(distances[1], 27.0, epsilon = EPSILON);
        assert_abs_diff_eq!(distances[2], 13.0, epsilon = EPSILON);
        assert_abs_diff_eq!(hits[2].height, 0.25);
        assert_abs_diff_eq!(hits[0].height, 1.0);
        Ok(())
    }

    #[rstest]
    #[case::first(0, 0)]
    #[case::rounds_up(50, 1)]
    #[case::wraps(350, 0)]
    #[case::negative(-90, 3)]
    fn test_sprite_frame(#[case] degrees: i64, #[case] expected: u32) {
        let frames = (1..=4).map(|width| RgbaImage::new(width, 1)).collect();
        let sprite = Sprite::new(frames).unwrap();
        assert_eq!(sprite.frame(degrees).width(), expected + 1);
    }

    #[test]
    fn test_sprite_rejects_empty_frames() {
        assert!(matches!(Sprite::new(vec![]), Err(SpriteError::NoFrames)));
        assert!(matches!(
            Sprite::new(vec![RgbaImage::new(1, 1), RgbaImage::new(0, 3)]),
            Err(SpriteError::EmptyImage(1))
        ));
    }

    #[test]
    fn test_draw_is_balanced() {
        let mut backend = VectorBackend::new(100.0, 100.0, 1.0);
        let robot = Robot::new("r")
            .with_position(20.0, 30.0)
            .with_camera(Camera::new());
        robot.draw(&mut backend).unwrap();
        assert_eq!(backend.transform_depth(), 0);
        let svg = backend.to_svg();
        assert!(svg.contains(r#"<g transform="translate(20,30) rotate(0)">"#));
        assert!(svg.contains(r#"style="fill:#FF0000""#));
        assert!(svg.contains(r#"style="fill:#004000""#));
    }

    #[test]
    fn test_config_round_trip() {
        let robot = Robot::new("Scribbler")
            .with_position(12.5, 30.0)
            .with_direction(Angle::from_deg(45.0))
            .with_color(Color::from_name("blue").unwrap())
            .with_camera(Camera::new());
        let config = robot.to_config();
        let restored = Robot::from_config(&config).to_config();
        assert_eq!(restored.name, "Scribbler");
        assert_eq!(restored.color.name(), Some("blue"));
        assert_eq!(restored.cameras.len(), 1);
        assert_abs_diff_eq!(restored.x, 12.5);
        assert_abs_diff_eq!(restored.direction, 45.0, epsilon = EPSILON);
    }
}
