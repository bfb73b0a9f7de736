//! Camera sensor casting a fan of rays from its robot.
//!
//! Ray hits are kept in a [`HitBuffer`] that the world marks stale on every tick and on every
//! geometry change. Pictures and point clouds are computed from the buffer on request.

use std::{borrow::Cow, f64::consts::FRAC_PI_2};

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    picture::{self, CloudPoint, PictureKind},
    Angle, Color, RayHit, Robot, RobotId, World,
};
use crate::backend::{Backend, DrawCommand};

/// Per column ray hits, ordered farthest first.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum HitBuffer {
    #[default]
    Stale,
    Fresh(Vec<Vec<RayHit>>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    width: u32,
    height: u32,
    fov: Angle,
    max_range: f64,
    colors_fade: f64,
    size_fade: f64,
    reflect_ground: bool,
    reflect_sky: bool,
    robot: Option<RobotId>,
    hits: HitBuffer,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera {
    pub fn new() -> Self {
        Self {
            width: 256,
            height: 128,
            fov: Angle::from_deg(60.0),
            max_range: 1000.0,
            colors_fade: 0.5,
            size_fade: 1.0,
            reflect_ground: true,
            reflect_sky: false,
            robot: None,
            hits: HitBuffer::Stale,
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        let mut camera = Self::new();
        camera.apply_config(config);
        camera
    }

    /// Applies the keys present in `config`, leaving the others untouched.
    pub fn apply_config(&mut self, config: &CameraConfig) {
        if let Some(width) = config.width {
            self.width = width;
        }
        if let Some(height) = config.height {
            self.height = height;
        }
        if let Some(angle) = config.angle {
            self.fov = Angle::from_deg(angle);
        }
        if let Some(fade) = config.colors_fade_with_distance {
            self.colors_fade = fade;
        }
        if let Some(fade) = config.size_fade_with_distance {
            self.size_fade = fade;
        }
        if let Some(reflect) = config.reflect_ground {
            self.reflect_ground = reflect;
        }
        if let Some(reflect) = config.reflect_sky {
            self.reflect_sky = reflect;
        }
        if let Some(max_range) = config.max_range {
            self.max_range = max_range;
        }
        self.invalidate();
    }

    pub fn to_config(&self) -> CameraConfig {
        CameraConfig {
            width: Some(self.width),
            height: Some(self.height),
            angle: Some(self.fov.as_deg()),
            colors_fade_with_distance: Some(self.colors_fade),
            size_fade_with_distance: Some(self.size_fade),
            reflect_ground: Some(self.reflect_ground),
            reflect_sky: Some(self.reflect_sky),
            max_range: Some(self.max_range),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.set_size(width, height);
        self
    }

    pub fn with_fov(mut self, degrees: f64) -> Self {
        self.set_fov(degrees);
        self
    }

    pub fn with_max_range(mut self, max_range: f64) -> Self {
        self.max_range = max_range;
        self.invalidate();
        self
    }

    pub fn with_fade(mut self, colors: f64, size: f64) -> Self {
        self.colors_fade = colors;
        self.size_fade = size;
        self
    }

    pub fn with_reflections(mut self, ground: bool, sky: bool) -> Self {
        self.reflect_ground = ground;
        self.reflect_sky = sky;
        self
    }

    /// Field of view in degrees.
    pub fn set_fov(&mut self, degrees: f64) {
        self.fov = Angle::from_deg(degrees);
        self.invalidate();
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.invalidate();
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fov(&self) -> Angle {
        self.fov
    }

    pub fn max_range(&self) -> f64 {
        self.max_range
    }

    pub fn colors_fade(&self) -> f64 {
        self.colors_fade
    }

    pub fn size_fade(&self) -> f64 {
        self.size_fade
    }

    pub fn reflect_ground(&self) -> bool {
        self.reflect_ground
    }

    pub fn reflect_sky(&self) -> bool {
        self.reflect_sky
    }

    /// The robot carrying this camera once it is in a world.
    pub fn robot(&self) -> Option<RobotId> {
        self.robot
    }

    pub fn hit_buffer(&self) -> &HitBuffer {
        &self.hits
    }

    pub fn hits(&self) -> Option<&[Vec<RayHit>]> {
        match &self.hits {
            HitBuffer::Fresh(hits) => Some(hits),
            HitBuffer::Stale => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.hits == HitBuffer::Stale
    }

    /// Casts one ray per pixel column, column 0 at the left edge of the field of view.
    pub fn cast(&self, robot: &Robot, world: &World) -> Vec<Vec<RayHit>> {
        let fov = self.fov.radians();
        (0..self.width)
            .map(|i| {
                let offset = f64::from(i) / f64::from(self.width) * fov - fov / 2.0;
                robot.cast_ray(
                    world,
                    robot.x(),
                    robot.y(),
                    Angle::new(FRAC_PI_2) - robot.direction() - Angle::new(offset),
                    self.max_range,
                )
            })
            .collect()
    }

    /// Synthesizes a picture, `None` if the camera is not mounted on a robot of `world`.
    ///
    /// A stale buffer is recomputed for this picture only; [`World::take_picture`] refreshes it.
    pub fn take_picture(&self, world: &World, kind: PictureKind) -> Option<RgbaImage> {
        let robot = self.mounted_robot(world)?;
        let hits = match &self.hits {
            HitBuffer::Fresh(hits) => Cow::Borrowed(hits.as_slice()),
            HitBuffer::Stale => Cow::Owned(self.cast(robot, world)),
        };
        Some(picture::render(self, robot, world, &hits, kind))
    }

    /// Colored points of everything except the sky.
    pub fn point_cloud(&self, world: &World) -> Option<Vec<CloudPoint>> {
        let depth = self.take_picture(world, PictureKind::Depth)?;
        let color = self.take_picture(world, PictureKind::Color)?;
        Some(picture::point_cloud(&depth, &color))
    }

    /// Field of view edges from the robot's center.
    pub fn debug_commands(&self, robot: &Robot) -> Vec<DrawCommand> {
        let half = Angle::new(self.fov.radians() / 2.0);
        let mut commands = vec![DrawCommand::SetStrokeColor(Color::WHITE)];
        for edge in [half, -half] {
            let end = robot.rotate_around(self.max_range, edge);
            commands.push(DrawCommand::Line {
                x1: robot.x(),
                y1: robot.y(),
                x2: end.x(),
                y2: end.y(),
            });
        }
        commands
    }

    /// Draws the camera glyph in robot coordinates.
    pub fn draw(&self, backend: &mut dyn Backend) {
        backend.set_fill_color(Color::rgb(0, 64, 0));
        backend.stroke_style(None, 0.0);
        backend.draw_rect(5.0, -3.33, 1.33, 6.33);
    }

    pub(crate) fn mount(&mut self, robot: RobotId) {
        self.robot = Some(robot);
        self.invalidate();
    }

    pub(crate) fn invalidate(&mut self) {
        self.hits = HitBuffer::Stale;
    }

    pub(crate) fn refresh(&mut self, hits: Vec<Vec<RayHit>>) {
        self.hits = HitBuffer::Fresh(hits);
    }

    fn mounted_robot<'w>(&self, world: &'w World) -> Option<&'w Robot> {
        let robot = self.robot.and_then(|id| world.robot(id));
        if robot.is_none() {
            warn!("camera is not attached to a robot in this world");
        }
        robot
    }
}

/// Camera settings as exchanged with configuration files. Missing keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(
        rename = "colorsFadeWithDistance",
        skip_serializing_if = "Option::is_none"
    )]
    pub colors_fade_with_distance: Option<f64>,
    #[serde(
        rename = "sizeFadeWithDistance",
        skip_serializing_if = "Option::is_none"
    )]
    pub size_fade_with_distance: Option<f64>,
    #[serde(rename = "reflectGround", skip_serializing_if = "Option::is_none")]
    pub reflect_ground: Option<bool>,
    #[serde(rename = "reflectSky", skip_serializing_if = "Option::is_none")]
    pub reflect_sky: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_range: Option<f64>,
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{domain::WorldError, tests::world};

    #[test]
    fn test_defaults() {
        let camera = Camera::new();
        assert_eq!((camera.width(), camera.height()), (256, 128));
        assert_abs_diff_eq!(camera.fov().as_deg(), 60.0, epsilon = 1e-9);
        assert_abs_diff_eq!(camera.max_range(), 1000.0);
        assert!(camera.reflect_ground());
        assert!(!camera.reflect_sky());
        assert!(camera.is_stale());
    }

    #[test]
    fn test_perpendicular_distance_to_front_wall() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let camera = Camera::new()
            .with_size(4, 8)
            .with_fov(90.0)
            .with_max_range(100.0);
        let id = world.add_robot(
            Robot::new("viewer")
                .with_position(50.0, 50.0)
                .with_camera(camera),
        )?;
        world.refresh_camera(id, 0)?;

        let camera = world.robot(id).and_then(|r| r.camera(0)).unwrap();
        let hits = camera.hits().unwrap();
        assert_eq!(hits.len(), 4);
        for (i, column) in hits.iter().enumerate() {
            let offset = i as f64 / 4.0 * 0.5 * PI - 0.25 * PI;
            let wall = column.iter().rev().find(|hit| hit.height == 1.0).unwrap();
            assert_abs_diff_eq!(wall.distance * offset.cos(), 50.0, epsilon = 1e-9);
            assert_abs_diff_eq!(wall.position.x(), 100.0, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_retuning_invalidates_hits() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let id = world.add_robot(
            Robot::new("viewer")
                .with_position(50.0, 50.0)
                .with_camera(Camera::new().with_size(8, 4)),
        )?;
        world.refresh_camera(id, 0)?;
        assert!(!world.robot(id).unwrap().cameras()[0].is_stale());

        let mut camera = world.robot(id).unwrap().cameras()[0].clone();
        camera.set_fov(90.0);
        assert!(camera.is_stale());

        world.update();
        assert!(world.robot(id).unwrap().cameras()[0].is_stale());
        Ok(())
    }

    #[test]
    fn test_unmounted_camera_takes_no_picture() {
        let world = world(100.0, 100.0);
        let camera = Camera::new();
        assert_eq!(camera.take_picture(&world, PictureKind::Color), None);
        assert_eq!(camera.point_cloud(&world), None);
    }

    #[test]
    fn test_debug_commands() {
        let robot = Robot::new("r").with_position(10.0, 10.0);
        let camera = Camera::new().with_fov(90.0).with_max_range(10.0);
        let commands = camera.debug_commands(&robot);
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], DrawCommand::SetStrokeColor(Color::WHITE));
        let DrawCommand::Line { x2, y2, .. } = commands[1] else {
            panic!("expected a line, got {:?}", commands[1]);
        };
        assert_abs_diff_eq!(x2, 10.0 + 50.0_f64.sqrt(), epsilon = 1e-9);
        assert_abs_diff_eq!(y2, 10.0 + 50.0_f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_config_round_trip() {
        let json = r#"{"width":64,"angle":90.0,"reflectSky":true}"#;
        let config: CameraConfig = serde_json::from_str(json).unwrap();
        let camera = Camera::from_config(&config);
        assert_eq!(camera.width(), 64);
        assert_eq!(camera.height(), 128);
        assert!(camera.reflect_sky());

        let exported = camera.to_config();
        let restored = Camera::from_config(&exported);
        let mut reexported = restored.to_config();
        assert_abs_diff_eq!(
            reexported.angle.unwrap(),
            exported.angle.unwrap(),
            epsilon = 1e-9
        );
        reexported.angle = exported.angle;
        assert_eq!(reexported, exported);

        let exported = CameraConfig {
            angle: Some(90.0),
            ..exported
        };
        insta::assert_snapshot!(serde_json::to_string_pretty(&exported).unwrap(), @r###"
        {
          "width": 64,
          "height": 128,
          "angle": 90.0,
          "colorsFadeWithDistance": 0.5,
          "sizeFadeWithDistance": 1.0,
          "reflectGround": true,
          "reflectSky": true,
          "max_range": 1000.0
        }
        "###);
    }
}
