//! World of walls and robots.
//!
//! The world owns every robot and every wall. Robots are identified by their index, their
//! footprints are mirrored as walls so that rays and collisions see them like any other wall.

use std::time::Duration;

use image::{imageops, RgbaImage};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{
    Angle, Camera, CloudPoint, Color, HasCollision, Line, PictureKind, Position, Robot,
    RobotConfig, RobotId, Sprite, Velocity,
};
use crate::backend::{replay, Backend, BackendError, DrawCommand};

/// Colored sequence of line segments. A single line is a boundary edge, more lines form a box.
#[derive(Clone, Debug, PartialEq)]
pub struct Wall {
    pub color: Color,
    /// Set for the footprint of a robot.
    pub robot: Option<RobotId>,
    pub lines: Vec<Line>,
}

impl Wall {
    pub fn new(color: Color, robot: Option<RobotId>, lines: Vec<Line>) -> Self {
        Self {
            color,
            robot,
            lines,
        }
    }
}

#[derive(Error, Debug)]
pub enum WorldError {
    #[error("robot {0:?} is already in the world")]
    DuplicateRobot(String),
    #[error("no robot with id {0}")]
    UnknownRobot(RobotId),
    #[error("robot {robot} has no camera {camera}")]
    UnknownCamera { robot: RobotId, camera: usize },
}

#[derive(Clone, Debug)]
pub struct World {
    seed: u64,
    rng: ChaCha8Rng,
    width: f64,
    height: f64,
    scale: f64,
    time: f64,
    debug: bool,
    boundary_wall: bool,
    boundary_wall_color: Color,
    boundary_wall_width: f64,
    ground_color: Color,
    ground_image: Option<RgbaImage>,
    robots: Vec<Robot>,
    walls: Vec<Wall>,
    debug_commands: Vec<DrawCommand>,
}

impl World {
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        let seed = if config.seed == 0 {
            let seed = rand::random();
            info!(seed, "random seed initialized");
            seed
        } else {
            info!(seed = config.seed, "reusing random seed");
            config.seed
        };

        let mut world = Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            width: config.width,
            height: config.height,
            scale: config.scale,
            time: 0.0,
            debug: false,
            boundary_wall: config.boundary_wall,
            boundary_wall_color: config.boundary_wall_color,
            boundary_wall_width: config.boundary_wall_width,
            ground_color: config.ground_color,
            ground_image: None,
            robots: Vec::new(),
            walls: Vec::new(),
            debug_commands: Vec::new(),
        };

        world.add_boundary_walls();
        for wall in &config.walls {
            world.add_wall(wall.color, wall.p1.x(), wall.p1.y(), wall.p2.x(), wall.p2.y());
        }
        for robot in &config.robots {
            world.add_robot(Robot::from_config(robot))?;
        }
        world.update();

        Ok(world)
    }

    /// Static box walls and robots, enough to rebuild the world.
    pub fn to_config(&self) -> WorldConfig {
        WorldConfig {
            seed: self.seed,
            width: self.width,
            height: self.height,
            scale: self.scale,
            boundary_wall: self.boundary_wall,
            boundary_wall_color: self.boundary_wall_color,
            boundary_wall_width: self.boundary_wall_width,
            ground_color: self.ground_color,
            walls: self
                .walls
                .iter()
                .filter(|wall| wall.robot.is_none() && wall.lines.len() == 4)
                .map(|wall| WallConfig {
                    color: wall.color,
                    p1: wall.lines[0].p1,
                    p2: wall.lines[2].p1,
                })
                .collect(),
            robots: self.robots.iter().map(Robot::to_config).collect(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Device pixels per world unit.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    /// Simulated seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
        self.update();
    }

    pub fn ground_color(&self) -> Color {
        self.ground_color
    }

    pub fn set_ground_color(&mut self, color: Color) {
        self.ground_color = color;
    }

    pub fn ground_image(&self) -> Option<&RgbaImage> {
        self.ground_image.as_ref()
    }

    /// Ground image in device pixels, covering the world from the origin.
    pub fn set_ground_image(&mut self, image: Option<RgbaImage>) {
        self.ground_image = image;
    }

    /// Ground image pixel under a world position.
    pub fn ground_pixel(&self, position: Position) -> Option<Color> {
        let image = self.ground_image.as_ref()?;
        let x = (position.x() * self.scale).round();
        let y = (position.y() * self.scale).round();
        if x < 0.0 || y < 0.0 || x >= f64::from(image.width()) || y >= f64::from(image.height())
        {
            return None;
        }
        Some(Color::from(*image.get_pixel(x as u32, y as u32)))
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn robots(&self) -> &[Robot] {
        &self.robots
    }

    pub fn robot(&self, id: RobotId) -> Option<&Robot> {
        self.robots.get(id)
    }

    /// Case-insensitive lookup by name, the first match wins.
    pub fn find_robot(&self, name: &str) -> Option<RobotId> {
        self.robots
            .iter()
            .position(|robot| robot.name().eq_ignore_ascii_case(name))
    }

    pub fn debug_commands(&self) -> &[DrawCommand] {
        &self.debug_commands
    }

    /// Adds a box spanned by two opposite corners.
    pub fn add_wall(&mut self, color: Color, x1: f64, y1: f64, x2: f64, y2: f64) {
        let p1 = Position::new(x1, y1);
        let p2 = Position::new(x2, y1);
        let p3 = Position::new(x2, y2);
        let p4 = Position::new(x1, y2);
        self.walls.push(Wall::new(
            color,
            None,
            vec![
                Line::new(p1, p2),
                Line::new(p2, p3),
                Line::new(p3, p4),
                Line::new(p4, p1),
            ],
        ));
        self.update();
    }

    pub fn clear_boundary_walls(&mut self) {
        self.walls.retain(|wall| wall.lines.len() > 1);
        self.update();
    }

    /// Adds a robot and its footprint wall. A robot at x or y zero is placed randomly.
    ///
    /// Adding a robot that is already in the world, or a clone of it, fails.
    pub fn add_robot(&mut self, mut robot: Robot) -> Result<RobotId, WorldError> {
        if self.robots.iter().any(|other| other.is_same(&robot)) {
            warn!(
                robot = robot.name(),
                "can't add the same robot to a world more than once"
            );
            return Err(WorldError::DuplicateRobot(robot.name().to_string()));
        }

        let (mut x, mut y) = (robot.x(), robot.y());
        if x == 0.0 {
            x = (self.rng.random::<f64>() * (self.width - 10.0)).round();
        }
        if y == 0.0 {
            y = (self.rng.random::<f64>() * (self.height - 10.0)).round();
        }
        robot.set_position(Position::new(x, y));

        let id = self.robots.len();
        robot.attach(id);
        self.walls
            .push(Wall::new(robot.color(), Some(id), robot.outline()));
        self.robots.push(robot);
        self.update();

        Ok(id)
    }

    pub fn set_robot_pose(
        &mut self,
        id: RobotId,
        position: Position,
        direction: Angle,
    ) -> Result<(), WorldError> {
        self.robot_mut(id)?.set_pose(position, direction);
        self.update();
        Ok(())
    }

    pub fn set_robot_velocity(
        &mut self,
        id: RobotId,
        va: Velocity,
        vr: Velocity,
    ) -> Result<(), WorldError> {
        self.robot_mut(id)?.set_velocity(va, vr);
        Ok(())
    }

    pub fn set_sprite(&mut self, id: RobotId, sprite: Option<Sprite>) -> Result<(), WorldError> {
        self.robot_mut(id)?.set_sprite(sprite);
        Ok(())
    }

    /// Moves every robot by `dt`, then updates. A robot whose move would hit a wall stays in
    /// place and is marked stalled.
    pub fn step(&mut self, dt: Duration) {
        for id in 0..self.robots.len() {
            let footprint = self.robots[id].advanced(dt);
            let lines = self
                .walls
                .iter()
                .filter(|wall| wall.robot != Some(id))
                .flat_map(|wall| wall.lines.iter().copied())
                .collect::<Vec<_>>();
            let robot = &mut self.robots[id];
            if footprint.has_collision(&lines) {
                debug!(robot = robot.name(), "collision, staying in place");
                robot.stall();
            } else {
                robot.apply(footprint);
            }
        }
        self.time += dt.as_secs_f64();
        self.update();
    }

    /// Moves footprint walls to their robots, marks all camera hits stale and collects the debug
    /// overlay.
    pub fn update(&mut self) {
        for wall in &mut self.walls {
            if let Some(robot) = wall.robot.and_then(|id| self.robots.get(id)) {
                wall.lines = robot.outline();
                wall.color = robot.color();
            }
        }
        for robot in &mut self.robots {
            robot.cameras_mut().for_each(Camera::invalidate);
        }
        self.debug_commands = if self.debug {
            self.robots
                .iter()
                .flat_map(|robot| {
                    robot
                        .cameras()
                        .iter()
                        .flat_map(move |camera| camera.debug_commands(robot))
                })
                .collect()
        } else {
            Vec::new()
        };
    }

    pub fn camera(&self, robot: RobotId, camera: usize) -> Result<&Camera, WorldError> {
        self.robot(robot)
            .ok_or(WorldError::UnknownRobot(robot))?
            .camera(camera)
            .ok_or(WorldError::UnknownCamera { robot, camera })
    }

    /// Recomputes the hits of a camera if they are stale.
    pub fn refresh_camera(&mut self, robot: RobotId, camera: usize) -> Result<(), WorldError> {
        let current = self.camera(robot, camera)?;
        if !current.is_stale() {
            return Ok(());
        }
        let hits = current.cast(&self.robots[robot], self);
        if let Some(current) = self.robots[robot].camera_mut(camera) {
            current.refresh(hits);
        }
        Ok(())
    }

    pub fn take_picture(
        &mut self,
        robot: RobotId,
        camera: usize,
        kind: PictureKind,
    ) -> Result<Option<RgbaImage>, WorldError> {
        self.refresh_camera(robot, camera)?;
        Ok(self.camera(robot, camera)?.take_picture(self, kind))
    }

    pub fn point_cloud(
        &mut self,
        robot: RobotId,
        camera: usize,
    ) -> Result<Option<Vec<CloudPoint>>, WorldError> {
        self.refresh_camera(robot, camera)?;
        Ok(self.camera(robot, camera)?.point_cloud(self))
    }

    /// Full drawing pass: ground, static walls, boundary edges, robots, debug overlay and the
    /// time caption.
    pub fn draw(&self, backend: &mut dyn Backend) -> Result<(), BackendError> {
        let depth = backend.transform_depth();

        backend.clear();
        backend.no_stroke();
        backend.set_fill_color(self.ground_color);
        backend.draw_rect(0.0, 0.0, self.width, self.height);
        if let Some(image) = &self.ground_image {
            match backend.put_image_data(image, 0.0, 0.0) {
                Ok(()) | Err(BackendError::Unsupported { .. }) => {}
                Err(error) => return Err(error),
            }
        }

        for wall in self
            .walls
            .iter()
            .filter(|wall| wall.robot.is_none() && wall.lines.len() > 1)
        {
            backend.no_stroke();
            backend.set_fill_color(wall.color);
            backend.begin_shape();
            for line in &wall.lines {
                backend.vertex(line.p1.x(), line.p1.y());
            }
            if let (Some(first), Some(last)) = (wall.lines.first(), wall.lines.last()) {
                if first.p1 != last.p2 {
                    backend.vertex(last.p2.x(), last.p2.y());
                }
            }
            backend.end_shape();
        }

        for wall in self.walls.iter().filter(|wall| wall.lines.len() == 1) {
            let line = wall.lines[0];
            backend.stroke_style(Some(wall.color), self.boundary_wall_width);
            backend.draw_line(line.p1.x(), line.p1.y(), line.p2.x(), line.p2.y());
            backend.set_line_width(1.0);
            backend.no_stroke();
        }

        for robot in &self.robots {
            robot.draw(backend)?;
        }

        replay(&self.debug_commands, backend)?;

        backend.set_fill_color(Color::WHITE);
        backend.text(&format!("Time: {:.1}", self.time), 10.0, backend.height() - 10.0);

        debug_assert_eq!(
            backend.transform_depth(),
            depth,
            "unbalanced transforms while drawing the world"
        );
        Ok(())
    }

    /// Square crop of the drawn world centered on a robot, `size` in device pixels.
    pub fn robot_snapshot(
        &self,
        backend: &dyn Backend,
        robot: RobotId,
        size: u32,
    ) -> Option<RgbaImage> {
        let robot = self.robot(robot)?;
        let image = backend
            .image_data()
            .inspect_err(|error| warn!("unable to take a picture of {}: {error}", robot.name()))
            .ok()?;
        let half = f64::from(size) / 2.0;
        let x = (robot.x() * backend.scale() - half).max(0.0) as u32;
        let y = (robot.y() * backend.scale() - half).max(0.0) as u32;
        Some(imageops::crop_imm(&image, x, y, size, size).to_image())
    }

    /// Tiles pictures into a square grid, each cell the size of the first picture.
    pub fn gallery(images: &[RgbaImage]) -> Option<RgbaImage> {
        let (width, height) = images.first()?.dimensions();
        let columns = (images.len() as f64).sqrt().ceil() as u32;
        let mut gallery = RgbaImage::new(columns * width, columns * height);
        for (index, image) in (0..).zip(images) {
            let x = index % columns * width;
            let y = index / columns * height;
            imageops::replace(&mut gallery, image, i64::from(x), i64::from(y));
        }
        Some(gallery)
    }

    fn robot_mut(&mut self, id: RobotId) -> Result<&mut Robot, WorldError> {
        self.robots.get_mut(id).ok_or(WorldError::UnknownRobot(id))
    }

    fn add_boundary_walls(&mut self) {
        if !self.boundary_wall {
            return;
        }
        let p1 = Position::new(0.0, 0.0);
        let p2 = Position::new(0.0, self.height);
        let p3 = Position::new(self.width, self.height);
        let p4 = Position::new(self.width, 0.0);
        for line in [
            Line::new(p1, p2),
            Line::new(p2, p3),
            Line::new(p3, p4),
            Line::new(p4, p1),
        ] {
            self.walls
                .push(Wall::new(self.boundary_wall_color, None, vec![line]));
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WallConfig {
    pub color: Color,
    pub p1: Position,
    pub p2: Position,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Zero picks a random seed.
    pub seed: u64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub boundary_wall: bool,
    pub boundary_wall_color: Color,
    pub boundary_wall_width: f64,
    pub ground_color: Color,
    pub walls: Vec<WallConfig>,
    pub robots: Vec<RobotConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 500.0,
            height: 250.0,
            scale: 3.0,
            boundary_wall: true,
            boundary_wall_color: Color::rgb(128, 0, 128),
            boundary_wall_width: 3.0,
            ground_color: Color::rgb(0, 128, 0),
            walls: Vec::new(),
            robots: Vec::new(),
        }
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
        backend::{RasterBackend, VectorBackend},
        tests::{pixel, world},
    };

    #[test]
    fn test_boundary_walls() {
        let world = world(100.0, 50.0);
        assert_eq!(world.walls().len(), 4);
        assert!(world.walls().iter().all(|wall| wall.lines.len() == 1));
        assert_eq!(world.walls()[1].lines[0].p2, Position::new(100.0, 50.0));
    }

    #[test]
    fn test_add_wall_and_clear_boundary() {
        let mut world = world(100.0, 50.0);
        world.add_wall(Color::WHITE, 10.0, 10.0, 20.0, 30.0);
        assert_eq!(world.walls().len(), 5);
        let lines = &world.walls()[4].lines;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2].p1, Position::new(20.0, 30.0));

        world.clear_boundary_walls();
        assert_eq!(world.walls().len(), 1);
    }

    #[test]
    fn test_same_robot_is_rejected() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let id = world.add_robot(Robot::new("Scribbler").with_position(20.0, 20.0))?;
        let walls = world.walls().len();

        let again = world.robot(id).unwrap().clone();
        let result = world.add_robot(again);

        assert!(matches!(result, Err(WorldError::DuplicateRobot(name)) if name == "Scribbler"));
        assert_eq!(world.robots().len(), 1);
        assert_eq!(world.walls().len(), walls);
        Ok(())
    }

    #[test]
    fn test_robots_may_share_a_name() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let first = world.add_robot(Robot::new("Scribbler").with_position(20.0, 20.0))?;
        let second = world.add_robot(Robot::new("scribbler").with_position(60.0, 60.0))?;
        assert_eq!((first, second), (0, 1));
        assert_eq!(world.find_robot("SCRIBBLER"), Some(first));

        let config: WorldConfig =
            serde_json::from_str(r#"{"seed": 3, "robots": [{"x": 20, "y": 20}, {"x": 100, "y": 50}]}"#)
                .unwrap();
        let world = World::new(config)?;
        assert_eq!(world.robots().len(), 2);
        assert!(world.robots().iter().all(|robot| robot.name() == "Robot"));
        Ok(())
    }

    #[test]
    fn test_random_placement_is_seeded() -> Result<(), WorldError> {
        let place = || -> Result<Position, WorldError> {
            let mut world = world(100.0, 60.0);
            let id = world.add_robot(Robot::new("r"))?;
            Ok(world.robot(id).unwrap().position())
        };
        let first = place()?;
        assert_eq!(first, place()?);
        assert!((0.0..=90.0).contains(&first.x()));
        assert!((0.0..=50.0).contains(&first.y()));
        Ok(())
    }

    #[test]
    fn test_footprint_wall_follows_robot() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let id = world.add_robot(Robot::new("r").with_position(20.0, 20.0))?;
        world.set_robot_pose(id, Position::new(40.0, 60.0), Angle::new(0.5 * PI))?;
        let wall = world.walls().iter().find(|w| w.robot == Some(id)).unwrap();
        let xs = wall.lines.iter().map(|l| l.p1.x());
        let (min, max) = xs.fold((f64::MAX, f64::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
        assert_abs_diff_eq!(min, 35.0, epsilon = 1e-9);
        assert_abs_diff_eq!(max, 45.0, epsilon = 1e-9);
        Ok(())
    }

    #[rstest]
    #[case::free(50.0, false, 60.0)]
    #[case::blocked(88.0, true, 88.0)]
    fn test_step(
        #[case] x: f64,
        #[case] stalled: bool,
        #[case] expected_x: f64,
    ) -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let id = world.add_robot(Robot::new("r").with_position(x, 50.0))?;
        world.set_robot_velocity(id, Velocity::new(10.0), Velocity::new(0.0))?;
        world.step(Duration::from_secs(1));

        let robot = world.robot(id).unwrap();
        assert_eq!(robot.stalled(), stalled);
        assert_abs_diff_eq!(robot.x(), expected_x, epsilon = 1e-9);
        assert_abs_diff_eq!(world.time(), 1.0);
        Ok(())
    }

    #[test]
    fn test_debug_overlay() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        world.add_robot(
            Robot::new("r")
                .with_position(50.0, 50.0)
                .with_camera(Camera::new()),
        )?;
        assert!(world.debug_commands().is_empty());
        world.set_debug(true);
        assert_eq!(world.debug_commands().len(), 3);
        Ok(())
    }

    #[test]
    fn test_unknown_camera() -> Result<(), WorldError> {
        let mut world = world(100.0, 100.0);
        let id = world.add_robot(Robot::new("r").with_position(50.0, 50.0))?;
        assert!(matches!(
            world.take_picture(id, 0, PictureKind::Color),
            Err(WorldError::UnknownCamera { camera: 0, .. })
        ));
        assert!(matches!(
            world.point_cloud(7, 0),
            Err(WorldError::UnknownRobot(7))
        ));
        Ok(())
    }

    #[test]
    fn test_draw_svg() -> Result<(), WorldError> {
        let mut world = World::new(WorldConfig {
            seed: 7,
            width: 20.0,
            height: 10.0,
            scale: 1.0,
            walls: vec![WallConfig {
                color: "#FF0000".parse().unwrap(),
                p1: Position::new(2.0, 2.0),
                p2: Position::new(4.0, 4.0),
            }],
            ..WorldConfig::default()
        })?;
        world.update();
        let mut backend = VectorBackend::new(20.0, 10.0, 1.0);
        world.draw(&mut backend).unwrap();

        insta::assert_snapshot!(backend.to_svg(), @r###"
        <svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 20 10">
        <rect x="0" y="0" width="20" height="10" style="fill:#008000"/>
        <polygon points="2,2 4,2 4,4 2,4" style="fill:#FF0000"/>
        <line x1="0" y1="0" x2="0" y2="10" style="stroke:#800080;stroke-width:3"/>
        <line x1="0" y1="10" x2="20" y2="10" style="stroke:#800080;stroke-width:3"/>
        <line x1="20" y1="10" x2="20" y2="0" style="stroke:#800080;stroke-width:3"/>
        <line x1="20" y1="0" x2="0" y2="0" style="stroke:#800080;stroke-width:3"/>
        <text x="10" y="0" style="fill:#FFFFFF;font-size:8px;font-family:sans-serif">Time: 0.0</text>
        </svg>
        "###);
        Ok(())
    }

    #[test]
    fn test_draw_raster() -> Result<(), WorldError> {
        let mut world = world(40.0, 20.0);
        world.add_wall(Color::WHITE, 5.0, 5.0, 10.0, 10.0);
        world.add_robot(
            Robot::new("r")
                .with_position(30.0, 10.0)
                .with_color(Color::rgb(0, 0, 255)),
        )?;
        world.set_debug(true);
        let mut backend = RasterBackend::new(40.0, 20.0, 2.0).with_font(None);
        world.draw(&mut backend).unwrap();

        let image = backend.image();
        assert_eq!(pixel(image, 40, 10), Color::rgb(0, 128, 0));
        assert_eq!(pixel(image, 15, 15), Color::WHITE);
        assert_eq!(pixel(image, 60, 20), Color::rgb(0, 0, 255));
        assert_eq!(pixel(image, 0, 20), Color::rgb(128, 0, 128));
        assert_eq!(backend.transform_depth(), 0);
        Ok(())
    }

    #[test]
    fn test_robot_snapshot_and_gallery() -> Result<(), WorldError> {
        let mut world = world(40.0, 20.0);
        let id = world.add_robot(
            Robot::new("r")
                .with_position(20.0, 10.0)
                .with_color(Color::rgb(0, 0, 255)),
        )?;
        let mut backend = RasterBackend::new(40.0, 20.0, 1.0).with_font(None);
        world.draw(&mut backend).unwrap();

        let snapshot = world.robot_snapshot(&backend, id, 6).unwrap();
        assert_eq!(snapshot.dimensions(), (6, 6));
        assert_eq!(pixel(&snapshot, 3, 3), Color::rgb(0, 0, 255));

        let gallery = World::gallery(&[snapshot.clone(), snapshot.clone(), snapshot]).unwrap();
        assert_eq!(gallery.dimensions(), (12, 12));
        assert_eq!(pixel(&gallery, 9, 3), Color::rgb(0, 0, 255));
        assert_eq!(pixel(&gallery, 9, 9), Color::TRANSPARENT);
        assert_eq!(World::gallery(&[]), None);
        Ok(())
    }

    #[test]
    fn test_config_round_trip() -> Result<(), WorldError> {
        let json = r##"{
            "seed": 42,
            "width": 200,
            "height": 100,
            "walls": [{"color": "yellow", "p1": {"x": 10, "y": 10}, "p2": {"x": 30, "y": 20}}],
            "robots": [{"name": "Red", "x": 50, "y": 50, "color": "red"}]
        }"##;
        let config: WorldConfig = serde_json::from_str(json).unwrap();
        let world = World::new(config.clone())?;

        assert_eq!(world.seed(), 42);
        assert_eq!(world.walls().len(), 6);
        assert_eq!(world.to_config(), config);
        assert_eq!(world.find_robot("RED"), Some(0));
        Ok(())
    }
}
