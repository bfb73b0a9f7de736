//! The domain module holds the simulated world: walls, robots, their cameras and the synthesis of
//! camera pictures.
//!
//! Nothing in here depends on a particular drawing surface or application framework. Drawing goes
//! through the `Backend` trait.

mod basis;
mod camera;
mod collision;
mod color;
mod picture;
mod robot;
mod world;

pub use basis::{Angle, Line, Position, Velocity};
pub use camera::{Camera, CameraConfig, HitBuffer};
pub use collision::{intersect_segments, HasCollision};
pub use color::{Color, ColorError};
pub use picture::{fade, sky_rows, CloudPoint, PictureKind};
pub use robot::{Footprint, RayHit, Robot, RobotConfig, RobotId, Sprite, SpriteError};
pub use world::{Wall, WallConfig, World, WorldConfig, WorldError};
