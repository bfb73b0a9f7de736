//! The resource module wraps domain entities for use with Bevy.

use std::{
    fs,
    ops::{Deref, DerefMut},
    path::Path,
};

use bevy::ecs::system::Resource;
use rand::{
    distr::{Distribution, Uniform},
    SeedableRng,
};
use rand_chacha::ChaCha8Rng;
use robosim::domain::{self, CameraConfig, Color, Position, RobotConfig, WallConfig, WorldConfig};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("unable to read world configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid world configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid demo layout: {0}")]
    Layout(#[from] rand::distr::uniform::Error),
    #[error(transparent)]
    World(#[from] domain::WorldError),
}

#[derive(Resource)]
pub struct WorldRes(domain::World);

impl Deref for WorldRes {
    type Target = domain::World;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for WorldRes {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<domain::World> for WorldRes {
    fn from(value: domain::World) -> Self {
        Self(value)
    }
}

/// Configuration the world was built from, used to reset it.
#[derive(Resource, Clone)]
pub struct ConfigRes(pub WorldConfig);

impl Deref for ConfigRes {
    type Target = WorldConfig;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<WorldConfig, SetupError> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

const RNG_SEED: u64 = 19878367467712;

/// Seeded arena with scattered boxes and three robots. The robots are placed by the world.
pub fn demo_config() -> Result<WorldConfig, SetupError> {
    const WALLS: usize = 8;
    const PALETTE: [&str; 4] = ["yellow", "orange", "gray", "white"];

    let config = WorldConfig {
        seed: RNG_SEED,
        ..WorldConfig::default()
    };
    let mut rng = ChaCha8Rng::seed_from_u64(RNG_SEED);
    let x = Uniform::try_from(20.0..=config.width - 60.0)?;
    let y = Uniform::try_from(20.0..=config.height - 60.0)?;
    let size = Uniform::try_from(5.0..=30.0)?;
    let color = Uniform::try_from(0..PALETTE.len())?;

    let walls = (0..WALLS)
        .map(|_| {
            let p1 = Position::new(x.sample(&mut rng), y.sample(&mut rng));
            WallConfig {
                color: Color::from_name(PALETTE[color.sample(&mut rng)]).unwrap_or(Color::WHITE),
                p1,
                p2: p1 + Position::new(size.sample(&mut rng), size.sample(&mut rng)),
            }
        })
        .collect();

    let robots = [("Red", "red"), ("Blue", "blue"), ("Cyan", "cyan")]
        .into_iter()
        .map(|(name, color)| RobotConfig {
            name: name.to_string(),
            x: 0.0,
            y: 0.0,
            color: Color::from_name(color).unwrap_or(Color::WHITE),
            cameras: vec![CameraConfig::default()],
            ..RobotConfig::default()
        })
        .collect();

    Ok(WorldConfig {
        walls,
        robots,
        ..config
    })
}
