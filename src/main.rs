use bevy::prelude::*;
use robosim::domain::World;

mod controller;
mod resource;
mod simulator;
mod visualizer;

use resource::{ConfigRes, SetupError, WorldRes};

/// Runs the world described by the JSON file given as first argument, or a demo world.
fn main() -> Result<(), SetupError> {
    let config = match std::env::args().nth(1) {
        Some(path) => resource::load_config(path)?,
        None => resource::demo_config()?,
    };
    let world = World::new(config.clone())?;

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "robosim".to_string(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ConfigRes(config))
        .insert_resource(WorldRes::from(world))
        .add_plugins(controller::Controller)
        .add_plugins(visualizer::Visualizer)
        .add_plugins(simulator::Simulator)
        .run();

    Ok(())
}
