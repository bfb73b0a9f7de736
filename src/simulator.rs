//! Simulation of the robots in their world.
//!
//! The world is stepped at a fixed rate. Robots whose next pose would collide with a wall or
//! another robot stay in place.

use bevy::prelude::*;

use crate::resource::WorldRes;

/// Seconds per simulation step.
pub const STEP: f64 = 0.1;

pub struct Simulator;

impl Plugin for Simulator {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_seconds(STEP))
            .add_systems(FixedUpdate, simulate);
    }
}

fn simulate(time: Res<Time>, mut world: ResMut<WorldRes>) {
    world.step(time.delta());
}
