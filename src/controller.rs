//! Keyboard control of the first robot.
//!
//! The arrow keys drive and turn, `D` toggles the debug overlay, `R` rebuilds the world from its
//! configuration and `P` saves the first camera's color, depth and gray pictures side by side.

use bevy::prelude::*;
use robosim::domain::{PictureKind, Velocity, World};

use crate::resource::{ConfigRes, WorldRes};

const SPEED: f64 = 30.0;
const TURN_RATE: f64 = 1.5;
const PICTURE_PATH: &str = "pictures.png";

pub struct Controller;

impl Plugin for Controller {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (control, toggle_debug, reset, save_pictures));
    }
}

fn axis(keys: &ButtonInput<KeyCode>, positive: KeyCode, negative: KeyCode) -> f64 {
    f64::from(i8::from(keys.pressed(positive)) - i8::from(keys.pressed(negative)))
}

fn control(keys: Res<ButtonInput<KeyCode>>, mut world: ResMut<WorldRes>) {
    if world.robots().is_empty() {
        return;
    }
    let va = axis(&keys, KeyCode::ArrowUp, KeyCode::ArrowDown) * SPEED;
    let vr = axis(&keys, KeyCode::ArrowRight, KeyCode::ArrowLeft) * TURN_RATE;
    if let Err(error) = world.set_robot_velocity(0, Velocity::new(va), Velocity::new(vr)) {
        warn!("{error}");
    }
}

fn toggle_debug(keys: Res<ButtonInput<KeyCode>>, mut world: ResMut<WorldRes>) {
    if keys.just_pressed(KeyCode::KeyD) {
        let debug = !world.debug();
        world.set_debug(debug);
    }
}

fn reset(keys: Res<ButtonInput<KeyCode>>, mut world: ResMut<WorldRes>, config: Res<ConfigRes>) {
    if !keys.just_pressed(KeyCode::KeyR) {
        return;
    }
    match World::new(config.0.clone()) {
        Ok(fresh) => *world = fresh.into(),
        Err(error) => error!("unable to reset the world: {error}"),
    }
}

fn save_pictures(keys: Res<ButtonInput<KeyCode>>, mut world: ResMut<WorldRes>) {
    if !keys.just_pressed(KeyCode::KeyP) || world.robots().is_empty() {
        return;
    }
    let mut pictures = Vec::new();
    for kind in [PictureKind::Color, PictureKind::Depth, PictureKind::Gray] {
        match world.take_picture(0, 0, kind) {
            Ok(Some(picture)) => pictures.push(picture),
            Ok(None) => {}
            Err(error) => {
                warn!("{error}");
                return;
            }
        }
    }
    if let Some(gallery) = World::gallery(&pictures) {
        match gallery.save(PICTURE_PATH) {
            Ok(()) => info!(path = PICTURE_PATH, "saved camera pictures"),
            Err(error) => error!("unable to save camera pictures: {error}"),
        }
    }
}
