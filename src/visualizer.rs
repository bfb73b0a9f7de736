//! 2D visualization.
//!
//! The world is drawn with the raster backend into a texture every frame. The first robot's
//! camera picture is shown below it.

use bevy::{
    prelude::*,
    render::{
        render_asset::RenderAssetUsages,
        render_resource::{Extent3d, TextureDimension, TextureFormat},
    },
};
use image::RgbaImage;
use robosim::{backend::RasterBackend, domain::PictureKind};

use crate::resource::WorldRes;

/// Screen pixels per camera picture pixel.
const CAMERA_ZOOM: f32 = 2.0;
const MARGIN: f32 = 10.0;

pub struct Visualizer;

impl Plugin for Visualizer {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, set_up)
            .add_systems(Update, (draw_world, draw_camera));
    }
}

#[derive(Resource)]
struct Canvas {
    backend: RasterBackend,
    world_image: Handle<Image>,
    camera_image: Handle<Image>,
}

#[derive(Component)]
struct CameraView;

fn to_texture(image: &RgbaImage) -> Image {
    Image::new(
        Extent3d {
            width: image.width().max(1),
            height: image.height().max(1),
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        if image.is_empty() {
            vec![0; 4]
        } else {
            image.as_raw().clone()
        },
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

fn set_up(mut commands: Commands, mut images: ResMut<Assets<Image>>, world: Res<WorldRes>) {
    let backend = RasterBackend::new(world.width(), world.height(), world.scale());
    let world_image = images.add(to_texture(backend.image()));
    let camera_image = images.add(to_texture(&RgbaImage::new(1, 1)));
    let world_height = backend.image().height() as f32;

    commands.spawn(Camera2dBundle::default());
    commands.spawn(SpriteBundle {
        texture: world_image.clone(),
        transform: Transform::from_xyz(0.0, MARGIN, 0.0),
        ..default()
    });
    commands.spawn((
        SpriteBundle {
            texture: camera_image.clone(),
            sprite: Sprite {
                anchor: bevy::sprite::Anchor::TopCenter,
                ..default()
            },
            transform: Transform::from_xyz(0.0, -world_height / 2.0, 0.0)
                .with_scale(Vec3::new(CAMERA_ZOOM, CAMERA_ZOOM, 1.0)),
            ..default()
        },
        CameraView,
    ));

    commands.insert_resource(Canvas {
        backend,
        world_image,
        camera_image,
    });
}

fn draw_world(world: Res<WorldRes>, mut canvas: ResMut<Canvas>, mut images: ResMut<Assets<Image>>) {
    let canvas = &mut *canvas;
    if let Err(error) = world.draw(&mut canvas.backend) {
        warn!("unable to draw the world: {error}");
        return;
    }
    if let Some(image) = images.get_mut(&canvas.world_image) {
        *image = to_texture(canvas.backend.image());
    }
}

fn draw_camera(
    mut world: ResMut<WorldRes>,
    canvas: Res<Canvas>,
    mut images: ResMut<Assets<Image>>,
    mut views: Query<&mut Visibility, With<CameraView>>,
) {
    let picture = if world.robots().first().is_some_and(|r| !r.cameras().is_empty()) {
        world.take_picture(0, 0, PictureKind::Color).ok().flatten()
    } else {
        None
    };
    for mut visibility in &mut views {
        *visibility = if picture.is_some() {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
    if let (Some(picture), Some(image)) = (picture, images.get_mut(&canvas.camera_image)) {
        *image = to_texture(&picture);
    }
}
