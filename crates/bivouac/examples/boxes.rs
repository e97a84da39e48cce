//! A thousand spinning boxes in random colours.
//!
//! Every box is its own entity with a Locus, a Mesh and a Spin; the batch
//! renderer joins them into a single triangle strip.

use bivouac::prelude::*;
use rand::Rng;

const WIDTH: u32 = 1024;
const HEIGHT: u32 = 768;
const COUNT: usize = 1000;

fn main() {
    App::new("bivouac: boxes")
        .size(WIDTH, HEIGHT)
        .clear_color(ClearColor::rgb(0.05, 0.05, 0.08))
        .setup(setup)
        .update(update)
        .run();
}

fn setup(ctx: &mut Context) {
    ctx.systems.add(MovementSystem);
    ctx.systems.add(BatchRenderSystem::new());

    let mut rng = rand::thread_rng();
    for i in 0..COUNT {
        let half = rng.gen_range(4.0..16.0);
        let mut mesh = Mesh::from_box(Rect::new(-half, -half, half, half));
        mesh.set_color(hsv_to_rgba8(rng.gen_range(0.0..1.0), 0.6, 0.95));

        let locus = Locus::at(rng.gen_range(0.0..WIDTH as f32), rng.gen_range(0.0..HEIGHT as f32))
            .with_rotation(rng.gen_range(0.0..std::f32::consts::TAU))
            .with_layer((i % 4) as i32);
        ctx.world.spawn((locus, mesh, Spin(rng.gen_range(-3.0..3.0))));
    }
}

fn update(ctx: &mut Context, dt: f64) {
    if ctx.keys().just_pressed(KeyCode::Escape) {
        ctx.exit();
    }
    ctx.systems.update::<MovementSystem>(&mut ctx.world, dt);
    ctx.systems.update::<BatchRenderSystem>(&mut ctx.world, dt);
}
