//! 2D Physics: a box of bouncing balls.
//!
//! Click to drop a ball at the cursor. Press R to clear them all.

use bivouac::prelude::*;

const WIDTH: f32 = 800.0;
const HEIGHT: f32 = 600.0;

/// Marker for balls so R can remove them.
struct Ball;

fn main() {
    App::new("bivouac: 2d physics (click to spawn, R to reset)")
        .size(WIDTH as u32, HEIGHT as u32)
        .clear_color(ClearColor::rgb(0.08, 0.08, 0.12))
        .setup(setup)
        .update(update)
        .run();
}

fn setup(ctx: &mut Context) {
    ctx.systems.add(PhysicsSystem::new());
    ctx.systems.add(BatchRenderSystem::new());

    let wall_color = [64, 64, 76, 255];
    let walls = [
        (Vec2::new(WIDTH * 0.5, HEIGHT - 20.0), Vec2::new(WIDTH - 40.0, 40.0)),
        (Vec2::new(20.0, HEIGHT * 0.5), Vec2::new(40.0, HEIGHT)),
        (Vec2::new(WIDTH - 20.0, HEIGHT * 0.5), Vec2::new(40.0, HEIGHT)),
    ];
    for (centre, size) in walls {
        let mut mesh = Mesh::from_box(Rect::centered(size));
        mesh.set_color(wall_color);
        ctx.world.spawn((
            Locus::new(centre),
            mesh,
            PhysicsComponent::fixed(Shape::rect(size.x, size.y)),
        ));
    }

    // a tilted ramp to roll off
    let mut ramp = Mesh::from_box(Rect::centered(Vec2::new(300.0, 16.0)));
    ramp.set_color([90, 90, 110, 255]);
    ctx.world.spawn((
        Locus::at(300.0, 300.0).with_rotation(0.35),
        ramp,
        PhysicsComponent::fixed(Shape::rect(300.0, 16.0)),
    ));

    for i in 0..12 {
        spawn_ball(&mut ctx.world, Vec2::new(120.0 + i as f32 * 40.0, 60.0), i);
    }
}

fn spawn_ball(world: &mut World, at: Vec2, n: usize) {
    let radius = 10.0 + (n % 3) as f32 * 4.0;
    let mut mesh = Mesh::default();
    mesh.set_as_circle(Vec2::splat(radius), 0.0, std::f32::consts::TAU, 0);
    mesh.set_color(hsv_to_rgba8(n as f32 * 0.13, 0.65, 1.0));
    world.spawn((
        Ball,
        Locus::new(at).with_layer(1),
        mesh,
        PhysicsComponent::dynamic(Shape::ball(radius))
            .with_restitution(0.6)
            .with_density(1.0),
    ));
}

fn update(ctx: &mut Context, dt: f64) {
    if ctx.keys().just_pressed(KeyCode::Escape) {
        ctx.exit();
    }
    if ctx.mouse().just_pressed(MouseButton::Left) {
        let at = ctx.cursor().0;
        let n = ctx.world.entities_with::<Ball>().len();
        spawn_ball(&mut ctx.world, at, n);
    }
    if ctx.keys().just_pressed(KeyCode::KeyR) {
        for ball in ctx.world.entities_with::<Ball>() {
            ctx.world.destroy(ball);
        }
    }

    ctx.systems.update::<PhysicsSystem>(&mut ctx.world, dt);
    ctx.systems.update::<BatchRenderSystem>(&mut ctx.world, dt);
}
