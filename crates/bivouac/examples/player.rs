//! Arrow keys move a player box around; space drops a fading marker.

use bivouac::prelude::*;

const SPEED: f32 = 240.0;

fn main() {
    App::new("bivouac: player")
        .size(800, 600)
        .clear_color(ClearColor::rgb(0.12, 0.14, 0.18))
        .setup(setup)
        .update(update)
        .run();
}

fn setup(ctx: &mut Context) {
    ctx.systems.add(MovementSystem);
    ctx.systems.add(ExpiresSystem);
    ctx.systems.add(BatchRenderSystem::new());

    let mut body = Mesh::from_box(Rect::new(-16.0, -16.0, 16.0, 16.0));
    body.set_color([90, 200, 255, 255]);
    let player = ctx.world.spawn((
        Tag::new("player"),
        Locus::at(400.0, 300.0).with_layer(10),
        body,
        Velocity::default(),
    ));

    // a ring that follows the player through its locus parent
    let mut ring = Mesh::default();
    ring.set_as_circle(Vec2::splat(28.0), 0.0, std::f32::consts::TAU, 0);
    ring.set_color([255, 255, 255, 80]);
    ctx.world.spawn((Locus::default().with_parent(player).with_layer(9), ring, Spin(1.5)));
}

fn update(ctx: &mut Context, dt: f64) {
    if ctx.keys().just_pressed(KeyCode::Escape) {
        ctx.exit();
    }

    let direction = ctx.keys().arrows().normalize_or_zero();
    let drop_marker = ctx.keys().just_pressed(KeyCode::Space);

    if let Some(player) = ctx.world.find_tagged("player") {
        if let Some(velocity) = ctx.world.component_mut::<Velocity>(player) {
            velocity.0 = direction * SPEED;
        }
        if drop_marker {
            let at = ctx.world.component::<Locus>(player).map_or(Vec2::ZERO, |l| l.position);
            let mut marker = Mesh::from_box(Rect::new(-6.0, -6.0, 6.0, 6.0));
            marker.set_color([255, 210, 80, 255]);
            ctx.world.spawn((Locus::new(at), marker, Expires::after(2.0)));
        }
    }

    ctx.systems.update::<MovementSystem>(&mut ctx.world, dt);
    ctx.systems.update::<ExpiresSystem>(&mut ctx.world, dt);
    ctx.systems.update::<BatchRenderSystem>(&mut ctx.world, dt);
}
