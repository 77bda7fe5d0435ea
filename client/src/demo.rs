//! Small falling-blocks game used by the binary's `--demo` flag.
//!
//! Each participant slot gets a ship steered by its controller. Blocks fall
//! from the top of the screen and are destroyed when they hit a ship or
//! leave the screen. Holding A turns the ship into a ghost.

use crate::session::Simulation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    default_name, ActorFlags, ActorKind, Button, Controllers, PixelImage, World, MAX_PARTICIPANTS,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};

const SHIP_SIZE: u32 = 8;
const SHIP_SPEED: f64 = 90.0;
const BLOCK_SIZE: u32 = 6;
const BLOCK_COLOR: u8 = 8;
const SPAWN_EVERY: f64 = 0.75;

pub struct DemoSimulation {
    rng: StdRng,
    ships: Vec<(u32, u32)>,
    spawn_timer: f64,
}

impl DemoSimulation {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic block placement.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            ships: Vec::new(),
            spawn_timer: 0.0,
        }
    }

    /// `(participant slot, actor id)` for every ship.
    pub fn ships(&self) -> &[(u32, u32)] {
        &self.ships
    }

    fn spawn_block(&mut self, world: &mut World) {
        let mut image = PixelImage::new(BLOCK_SIZE, BLOCK_SIZE);
        image.fill(BLOCK_COLOR);
        let half = BLOCK_SIZE as f64 / 2.0;
        let x = self.rng.gen_range(half..SCREEN_WIDTH - half);
        let vy = self.rng.gen_range(30.0..90.0);

        let id = world.spawn(ActorKind::ENEMY, Some(image));
        if let Some(block) = world.get_mut(id) {
            block.set_position(x, half);
            block.vy = vy;
            block.set_flag(ActorFlags::AUTO_DESTROY, true);
        }
    }

    fn resolve_hits(&self, world: &mut World) {
        for (a, b) in world.overlapping_pairs() {
            let (ship, block) = match (world.get(a).map(|x| x.kind), world.get(b).map(|x| x.kind)) {
                (Some(ActorKind::PLAYER), Some(ActorKind::ENEMY)) => (a, b),
                (Some(ActorKind::ENEMY), Some(ActorKind::PLAYER)) => (b, a),
                _ => continue,
            };
            if world.get(block).map_or(true, |x| x.is_destroyed()) {
                continue;
            }
            world.destroy(block);
            if let Some(ship) = world.get_mut(ship) {
                ship.change_number_by("hits", 1.0);
            }
        }
    }
}

impl Default for DemoSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for DemoSimulation {
    fn start(&mut self, world: &mut World, controllers: &mut Controllers) {
        world.background_index = 1;
        let spacing = SCREEN_WIDTH / (MAX_PARTICIPANTS as f64 + 1.0);

        for slot in 1..=MAX_PARTICIPANTS as u32 {
            let mut image = PixelImage::new(SHIP_SIZE, SHIP_SIZE);
            image.fill_rect(1, 0, SHIP_SIZE as i32 - 2, SHIP_SIZE as i32, slot as u8 + 1);

            let id = world.spawn(ActorKind::PLAYER, Some(image));
            if let Some(ship) = world.get_mut(id) {
                ship.set_position(spacing * slot as f64, SCREEN_HEIGHT - 16.0);
                ship.set_data("name", default_name(slot));
                ship.set_data("hits", 0);
            }
            if let Some(controller) = controllers.get_mut(slot) {
                controller.move_actor(id, SHIP_SPEED, SHIP_SPEED);
            }
            self.ships.push((slot, id));
        }
    }

    fn update(&mut self, world: &mut World, controllers: &Controllers, dt: f64) {
        self.spawn_timer += dt;
        while self.spawn_timer >= SPAWN_EVERY {
            self.spawn_timer -= SPAWN_EVERY;
            self.spawn_block(world);
        }

        let half = SHIP_SIZE as f64 / 2.0;
        for &(slot, id) in &self.ships {
            let ghost = controllers
                .get(slot)
                .map_or(false, |c| c.is_pressed(Button::A));
            if let Some(ship) = world.get_mut(id) {
                ship.set_flag(ActorFlags::GHOST, ghost);
                ship.x = ship.x.clamp(half, SCREEN_WIDTH - half);
                ship.y = ship.y.clamp(half, SCREEN_HEIGHT - half);
            }
        }

        self.resolve_hits(world);
    }
}
