//! Per-participant button state consumed by the host simulation.

use crate::actor::INPUT_LOCKED_KEY;
use crate::protocol::Button;
use crate::world::World;
use crate::MAX_PARTICIPANTS;

/// Button state for one participant, plus an optional actor it steers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Controller {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
    pub a: bool,
    pub b: bool,
    binding: Option<Binding>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Binding {
    actor_id: u32,
    speed_x: f64,
    speed_y: f64,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn set(&mut self, button: Button, pressed: bool) {
        *self.slot(button) = pressed;
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::Left => self.left,
            Button::Right => self.right,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::A => self.a,
            Button::B => self.b,
        }
    }

    /// D-pad direction as `(dx, dy)` with y pointing down.
    pub fn direction(&self) -> (f64, f64) {
        let dx = (self.right as i8 - self.left as i8) as f64;
        let dy = (self.down as i8 - self.up as i8) as f64;
        (dx, dy)
    }

    /// Makes this controller drive an actor's velocity every tick.
    pub fn move_actor(&mut self, actor_id: u32, speed_x: f64, speed_y: f64) {
        self.binding = Some(Binding {
            actor_id,
            speed_x,
            speed_y,
        });
    }

    pub fn bound_actor(&self) -> Option<u32> {
        self.binding.map(|b| b.actor_id)
    }

    pub fn release_all(&mut self) {
        for button in Button::ALL {
            self.set(button, false);
        }
    }

    fn apply_velocity(&self, world: &mut World) {
        let Some(binding) = self.binding else {
            return;
        };
        let Some(actor) = world.get_mut(binding.actor_id) else {
            return;
        };
        if actor.read_bool(INPUT_LOCKED_KEY) {
            return;
        }
        let (dx, dy) = self.direction();
        actor.vx = dx * binding.speed_x;
        actor.vy = dy * binding.speed_y;
    }

    fn slot(&mut self, button: Button) -> &mut bool {
        match button {
            Button::Left => &mut self.left,
            Button::Right => &mut self.right,
            Button::Up => &mut self.up,
            Button::Down => &mut self.down,
            Button::A => &mut self.a,
            Button::B => &mut self.b,
        }
    }
}

/// One controller per participant slot, addressed by participant id.
#[derive(Debug, Clone, Default)]
pub struct Controllers {
    slots: [Controller; MAX_PARTICIPANTS],
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller for participant `id` (1-based).
    pub fn get(&self, id: u32) -> Option<&Controller> {
        Self::index(id).map(|i| &self.slots[i])
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Controller> {
        Self::index(id).map(move |i| &mut self.slots[i])
    }

    /// Records a button edge for participant `id`. Returns false when the id
    /// is outside the participant range.
    pub fn apply(&mut self, id: u32, button: Button, pressed: bool) -> bool {
        match self.get_mut(id) {
            Some(controller) => {
                controller.set(button, pressed);
                true
            }
            None => false,
        }
    }

    /// Pushes every bound controller's direction into its actor's velocity.
    pub fn update_velocities(&self, world: &mut World) {
        for controller in &self.slots {
            controller.apply_velocity(world);
        }
    }

    fn index(id: u32) -> Option<usize> {
        if id >= 1 && id as usize <= MAX_PARTICIPANTS {
            Some(id as usize - 1)
        } else {
            None
        }
    }
}
