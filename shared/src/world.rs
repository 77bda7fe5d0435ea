//! The actor set owned by whichever role is active on a participant.
//!
//! The host mutates its `World` through simulation ticks; a follower mutates
//! its replica only through snapshot reconciliation. Nothing else holds a
//! reference to the actor set, so no locking is involved.

use crate::actor::{Actor, ActorFlags, ActorKind};
use crate::image::PixelImage;
use crate::{DEFAULT_EXTENT, MAX_IMAGE_DIMENSION, SCREEN_HEIGHT, SCREEN_WIDTH};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct World {
    actors: BTreeMap<u32, Actor>,
    next_id: u32,
    next_kind: u32,
    /// Authoritative world time.
    pub runtime_ms: u64,
    pub background_index: u8,
}

impl World {
    pub fn new() -> Self {
        Self {
            actors: BTreeMap::new(),
            next_id: 1,
            next_kind: ActorKind::FIRST_CUSTOM,
            runtime_ms: 0,
            background_index: 0,
        }
    }

    /// Creates an actor with the next free id and returns that id.
    ///
    /// Ids already taken by materialized actors are skipped, and the counter
    /// wraps back to 1 instead of overflowing.
    pub fn spawn(&mut self, kind: ActorKind, image: Option<PixelImage>) -> u32 {
        let mut id = self.next_id;
        while self.actors.contains_key(&id) {
            id = id.checked_add(1).unwrap_or(1);
        }
        self.next_id = id.checked_add(1).unwrap_or(1);
        self.actors.insert(id, Actor::new(id, kind, image));
        id
    }

    /// Allocates a new game-defined actor kind.
    pub fn create_kind(&mut self) -> ActorKind {
        let kind = ActorKind(self.next_kind);
        self.next_kind += 1;
        kind
    }

    /// Returns the actor with `id`, creating a placeholder when it does not
    /// exist yet. The placeholder keeps the caller's id and the local id
    /// counter is moved past it so locally spawned actors never collide.
    ///
    /// A zero or oversized dimension falls back to [`DEFAULT_EXTENT`].
    pub fn ensure_actor(&mut self, id: u32, kind: ActorKind, width: u32, height: u32) -> &mut Actor {
        if self.next_id <= id {
            if let Some(next) = id.checked_add(1) {
                self.next_id = next;
            }
        }
        self.actors.entry(id).or_insert_with(|| {
            debug!("Materialized actor {} (kind {}, {}x{})", id, kind.0, width, height);
            let image = PixelImage::new(usable_dimension(width), usable_dimension(height));
            Actor::new(id, kind, Some(image))
        })
    }

    pub fn get(&self, id: u32) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.actors.contains_key(&id)
    }

    /// Removes an actor outright, bypassing the tombstone.
    pub fn remove(&mut self, id: u32) -> Option<Actor> {
        self.actors.remove(&id)
    }

    /// Tombstones an actor; it is removed by the next [`World::sweep_destroyed`].
    pub fn destroy(&mut self, id: u32) -> bool {
        match self.actors.get_mut(&id) {
            Some(actor) => {
                actor.destroy();
                true
            }
            None => false,
        }
    }

    /// Drops every tombstoned actor and returns their ids.
    pub fn sweep_destroyed(&mut self) -> Vec<u32> {
        let dead: Vec<u32> = self
            .actors
            .values()
            .filter(|actor| actor.is_destroyed())
            .map(|actor| actor.id)
            .collect();
        for id in &dead {
            self.actors.remove(id);
        }
        dead
    }

    /// Removes every actor whose id does not satisfy `keep`.
    pub fn retain_ids(&mut self, mut keep: impl FnMut(u32) -> bool) -> Vec<u32> {
        let gone: Vec<u32> = self.actors.keys().copied().filter(|id| !keep(*id)).collect();
        for id in &gone {
            self.actors.remove(id);
        }
        gone
    }

    /// Actors in id order, which is creation order.
    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }

    pub fn actors_mut(&mut self) -> impl Iterator<Item = &mut Actor> {
        self.actors.values_mut()
    }

    pub fn actors_of_kind(&self, kind: ActorKind) -> impl Iterator<Item = &Actor> {
        self.actors.values().filter(move |actor| actor.kind == kind)
    }

    pub fn ids(&self) -> Vec<u32> {
        self.actors.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Advances host simulation by `dt` seconds: integrates velocities,
    /// advances world time and tombstones auto-destroy actors that left the
    /// screen. Followers never call this.
    pub fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.runtime_ms += (dt * 1000.0).round() as u64;

        for actor in self.actors.values_mut() {
            if actor.is_destroyed() {
                continue;
            }
            actor.x += actor.vx * dt;
            actor.y += actor.vy * dt;

            if actor.flags.contains(ActorFlags::AUTO_DESTROY) && is_off_screen(actor) {
                actor.destroy();
            }
        }
    }

    /// Pairs of collidable actors whose extents overlap, `a.id < b.id`.
    pub fn overlapping_pairs(&self) -> Vec<(u32, u32)> {
        let live: Vec<&Actor> = self.actors.values().filter(|a| a.is_collidable()).collect();
        let mut pairs = Vec::new();
        for i in 0..live.len() {
            for j in (i + 1)..live.len() {
                if live[i].overlaps(live[j]) {
                    pairs.push((live[i].id, live[j].id));
                }
            }
        }
        pairs
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a width or height from the wire is safe to allocate.
pub fn is_usable_dimension(value: u32) -> bool {
    (1..=MAX_IMAGE_DIMENSION).contains(&value)
}

fn usable_dimension(value: u32) -> u32 {
    if is_usable_dimension(value) {
        value
    } else {
        DEFAULT_EXTENT
    }
}

fn is_off_screen(actor: &Actor) -> bool {
    let (w, h) = actor.extent();
    let (half_w, half_h) = (w as f64 / 2.0, h as f64 / 2.0);
    actor.x + half_w < 0.0
        || actor.x - half_w > SCREEN_WIDTH
        || actor.y + half_h < 0.0
        || actor.y - half_h > SCREEN_HEIGHT
}
