//! Actor table and the flat render lists baked from it.
//!
//! Actors are stored in a slot table addressed by `ActorId` (1-based; 0 is
//! invalid). Deleted slots go on a tombstone list and are reused by later
//! insertions. The renderer never walks the table directly: a single-threaded
//! `bake` step flattens it into `DrawableActor`/`LightActor` arrays that stay
//! read-only while a frame is in flight.

use std::sync::Arc;

use crate::light::Light;
use crate::material::Material;
use crate::shape::Shape;

/// Handle to an actor. `0` is reserved as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActorId(u32);

impl ActorId {
    pub const INVALID: ActorId = ActorId(0);

    pub fn valid(self) -> bool {
        self.0 > 0
    }

    fn index(self) -> usize {
        self.0 as usize - 1
    }
}

/// A scene entity: any combination of shape+material and/or light.
#[derive(Clone, Default)]
pub struct Actor {
    shape: Option<Arc<dyn Shape>>,
    material: Option<Arc<dyn Material>>,
    light: Option<Arc<dyn Light>>,
}

impl Actor {
    pub fn shape(&self) -> Option<&Arc<dyn Shape>> {
        self.shape.as_ref()
    }

    pub fn material(&self) -> Option<&Arc<dyn Material>> {
        self.material.as_ref()
    }

    pub fn light(&self) -> Option<&Arc<dyn Light>> {
        self.light.as_ref()
    }
}

/// Owning scene-graph stand-in: a flat actor table with id reuse.
#[derive(Default)]
pub struct Scene {
    actors: Vec<Actor>,
    alive: Vec<ActorId>,
    tombstones: Vec<ActorId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, actor: Actor) -> ActorId {
        let id = match self.tombstones.pop() {
            Some(id) => {
                self.actors[id.index()] = actor;
                id
            }
            None => {
                self.actors.push(actor);
                ActorId(self.actors.len() as u32)
            }
        };
        self.alive.push(id);
        id
    }

    /// Add a renderable (shape, material) actor.
    pub fn new_drawable_actor(
        &mut self,
        shape: Arc<dyn Shape>,
        material: Arc<dyn Material>,
    ) -> ActorId {
        self.allocate(Actor {
            shape: Some(shape),
            material: Some(material),
            light: None,
        })
    }

    /// Add a light actor.
    pub fn new_light_actor(&mut self, light: Arc<dyn Light>) -> ActorId {
        self.allocate(Actor {
            shape: None,
            material: None,
            light: Some(light),
        })
    }

    /// Delete an actor; its id may be handed out again later.
    pub fn delete_actor(&mut self, id: ActorId) {
        if let Some(pos) = self.alive.iter().position(|&a| a == id) {
            self.alive.swap_remove(pos);
            self.actors[id.index()] = Actor::default();
            self.tombstones.push(id);
        }
    }

    pub fn len(&self) -> usize {
        self.alive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alive.is_empty()
    }

    /// Visit every live actor in insertion order.
    pub fn query_scene(&self, mut callback: impl FnMut(&Actor)) {
        for &id in &self.alive {
            callback(&self.actors[id.index()]);
        }
    }
}

/// A (shape, material) pair the integrator scans linearly.
#[derive(Clone)]
pub struct DrawableActor {
    pub shape: Arc<dyn Shape>,
    pub material: Arc<dyn Material>,
}

/// A bare light reference.
#[derive(Clone)]
pub struct LightActor {
    pub light: Arc<dyn Light>,
}

/// Flat render lists rebuilt whenever the scene graph changes.
#[derive(Default)]
pub struct BakedScene {
    pub drawables: Vec<DrawableActor>,
    pub lights: Vec<LightActor>,
}

impl BakedScene {
    /// Flatten the actor table into linear-scan arrays.
    pub fn bake(scene: &Scene) -> Self {
        let mut baked = BakedScene::default();
        scene.query_scene(|actor| {
            if let (Some(shape), Some(material)) = (actor.shape(), actor.material()) {
                baked.drawables.push(DrawableActor {
                    shape: shape.clone(),
                    material: material.clone(),
                });
            }
            if let Some(light) = actor.light() {
                baked.lights.push(LightActor {
                    light: light.clone(),
                });
            }
        });
        log::debug!(
            "baked scene: {} drawables, {} lights",
            baked.drawables.len(),
            baked.lights.len()
        );
        baked
    }
}
