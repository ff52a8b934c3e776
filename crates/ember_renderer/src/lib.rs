//! Ember Renderer - progressive CPU path tracing.
//!
//! A Monte Carlo path tracer built on the `ember_core` capability traits:
//! per-mesh BVH acceleration, an iterative integrator with next-event
//! estimation, and a bucket scheduler feeding a progressive accumulation
//! buffer.

pub mod accum;
pub mod bvh;
pub mod camera;
pub mod integrator;
pub mod renderer;
pub mod rng;
pub mod scheduler;
pub mod tile;

pub use accum::{AccumBuffer, Rgba8};
pub use bvh::Bvh;
pub use camera::Camera;
pub use integrator::{Integrator, PathSettings};
pub use renderer::{RenderParameters, Renderer};
pub use rng::{pixel_seed, HashRng};
pub use scheduler::TileScheduler;
pub use tile::{tiles_for, Tile, TILE_SIZE};

/// Re-export common math types
pub use ember_math::{Aabb, Ray, Vec3};
