//! Ember Core - shading and scene capabilities for the path tracer.
//!
//! This crate provides:
//!
//! - **Capability traits**: `Shape`, `Material`, `Light`, `Sky` - the seams
//!   the renderer talks through
//! - **Meshes**: `Mesh` (indexed vertex data) and `MeshInstance`
//!   (world-space baked buffers)
//! - **BSDF composer**: a per-shading-point lobe arena populated by
//!   materials and consumed by the integrator
//! - **Scene**: an actor table plus the flat drawable/light arrays the
//!   renderer scans

pub mod bsdf;
pub mod light;
pub mod lobes;
pub mod material;
pub mod mesh;
pub mod meshgen;
pub mod sampling;
pub mod scene;
pub mod shape;
pub mod sky;

// Re-export commonly used types
pub use bsdf::{Bsdf, BsdfSample, Lobe, LobeKind};
pub use light::{DirectionalLight, Light, LightSample, PointLight};
pub use material::{CutoutMaterial, DiffuseMaterial, EmissiveMaterial, Material, TransparentMaterial};
pub use mesh::{Mesh, MeshError, MeshInstance, Vertex, VertexAttributes};
pub use scene::{Actor, ActorId, BakedScene, DrawableActor, LightActor, Scene};
pub use shape::{Fragment, Intersection, Shape};
pub use sky::{GradientSky, Sky, UniformSky};
