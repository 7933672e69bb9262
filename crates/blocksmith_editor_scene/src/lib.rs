// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scene model for the Blocksmith editor.
//!
//! This crate owns everything about a scene that is independent of user
//! interaction:
//! - Transform value types and the little geometry the editor needs itself
//! - Blocks (primitive cuboids, groups, component instances)
//! - The block store, the single owner of block lifecycle
//! - The scenario interchange format and its (de)serializer
//! - Persistence back ends for components and scenarios
//!
//! ## Architecture
//!
//! Rendering and camera math live in an external engine. The editor only
//! talks to it through the [`camera::Viewport`] capability, for which a
//! reference [`camera::OrbitCamera`] is provided.

pub mod block;
pub mod camera;
pub mod error;
pub mod math;
pub mod persistence;
pub mod scenario;
pub mod serializer;
pub mod store;

pub use block::{Block, BlockId, BlockKind, ComponentId, ComponentRole, OutlineColor, PrimitiveShape};
pub use camera::{OrbitCamera, Viewport};
pub use error::{SceneError, StoreError};
pub use math::{Aabb, Ray, Transform, MIN_SCALE, TRANSFORM_EPSILON};
pub use persistence::{DirectoryStore, EditorStore, MemoryStore};
pub use scenario::{ComponentMemberTransform, SavedComponent, ScenarioFile, ScenarioId, ScenarioSummary};
pub use serializer::{IdPolicy, NodeType, SerializedNode};
pub use store::{BlockStore, RayHit};
