//! Natário warp-bubble field renderer.
//!
//! Platform independent core: parameter state, grid geometry, the
//! displacement field, camera math, shader sources and the engine that drives
//! any [`GpuBackend`]. Concrete backends live in the `warp-viewer` crate.

pub mod backend;
pub mod bus;
pub mod camera;
pub mod config;
pub mod deform;
pub mod engine;
pub mod error;
pub mod flags;
pub mod geometry;
pub mod parity;
pub mod program;
pub mod registry;
pub mod shaders;
pub mod testing;
pub mod uniforms;

pub use backend::{BufferUsage, Capabilities, GpuBackend, LogStatus, Primitive, StatusSurface};
pub use bus::{Delivery, Subscription, UniformBus, UNIFORMS_TOPIC};
pub use camera::{compose, WarpCamera};
pub use config::{EngineConfig, SheetColors, ShowBoost};
pub use deform::{deform_grid, DeformParams, DeformStats};
pub use engine::{status_lines, Destroy, EngineMode, EngineState, UniformSink, WarpEngine};
pub use error::{RenderError, ShaderStage};
pub use flags::FeatureFlags;
pub use geometry::{build_grid, GridConfig, GridGeometry, Plane};
pub use parity::{DualEngine, LockParity, LockedEngine, Parity};
pub use program::ShaderProgram;
pub use registry::EngineRegistry;
pub use shaders::{select_shader_source, ProgramKind, ShaderSet, ShaderTier};
pub use uniforms::{FrameUniforms, RidgeMode, UniformDefaults, WarpParams, ENERGY_CONDITION_BETA0};
