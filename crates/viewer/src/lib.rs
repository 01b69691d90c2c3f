//! Hosts for the warpfield renderer.
//!
//! Native builds get a wgpu backend and a winit viewer. `wasm32` builds with
//! the `web` feature get a WebGL backend and `wasm-bindgen` exports.

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
#[cfg(not(target_arch = "wasm32"))]
pub mod gpu;

#[cfg(all(target_arch = "wasm32", feature = "web"))]
pub mod web;
