//! Browser host: WebGL backend, 2D fallback readout, animation loop and the
//! `wasm-bindgen` exports.

pub mod backend;
pub mod bindings;
pub mod canvas;
pub mod console;
pub mod frame_loop;
pub mod gl;

pub use backend::WebGlBackend;
pub use bindings::WarpRegistry;
pub use frame_loop::FrameLoop;
