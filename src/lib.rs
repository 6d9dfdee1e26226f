//! vantage3d
//!
//! An interactive 3D scene viewer/editor engine with an OpenGL renderer.
//! The crate exposes a scene graph of transformable entities (meshes, lights,
//! a camera), GPU resource wrappers for textures and geometry buffers, and a
//! render engine that traverses the scene each frame, selects shader programs
//! per draw, uploads uniform-buffer blocks and issues the draw calls.
//!
//! Window creation and the event loop belong to the embedding application;
//! the engine only consumes a [`context::RenderTarget`] for context creation
//! and buffer swapping, and exposes input handler entry points on the camera.
//!
//! High-level modules
//! - `context`: the render context owning scene state, canvas info and config
//! - `scene`: transforms, camera, lights, meshes, materials and textures
//! - `render`: shader programs, uniform packing, the graphics device and the
//!   per-frame render engine
//! - `resources`: file import boundaries (models, images, shader sources)
//! - `time`: frame clock / delta-time bookkeeping
//! - `logging`: one-shot logger initialization
//!

pub mod context;
pub mod logging;
pub mod render;
pub mod resources;
pub mod scene;
pub mod time;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::{Deg, Matrix4, Point3, Rad, Vector2, Vector3, Vector4};
pub use winit::dpi::PhysicalSize;
pub use winit::event::MouseScrollDelta;
pub use winit::keyboard::{KeyCode, ModifiersState};
