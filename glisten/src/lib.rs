//! # Type-safe, RAII wrappers over OpenGL 3.3 objects
//!
//! glisten wraps the raw OpenGL 3.3 API into small, typed handles (shader
//! stages, programs, buffers and vertex arrays) whose lifetime is tied to the
//! lifetime of the underlying native object: construction acquires the GPU
//! resource and dropping the handle releases it, on every exit path.
//!
//! The crate doesn’t create OpenGL contexts. Platform crates, such as
//! `glisten-egl` for off-screen pbuffer rendering, are responsible for
//! opening a context, making it current and handing you a [`Gl33`] backend
//! value. Every wrapper constructor takes `&mut Gl33`, which statically
//! enforces that a context exists and that all GPU work happens on the thread
//! owning it.
//!
//! What’s included:
//!
//! - **Shader stages and programs** ([`shader`]): compile GLSL sources into
//!   stages, link them into programs, resolve named vertex attributes.
//!   Compile and link failures are distinct errors carrying the driver’s
//!   info log.
//! - **Buffers** ([`buffer`]): upload typed slices into GPU buffers.
//! - **Vertex arrays and attributes** ([`vertex`]): vertex array objects and
//!   attribute pointer setup.
//! - **Pipeline operations** ([`pipeline`]): clear state and draw calls.
//! - **Readback** ([`framebuffer`]): copy the color buffer back into CPU
//!   memory as tightly-packed RGB8 bytes.
//!
//! All of this sits on top of a per-thread [`state::GLState`] cache which
//! skips redundant bind calls.

pub mod buffer;
pub mod context;
pub mod framebuffer;
pub mod pipeline;
pub mod shader;
pub mod state;
pub mod vertex;

pub use crate::state::Gl33;
