//! Graphics context.
//!
//! A graphics context is an object that abstracts the native resources a
//! platform crate acquired to make rendering possible: a display connection,
//! a surface and a current OpenGL context. This crate doesn’t provide you
//! with creating such contexts; platform crates do.
//!
//! # On context and threads
//!
//! An object which type implements [`GraphicsContext`] must be `!Send` and
//! `!Sync`: it cannot be moved nor shared between threads. Because of
//! [`crate::state::GLState`], it’s very likely it’ll be `!Send` and `!Sync`
//! automatically. You can only create a single context per thread; doing
//! otherwise is reported as an error at construction.

/// Class of graphics context.
///
/// Such a context must not be `Send` nor `Sync`, which means that you cannot
/// share it between threads in any way (move / borrow).
pub unsafe trait GraphicsContext {
  /// Backend the context executes GPU commands with.
  type Backend: ?Sized;

  /// Access the underlying backend.
  fn backend(&mut self) -> &mut Self::Backend;
}
