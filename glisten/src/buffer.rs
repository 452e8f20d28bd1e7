//! OpenGL buffer implementation.

use crate::state::{Bind, Gl33, GLState};
use gl;
use gl::types::*;
use log::debug;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::mem;
use std::rc::Rc;

/// Wrapped OpenGL buffer.
///
/// Used to drop the buffer.
#[derive(Debug)]
struct BufferWrapper {
  handle: GLuint,
  state: Rc<RefCell<GLState>>,
}

impl Drop for BufferWrapper {
  fn drop(&mut self) {
    unsafe {
      self.state.borrow_mut().unbind_buffer(self.handle);
      gl::DeleteBuffers(1, &self.handle);
    }
  }
}

/// OpenGL buffer.
///
/// A typed region of GPU memory filled once at construction. The native
/// buffer object is deleted when the value is dropped.
#[derive(Debug)]
pub struct Buffer<T> {
  gl_buf: BufferWrapper,
  len: usize,
  _t: PhantomData<*const T>,
}

impl<T> Buffer<T>
where
  T: Copy,
{
  /// Create a buffer on the array target and upload a slice of data into it.
  ///
  /// The buffer is left bound on the array target.
  pub fn from_slice(ctx: &mut Gl33, slice: &[T]) -> Self {
    let mut handle: GLuint = 0;

    unsafe {
      gl::GenBuffers(1, &mut handle);
      ctx
        .state
        .borrow_mut()
        .bind_array_buffer(handle, Bind::Forced);

      let bytes = mem::size_of::<T>() * slice.len();
      gl::BufferData(
        gl::ARRAY_BUFFER,
        bytes as isize,
        slice.as_ptr() as _,
        gl::STATIC_DRAW,
      );
    }

    debug!("uploaded {} elements into buffer {}", slice.len(), handle);

    let state = ctx.state.clone();
    let gl_buf = BufferWrapper { handle, state };

    Buffer {
      gl_buf,
      len: slice.len(),
      _t: PhantomData,
    }
  }

  pub(crate) fn handle(&self) -> GLuint {
    self.gl_buf.handle
  }

  /// Length of the buffer (number of elements).
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  /// Whether the buffer holds no element.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }
}
