//! Vertex arrays and vertex attributes.

use crate::buffer::Buffer;
use crate::state::{Bind, Gl33, GLState};
use gl;
use gl::types::*;
use std::cell::RefCell;
use std::ptr;
use std::rc::Rc;

/// A vertex array object.
///
/// Creating a vertex array binds it; it captures the attribute pointer setup
/// performed while it is bound. The native object is deleted on drop.
#[derive(Debug)]
pub struct VertexArray {
  vao: GLuint,
  state: Rc<RefCell<GLState>>,
}

impl Drop for VertexArray {
  fn drop(&mut self) {
    unsafe {
      self.state.borrow_mut().unbind_vertex_array(self.vao);
      gl::DeleteVertexArrays(1, &self.vao);
    }
  }
}

impl VertexArray {
  /// Create and bind a new vertex array.
  pub fn new(ctx: &mut Gl33) -> Self {
    let mut vao: GLuint = 0;

    unsafe {
      gl::GenVertexArrays(1, &mut vao);

      // force binding the vertex array so that previously bound vertex arrays
      // (possibly the same handle) don’t prevent us from binding here
      ctx.state.borrow_mut().bind_vertex_array(vao, Bind::Forced);
    }

    VertexArray {
      vao,
      state: ctx.state.clone(),
    }
  }

  /// Bind the vertex array.
  pub fn bind(&self, ctx: &mut Gl33) {
    unsafe {
      ctx.state.borrow_mut().bind_vertex_array(self.vao, Bind::Cached);
    }
  }
}

/// Dimension of a vertex attribute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexAttribDim {
  /// 1D.
  Dim1,
  /// 2D.
  Dim2,
  /// 3D.
  Dim3,
  /// 4D.
  Dim4,
}

fn dim_as_size(d: VertexAttribDim) -> GLint {
  match d {
    VertexAttribDim::Dim1 => 1,
    VertexAttribDim::Dim2 => 2,
    VertexAttribDim::Dim3 => 3,
    VertexAttribDim::Dim4 => 4,
  }
}

/// A resolved vertex attribute of a linked program.
///
/// Obtained with [`crate::shader::Program::attribute`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VertexAttrib {
  index: GLuint,
}

impl VertexAttrib {
  pub(crate) fn new(index: GLuint) -> Self {
    VertexAttrib { index }
  }

  /// Point the attribute at a tightly-packed float buffer.
  ///
  /// Must be called while the vertex array capturing the setup is bound.
  pub fn set_pointer(&self, ctx: &mut Gl33, buffer: &Buffer<f32>, dim: VertexAttribDim) {
    unsafe {
      ctx
        .state
        .borrow_mut()
        .bind_array_buffer(buffer.handle(), Bind::Cached);

      gl::VertexAttribPointer(
        self.index,
        dim_as_size(dim),
        gl::FLOAT,
        gl::FALSE,
        0,
        ptr::null(),
      );
    }
  }

  /// Enable the attribute.
  pub fn enable(&self) {
    unsafe {
      gl::EnableVertexAttribArray(self.index);
    }
  }

  /// Location of the attribute in the program.
  pub fn index(&self) -> u32 {
    self.index
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dims_map_to_component_counts() {
    assert_eq!(dim_as_size(VertexAttribDim::Dim1), 1);
    assert_eq!(dim_as_size(VertexAttribDim::Dim3), 3);
    assert_eq!(dim_as_size(VertexAttribDim::Dim4), 4);
  }
}
