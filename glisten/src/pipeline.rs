//! Clearing and draw calls.

use crate::state::Gl33;
use gl;
use gl::types::*;

/// Various picked up settings for a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineState {
  /// Color to use when clearing the color buffer.
  pub clear_color: [f32; 4],
  /// Depth value to use when clearing the depth buffer.
  pub clear_depth: f32,
}

impl Default for PipelineState {
  /// Default [`PipelineState`]:
  ///
  /// - Clear color is transparent black.
  /// - Clear depth is the far plane (`1.0`).
  fn default() -> Self {
    PipelineState {
      clear_color: [0., 0., 0., 0.],
      clear_depth: 1.,
    }
  }
}

impl PipelineState {
  /// Set the clear color.
  pub fn set_clear_color(self, clear_color: [f32; 4]) -> Self {
    Self {
      clear_color,
      ..self
    }
  }

  /// Set the clear depth.
  pub fn set_clear_depth(self, clear_depth: f32) -> Self {
    Self {
      clear_depth,
      ..self
    }
  }
}

/// Render mode of non-indexed draw calls.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
  /// A single point per vertex.
  Point,
  /// A line per pair of vertices.
  Line,
  /// A line connecting every vertex to the next one.
  LineStrip,
  /// A triangle per triple of vertices.
  Triangle,
  /// A triangle per vertex, sharing an edge with the previous one.
  TriangleStrip,
  /// A triangle fan around the first vertex.
  TriangleFan,
}

fn opengl_mode(mode: Mode) -> GLenum {
  match mode {
    Mode::Point => gl::POINTS,
    Mode::Line => gl::LINES,
    Mode::LineStrip => gl::LINE_STRIP,
    Mode::Triangle => gl::TRIANGLES,
    Mode::TriangleStrip => gl::TRIANGLE_STRIP,
    Mode::TriangleFan => gl::TRIANGLE_FAN,
  }
}

/// Clear the color and depth buffers with the values carried by the pipeline
/// state.
pub fn clear_frame(ctx: &mut Gl33, pipeline_state: &PipelineState) {
  unsafe {
    let mut state = ctx.state.borrow_mut();
    state.set_clear_color(pipeline_state.clear_color);
    state.set_clear_depth(pipeline_state.clear_depth as GLclampd);
    drop(state);

    gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);
  }
}

/// Issue a non-indexed draw call for `vert_nb` vertices starting at `first`.
pub fn draw_arrays(_ctx: &mut Gl33, mode: Mode, first: i32, vert_nb: usize) {
  unsafe {
    gl::DrawArrays(opengl_mode(mode), first, vert_nb as GLsizei);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pipeline_state_defaults() {
    let st = PipelineState::default();
    assert_eq!(st.clear_color, [0., 0., 0., 0.]);
    assert_eq!(st.clear_depth, 1.);
  }

  #[test]
  fn pipeline_state_setters_override_defaults() {
    let st = PipelineState::default()
      .set_clear_color([1., 0., 0., 1.])
      .set_clear_depth(0.5);
    assert_eq!(st.clear_color, [1., 0., 0., 1.]);
    assert_eq!(st.clear_depth, 0.5);
  }
}
