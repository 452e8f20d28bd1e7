//! Framebuffer readback.

use crate::state::Gl33;
use gl;
use gl::types::*;
use std::ffi::c_void;

/// Number of bytes of an RGB8 readback covering a `width` × `height` surface.
///
/// Exactly `width × height × 3`: one byte per channel, no padding.
pub const fn rgb8_buffer_len(width: u32, height: u32) -> usize {
  width as usize * height as usize * 3
}

/// Read the color buffer of the currently bound framebuffer back into CPU
/// memory.
///
/// The returned buffer holds exactly [`rgb8_buffer_len`]`(width, height)`
/// bytes of tightly-packed RGB8 texels, rows bottom-to-top per the OpenGL
/// readback convention. Call this only once the pipeline has been flushed;
/// platform crates expose the matching wait operation.
pub fn read_color_buffer(_ctx: &mut Gl33, width: u32, height: u32) -> Vec<u8> {
  let len = rgb8_buffer_len(width, height);
  let mut texels: Vec<u8> = Vec::with_capacity(len);

  unsafe {
    // rows are tightly packed; don’t let the driver pad them to 4 bytes
    gl::PixelStorei(gl::PACK_ALIGNMENT, 1);

    gl::ReadPixels(
      0,
      0,
      width as GLsizei,
      height as GLsizei,
      gl::RGB,
      gl::UNSIGNED_BYTE,
      texels.as_mut_ptr() as *mut c_void,
    );

    texels.set_len(len);
  }

  texels
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rgb8_buffer_len_covers_the_default_surface() {
    assert_eq!(rgb8_buffer_len(800, 600), 1_440_000);
  }

  #[test]
  fn rgb8_buffer_len_scales_linearly() {
    assert_eq!(rgb8_buffer_len(1600, 600), 2 * rgb8_buffer_len(800, 600));
    assert_eq!(rgb8_buffer_len(800, 1200), 2 * rgb8_buffer_len(800, 600));
    assert_eq!(rgb8_buffer_len(1, 1), 3);
  }

  #[test]
  fn rgb8_buffer_len_degenerate_surfaces() {
    assert_eq!(rgb8_buffer_len(0, 600), 0);
    assert_eq!(rgb8_buffer_len(800, 0), 0);
  }
}
