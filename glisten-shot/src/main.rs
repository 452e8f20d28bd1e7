//! Render a red triangle into an off-screen EGL pixel buffer and dump the
//! readback to a file.
//!
//! The output is a headerless, tightly-packed RGB8 dump of the whole surface
//! (bottom row first, per the OpenGL readback convention). The consumer must
//! know the dimensions out of band; they are 800×600 unless changed below.
//!
//! Usage: `glisten-shot [output-path]`. The path defaults to
//! `screenshot.rgb`. The path is printed on stdout on success; the exit code
//! is 0 on success and 1 on any error, which is reported on stderr.

use glisten::buffer::Buffer;
use glisten::context::GraphicsContext;
use glisten::framebuffer;
use glisten::pipeline::{self, Mode, PipelineState};
use glisten::shader::{Program, ProgramError, Stage, StageError, StageType};
use glisten::state::{Gl33, StateQueryError};
use glisten::vertex::{VertexArray, VertexAttribDim};
use glisten_egl::{EglError, EglErrorKind, PbufferSurface, PixelBufferOpt};
use log::error;
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::exit;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;

const DEFAULT_SCREENSHOT_PATH: &str = "screenshot.rgb";

const VS_SRC: &str = "#version 330

in vec3 Position;

void main() {
  gl_Position = vec4(Position, 1.);
}";

const FS_SRC: &str = "#version 330

out vec4 fragColor;

void main() {
  fragColor = vec4(1., 0., 0., 1.);
}";

// one triangle, three components per vertex
const TRIANGLE_VERTS: [f32; 9] = [
  0., 0., 0., //
  1., 0., 0., //
  0., 1., 0., //
];

/// Top-level error of a run.
///
/// EGL failures and OpenGL failures stay in separate arms; they are caught
/// and reported independently.
#[derive(Debug)]
enum AppError {
  /// Context or surface acquisition failed on the EGL side.
  Egl(EglError),
  /// The graphics state could not be initialized.
  State(StateQueryError),
  /// A shader stage failed to compile.
  Stage(StageError),
  /// The shader program failed to link or an attribute lookup failed.
  Program(ProgramError),
  /// Writing the readback to disk failed.
  Io(io::Error),
}

impl fmt::Display for AppError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      AppError::Egl(ref e) => write!(f, "EGL error: {}", e),
      AppError::State(ref e) => write!(f, "OpenGL error: {}", e),
      AppError::Stage(ref e) => write!(f, "OpenGL error: {}", e),
      AppError::Program(ref e) => write!(f, "OpenGL error: {}", e),
      AppError::Io(ref e) => write!(f, "error: {}", e),
    }
  }
}

impl From<EglError> for AppError {
  fn from(e: EglError) -> Self {
    AppError::Egl(e)
  }
}

impl From<StateQueryError> for AppError {
  fn from(e: StateQueryError) -> Self {
    AppError::State(e)
  }
}

impl From<StageError> for AppError {
  fn from(e: StageError) -> Self {
    AppError::Stage(e)
  }
}

impl From<ProgramError> for AppError {
  fn from(e: ProgramError) -> Self {
    AppError::Program(e)
  }
}

impl From<io::Error> for AppError {
  fn from(e: io::Error) -> Self {
    AppError::Io(e)
  }
}

/// Compile, link and draw the fixed triangle into the bound surface.
fn render_frame(gl: &mut Gl33) -> Result<(), AppError> {
  let vs = Stage::new(gl, StageType::VertexShader, VS_SRC)?;
  let fs = Stage::new(gl, StageType::FragmentShader, FS_SRC)?;

  let program = Program::new(gl, &vs, &fs)?;
  program.activate();

  let _triangle = VertexArray::new(gl);
  let verts = Buffer::from_slice(gl, &TRIANGLE_VERTS);

  let position = program.attribute("Position")?;
  position.set_pointer(gl, &verts, VertexAttribDim::Dim3);
  position.enable();

  pipeline::clear_frame(gl, &PipelineState::default());
  pipeline::draw_arrays(gl, Mode::Triangle, 0, verts.len() / 3);

  Ok(())
}

/// Read the color buffer back and write it verbatim to `path`.
fn save_frame(gl: &mut Gl33, width: u32, height: u32, path: &Path) -> Result<(), io::Error> {
  let texels = framebuffer::read_color_buffer(gl, width, height);
  fs::write(path, &texels)?;

  println!("{}", path.display());

  Ok(())
}

fn make_screenshot(width: u32, height: u32, path: &Path) -> Result<(), AppError> {
  // a graphics-state failure is an OpenGL-side problem even though the
  // platform crate is the one reporting it; keep it out of the EGL arm
  let mut surface = PbufferSurface::new(width, height, PixelBufferOpt::default()).map_err(
    |EglError { kind, location }| match kind {
      EglErrorKind::GraphicsStateError(state) => AppError::from(state),
      kind => AppError::Egl(EglError { kind, location }),
    },
  )?;

  render_frame(surface.backend())?;

  // the draw call’s effects must be visible before the CPU-side read
  surface.wait_gl()?;

  save_frame(surface.backend(), width, height, path)?;

  Ok(())
}

/// Output path: the first CLI argument, or the default name.
fn target_path(arg: Option<String>) -> PathBuf {
  match arg {
    Some(path) => PathBuf::from(path),
    None => PathBuf::from(DEFAULT_SCREENSHOT_PATH),
  }
}

fn main() {
  env_logger::init();

  let path = target_path(env::args().nth(1));

  if let Err(e) = make_screenshot(WIDTH, HEIGHT, &path) {
    error!("{}", e);
    exit(1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn no_argument_falls_back_to_the_default_path() {
    assert_eq!(target_path(None), PathBuf::from("screenshot.rgb"));
  }

  #[test]
  fn an_explicit_argument_wins() {
    assert_eq!(
      target_path(Some("out/frame.rgb".to_owned())),
      PathBuf::from("out/frame.rgb")
    );
  }

  #[test]
  fn embedded_sources_are_version_tagged() {
    assert!(VS_SRC.starts_with("#version 330"));
    assert!(FS_SRC.starts_with("#version 330"));
  }

  #[test]
  fn the_payload_is_one_triangle() {
    assert_eq!(TRIANGLE_VERTS.len(), 9);
  }

  #[test]
  fn graphics_state_failures_report_as_opengl_errors() {
    let e = AppError::from(StateQueryError::UnavailableGLState);

    assert!(matches!(e, AppError::State(_)));
    assert!(e.to_string().starts_with("OpenGL error:"));
  }
}
