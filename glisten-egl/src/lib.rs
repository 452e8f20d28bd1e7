//! The [EGL] pbuffer implementation for [glisten].
//!
//! This crate acquires a current, off-screen OpenGL context backed by an EGL
//! pixel buffer surface of a requested size, and hands you a
//! [`glisten::Gl33`] backend to render with. No windowing toolkit is
//! involved; the target is headless rendering (tests, CI, screenshot tools).
//!
//! libEGL is loaded dynamically at run time, so this crate builds and
//! unit-tests on machines without an EGL driver; the failure surfaces as a
//! proper [`EglErrorKind::Loader`] instead.
//!
//! [EGL]: https://www.khronos.org/egl
//! [glisten]: https://crates.io/crates/glisten

#![deny(missing_docs)]

use gl;
use glisten::context::GraphicsContext;
use glisten::state::{Gl33, StateQueryError};
use khronos_egl as egl;
use log::debug;
use std::ffi::c_void;
use std::fmt;
use std::panic::Location;
use std::ptr;

type EglInstance = egl::DynamicInstance<egl::EGL1_4>;

// value of EGL_CONTEXT_MINOR_VERSION (aliased from EGL_KHR_create_context so
// an EGL 1.4 driver carrying the extension accepts it too)
const CONTEXT_MINOR_VERSION_KHR: egl::Int = 0x30FB;

/// Error that might occur when creating or using an EGL pbuffer surface.
///
/// Besides the failure kind, the error carries the source location of the
/// wrapper call that failed, and renders it as a `[file:line]` suffix.
#[derive(Debug)]
pub struct EglError {
  /// What failed.
  pub kind: EglErrorKind,
  /// Source location of the failing wrapper call.
  pub location: &'static Location<'static>,
}

/// Kinds of EGL failures.
///
/// Each variant names the native EGL call that failed, so the failing symbol
/// is always part of the rendered message.
#[derive(Debug)]
pub enum EglErrorKind {
  /// libEGL could not be loaded at run time.
  Loader(String),
  /// `eglGetDisplay` returned no display for the default display id.
  NoDisplay,
  /// `eglInitialize` failed.
  Initialize(egl::Error),
  /// `eglChooseConfig` failed.
  ChooseConfig(egl::Error),
  /// `eglChooseConfig` succeeded but matched no config for the requested
  /// attributes. A weaker config is never substituted.
  NoMatchingConfig,
  /// `eglCreatePbufferSurface` failed.
  CreateSurface(egl::Error),
  /// `eglBindAPI` failed to bind the OpenGL API.
  BindApi(egl::Error),
  /// `eglCreateContext` failed.
  CreateContext(egl::Error),
  /// `eglMakeCurrent` failed.
  MakeCurrent(egl::Error),
  /// `eglWaitGL` failed.
  WaitGl(egl::Error),
  /// Graphics state error that might occur when querying the initial state.
  GraphicsStateError(StateQueryError),
}

impl fmt::Display for EglErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      EglErrorKind::Loader(ref e) => write!(f, "unable to load libEGL: {}", e),
      EglErrorKind::NoDisplay => f.write_str("eglGetDisplay returned no default display"),
      EglErrorKind::Initialize(ref e) => write!(f, "eglInitialize failed: {}", e),
      EglErrorKind::ChooseConfig(ref e) => write!(f, "eglChooseConfig failed: {}", e),
      EglErrorKind::NoMatchingConfig => {
        f.write_str("eglChooseConfig found no config matching the requested attributes")
      }
      EglErrorKind::CreateSurface(ref e) => write!(f, "eglCreatePbufferSurface failed: {}", e),
      EglErrorKind::BindApi(ref e) => write!(f, "eglBindAPI failed: {}", e),
      EglErrorKind::CreateContext(ref e) => write!(f, "eglCreateContext failed: {}", e),
      EglErrorKind::MakeCurrent(ref e) => write!(f, "eglMakeCurrent failed: {}", e),
      EglErrorKind::WaitGl(ref e) => write!(f, "eglWaitGL failed: {}", e),
      EglErrorKind::GraphicsStateError(ref e) => {
        write!(f, "OpenGL graphics state initialization error: {}", e)
      }
    }
  }
}

impl fmt::Display for EglError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    write!(
      f,
      "{} [{}:{}]",
      self.kind,
      self.location.file(),
      self.location.line()
    )
  }
}

impl std::error::Error for EglError {}

/// Pixel buffer options.
///
/// Framebuffer attributes requested from the EGL config enumeration, plus the
/// OpenGL version requested for the context. You may want to start with
/// `default()`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PixelBufferOpt {
  red_bits: egl::Int,
  green_bits: egl::Int,
  blue_bits: egl::Int,
  depth_bits: egl::Int,
  stencil_bits: egl::Int,
  gl_version: (egl::Int, egl::Int),
}

impl Default for PixelBufferOpt {
  /// Defaults:
  ///
  /// - 8 bits per color channel.
  /// - 24-bit depth buffer, 8-bit stencil buffer.
  /// - OpenGL 3.3 context.
  fn default() -> Self {
    PixelBufferOpt {
      red_bits: 8,
      green_bits: 8,
      blue_bits: 8,
      depth_bits: 24,
      stencil_bits: 8,
      gl_version: (3, 3),
    }
  }
}

impl PixelBufferOpt {
  /// Set the red/green/blue channel bit sizes.
  pub fn set_color_bits(self, red: i32, green: i32, blue: i32) -> Self {
    PixelBufferOpt {
      red_bits: red,
      green_bits: green,
      blue_bits: blue,
      ..self
    }
  }

  /// Set the depth buffer bit size.
  pub fn set_depth_bits(self, depth: i32) -> Self {
    PixelBufferOpt {
      depth_bits: depth,
      ..self
    }
  }

  /// Set the stencil buffer bit size.
  pub fn set_stencil_bits(self, stencil: i32) -> Self {
    PixelBufferOpt {
      stencil_bits: stencil,
      ..self
    }
  }

  /// Set the OpenGL version requested for the context.
  pub fn set_gl_version(self, major: i32, minor: i32) -> Self {
    PixelBufferOpt {
      gl_version: (major, minor),
      ..self
    }
  }

  /// Get the OpenGL version requested for the context.
  pub fn gl_version(&self) -> (i32, i32) {
    self.gl_version
  }

  /// Config attribute list handed to `eglChooseConfig`.
  fn config_attribs(&self) -> [egl::Int; 15] {
    [
      egl::SURFACE_TYPE,
      egl::PBUFFER_BIT,
      egl::RENDERABLE_TYPE,
      egl::OPENGL_BIT,
      egl::RED_SIZE,
      self.red_bits,
      egl::GREEN_SIZE,
      self.green_bits,
      egl::BLUE_SIZE,
      self.blue_bits,
      egl::DEPTH_SIZE,
      self.depth_bits,
      egl::STENCIL_SIZE,
      self.stencil_bits,
      egl::NONE,
    ]
  }

  /// Context attribute list handed to `eglCreateContext`.
  fn context_attribs(&self) -> [egl::Int; 5] {
    [
      egl::CONTEXT_CLIENT_VERSION,
      self.gl_version.0,
      CONTEXT_MINOR_VERSION_KHR,
      self.gl_version.1,
      egl::NONE,
    ]
  }
}

/// Surface attribute list handed to `eglCreatePbufferSurface`.
fn surface_attribs(width: u32, height: u32) -> [egl::Int; 5] {
  [
    egl::WIDTH,
    width as egl::Int,
    egl::HEIGHT,
    height as egl::Int,
    egl::NONE,
  ]
}

/// The EGL pbuffer surface.
///
/// You want to create such an object in order to use any [glisten] construct
/// off-screen. Dropping it releases the context, the surface and the display
/// connection.
///
/// [glisten]: https://crates.io/crates/glisten
pub struct PbufferSurface {
  egl: EglInstance,
  display: egl::Display,
  context: egl::Context,
  surface: egl::Surface,
  size: [u32; 2],
  /// OpenGL 3.3 state.
  gl: Gl33,
}

unsafe impl GraphicsContext for PbufferSurface {
  type Backend = Gl33;

  fn backend(&mut self) -> &mut Self::Backend {
    &mut self.gl
  }
}

impl PbufferSurface {
  /// Create a new [`PbufferSurface`] of the given size.
  ///
  /// Runs the whole acquisition sequence: load libEGL, open and initialize
  /// the default display, pick the first config matching `opt`, create the
  /// pbuffer, bind the OpenGL API, create a context requesting the configured
  /// version and make it current. Any failing step aborts the sequence with
  /// the corresponding [`EglError`]; nothing is retried. The returned error
  /// points back at this call site.
  #[track_caller]
  pub fn new(width: u32, height: u32, opt: PixelBufferOpt) -> Result<Self, EglError> {
    let location = Location::caller();
    let fail = |kind| EglError { kind, location };

    let egl = unsafe { EglInstance::load_required() }
      .map_err(|e| fail(EglErrorKind::Loader(e.to_string())))?;

    let display =
      unsafe { egl.get_display(egl::DEFAULT_DISPLAY) }.ok_or(fail(EglErrorKind::NoDisplay))?;
    let (major, minor) = egl
      .initialize(display)
      .map_err(|e| fail(EglErrorKind::Initialize(e)))?;
    debug!("initialized EGL {}.{}", major, minor);

    // first matching config is an unconditional accept
    let config = egl
      .choose_first_config(display, &opt.config_attribs())
      .map_err(|e| fail(EglErrorKind::ChooseConfig(e)))?
      .ok_or(fail(EglErrorKind::NoMatchingConfig))?;

    let surface = egl
      .create_pbuffer_surface(display, config, &surface_attribs(width, height))
      .map_err(|e| fail(EglErrorKind::CreateSurface(e)))?;

    egl
      .bind_api(egl::OPENGL_API)
      .map_err(|e| fail(EglErrorKind::BindApi(e)))?;

    let context = egl
      .create_context(display, config, None, &opt.context_attribs())
      .map_err(|e| fail(EglErrorKind::CreateContext(e)))?;

    egl
      .make_current(display, Some(surface), Some(surface), Some(context))
      .map_err(|e| fail(EglErrorKind::MakeCurrent(e)))?;
    debug!(
      "made OpenGL {}.{} context current on a {}×{} pbuffer",
      opt.gl_version.0, opt.gl_version.1, width, height
    );

    // init OpenGL
    gl::load_with(|s| match egl.get_proc_address(s) {
      Some(p) => p as *const c_void,
      None => ptr::null(),
    });

    let gl = Gl33::new().map_err(|e| fail(EglErrorKind::GraphicsStateError(e)))?;

    Ok(PbufferSurface {
      egl,
      display,
      context,
      surface,
      size: [width, height],
      gl,
    })
  }

  /// Get the underlying size (in pixels) of the surface.
  pub fn size(&self) -> [u32; 2] {
    self.size
  }

  /// Width of the surface.
  pub fn width(&self) -> u32 {
    self.size[0]
  }

  /// Height of the surface.
  pub fn height(&self) -> u32 {
    self.size[1]
  }

  /// Wait for the OpenGL pipeline to complete.
  ///
  /// This is the ordering guarantee between the asynchronous graphics
  /// pipeline and a CPU-side readback: call it after the last draw call and
  /// before [`glisten::framebuffer::read_color_buffer`].
  #[track_caller]
  pub fn wait_gl(&self) -> Result<(), EglError> {
    let location = Location::caller();

    self.egl.wait_gl().map_err(|e| EglError {
      kind: EglErrorKind::WaitGl(e),
      location,
    })
  }
}

impl Drop for PbufferSurface {
  fn drop(&mut self) {
    // release the context before destroying what it’s bound to; failures on
    // the teardown path are unreportable at this point
    let _ = self.egl.make_current(self.display, None, None, None);
    let _ = self.egl.destroy_surface(self.display, self.surface);
    let _ = self.egl.destroy_context(self.display, self.context);
    let _ = self.egl.terminate(self.display);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_attribs_are_pairs_terminated_by_none() {
    let attribs = PixelBufferOpt::default().config_attribs();

    assert_eq!(attribs.len() % 2, 1);
    assert_eq!(*attribs.last().unwrap(), egl::NONE);

    // every even slot is an attribute key
    assert_eq!(attribs[0], egl::SURFACE_TYPE);
    assert_eq!(attribs[1], egl::PBUFFER_BIT);
    assert_eq!(attribs[2], egl::RENDERABLE_TYPE);
    assert_eq!(attribs[3], egl::OPENGL_BIT);
  }

  #[test]
  fn config_attribs_carry_the_requested_bit_sizes() {
    let opt = PixelBufferOpt::default()
      .set_color_bits(5, 6, 5)
      .set_depth_bits(16)
      .set_stencil_bits(0);
    let attribs = opt.config_attribs();

    assert_eq!(attribs[4], egl::RED_SIZE);
    assert_eq!(attribs[5], 5);
    assert_eq!(attribs[7], 6);
    assert_eq!(attribs[9], 5);
    assert_eq!(attribs[10], egl::DEPTH_SIZE);
    assert_eq!(attribs[11], 16);
    assert_eq!(attribs[12], egl::STENCIL_SIZE);
    assert_eq!(attribs[13], 0);
  }

  #[test]
  fn default_options_request_888_24_8_gl33() {
    let opt = PixelBufferOpt::default();
    let attribs = opt.config_attribs();

    assert_eq!(&attribs[5..6], &[8]);
    assert_eq!(attribs[11], 24);
    assert_eq!(attribs[13], 8);
    assert_eq!(opt.gl_version(), (3, 3));
  }

  #[test]
  fn context_attribs_request_the_configured_version() {
    let attribs = PixelBufferOpt::default().set_gl_version(3, 0).context_attribs();

    assert_eq!(
      attribs,
      [
        egl::CONTEXT_CLIENT_VERSION,
        3,
        CONTEXT_MINOR_VERSION_KHR,
        0,
        egl::NONE
      ]
    );
  }

  #[test]
  fn errors_render_the_native_symbol_and_the_call_site() {
    let location = Location::caller();
    let e = EglError {
      kind: EglErrorKind::NoMatchingConfig,
      location,
    };
    let msg = e.to_string();

    assert!(msg.starts_with("eglChooseConfig found no config matching the requested attributes"));
    assert!(msg.ends_with(&format!("[{}:{}]", file!(), location.line())));
  }

  #[test]
  fn surface_attribs_carry_the_requested_size() {
    let attribs = surface_attribs(800, 600);

    assert_eq!(
      attribs,
      [egl::WIDTH, 800, egl::HEIGHT, 600, egl::NONE]
    );
  }
}
