//! Graphics state.

use gl::types::*;
use std::cell::RefCell;
use std::error;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

// TLS synchronization barrier for `GLState`.
thread_local!(static TLS_ACQUIRE_GFX_STATE: RefCell<Option<()>> = RefCell::new(Some(())));

/// How a bind operation should treat the cached binding.
///
/// [`Bind::Forced`] issues the native bind call regardless of the cache; it is
/// needed when a handle might have been recycled by the driver. [`Bind::Cached`]
/// skips the call if the cache already holds the target value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Bind {
  Forced,
  Cached,
}

/// The graphics state.
///
/// This type represents the current state of a given graphics context. It
/// tracks the objects currently bound on the OpenGL context so that redundant
/// bind calls are skipped. At most one value of this type exists per thread.
#[derive(Debug)]
pub struct GLState {
  _a: PhantomData<*const ()>, // !Send and !Sync

  // array buffer
  bound_array_buffer: GLuint,

  // vertex array
  bound_vertex_array: GLuint,

  // shader program
  current_program: GLuint,

  // clear values
  clear_color: Option<[GLfloat; 4]>,
  clear_depth: Option<GLclampd>,
}

impl GLState {
  /// Create a new `GLState`.
  ///
  /// > Note: keep in mind you can create only one per thread, and only once
  /// > the function loader has run (the platform crate does both for you).
  pub(crate) fn new() -> Result<Self, StateQueryError> {
    TLS_ACQUIRE_GFX_STATE.with(|rc| {
      let mut inner = rc.borrow_mut();

      match *inner {
        Some(_) => {
          inner.take();
          Self::get_from_context()
        }

        None => Err(StateQueryError::UnavailableGLState),
      }
    })
  }

  /// Build the state from the current OpenGL context.
  ///
  /// Verifies that the function loader actually resolved the entry points we
  /// are about to call; a context without them cannot render anything.
  fn get_from_context() -> Result<Self, StateQueryError> {
    verify_loaded_functions()?;

    Ok(GLState {
      _a: PhantomData,
      bound_array_buffer: 0,
      bound_vertex_array: 0,
      current_program: 0,
      clear_color: None,
      clear_depth: None,
    })
  }

  pub(crate) unsafe fn bind_array_buffer(&mut self, handle: GLuint, bind: Bind) {
    if bind == Bind::Forced || self.bound_array_buffer != handle {
      gl::BindBuffer(gl::ARRAY_BUFFER, handle);
      self.bound_array_buffer = handle;
    }
  }

  /// Forget a buffer about to be deleted, unbinding it if it’s in use.
  pub(crate) unsafe fn unbind_buffer(&mut self, handle: GLuint) {
    if self.bound_array_buffer == handle {
      self.bind_array_buffer(0, Bind::Cached);
    }
  }

  pub(crate) unsafe fn bind_vertex_array(&mut self, handle: GLuint, bind: Bind) {
    if bind == Bind::Forced || self.bound_vertex_array != handle {
      gl::BindVertexArray(handle);
      self.bound_vertex_array = handle;
    }
  }

  /// Forget a vertex array about to be deleted, unbinding it if it’s in use.
  pub(crate) unsafe fn unbind_vertex_array(&mut self, handle: GLuint) {
    if self.bound_vertex_array == handle {
      self.bind_vertex_array(0, Bind::Cached);
    }
  }

  pub(crate) unsafe fn use_program(&mut self, handle: GLuint) {
    if self.current_program != handle {
      gl::UseProgram(handle);
      self.current_program = handle;
    }
  }

  pub(crate) unsafe fn set_clear_color(&mut self, color: [GLfloat; 4]) {
    if self.clear_color != Some(color) {
      gl::ClearColor(color[0], color[1], color[2], color[3]);
      self.clear_color = Some(color);
    }
  }

  pub(crate) unsafe fn set_clear_depth(&mut self, depth: GLclampd) {
    if self.clear_depth != Some(depth) {
      gl::ClearDepth(depth);
      self.clear_depth = Some(depth);
    }
  }
}

/// Probe the entry points the crate relies on.
///
/// This is the moral equivalent of checking the return value of `glewInit`:
/// if the loader didn’t resolve a symbol, we want a proper error now instead
/// of a crash at the first draw call.
fn verify_loaded_functions() -> Result<(), StateQueryError> {
  for (symbol, loaded) in loaded_function_probes() {
    if !loaded {
      return Err(StateQueryError::MissingGLFunction { symbol });
    }
  }

  Ok(())
}

// every entry point the crate calls, in rough call order; a loader that
// resolves only part of the API must fail here, not mid-draw
fn loaded_function_probes() -> [(&'static str, bool); 30] {
  [
    ("glGetError", gl::GetError::is_loaded()),
    ("glCreateShader", gl::CreateShader::is_loaded()),
    ("glShaderSource", gl::ShaderSource::is_loaded()),
    ("glCompileShader", gl::CompileShader::is_loaded()),
    ("glGetShaderiv", gl::GetShaderiv::is_loaded()),
    ("glGetShaderInfoLog", gl::GetShaderInfoLog::is_loaded()),
    ("glDeleteShader", gl::DeleteShader::is_loaded()),
    ("glCreateProgram", gl::CreateProgram::is_loaded()),
    ("glAttachShader", gl::AttachShader::is_loaded()),
    ("glLinkProgram", gl::LinkProgram::is_loaded()),
    ("glGetProgramiv", gl::GetProgramiv::is_loaded()),
    ("glGetProgramInfoLog", gl::GetProgramInfoLog::is_loaded()),
    ("glUseProgram", gl::UseProgram::is_loaded()),
    ("glGetAttribLocation", gl::GetAttribLocation::is_loaded()),
    ("glDeleteProgram", gl::DeleteProgram::is_loaded()),
    ("glGenBuffers", gl::GenBuffers::is_loaded()),
    ("glBindBuffer", gl::BindBuffer::is_loaded()),
    ("glBufferData", gl::BufferData::is_loaded()),
    ("glDeleteBuffers", gl::DeleteBuffers::is_loaded()),
    ("glGenVertexArrays", gl::GenVertexArrays::is_loaded()),
    ("glBindVertexArray", gl::BindVertexArray::is_loaded()),
    ("glVertexAttribPointer", gl::VertexAttribPointer::is_loaded()),
    (
      "glEnableVertexAttribArray",
      gl::EnableVertexAttribArray::is_loaded(),
    ),
    ("glDeleteVertexArrays", gl::DeleteVertexArrays::is_loaded()),
    ("glClearColor", gl::ClearColor::is_loaded()),
    ("glClearDepth", gl::ClearDepth::is_loaded()),
    ("glClear", gl::Clear::is_loaded()),
    ("glDrawArrays", gl::DrawArrays::is_loaded()),
    ("glPixelStorei", gl::PixelStorei::is_loaded()),
    ("glReadPixels", gl::ReadPixels::is_loaded()),
  ]
}

/// An error that might happen when the graphics state gets initialized.
#[derive(Debug, Eq, PartialEq)]
pub enum StateQueryError {
  /// The graphics state is not available.
  ///
  /// This error is generated when a state has already been acquired on this
  /// thread; only one context is allowed per thread.
  UnavailableGLState,
  /// The function loader did not resolve an OpenGL entry point.
  MissingGLFunction {
    /// Name of the unresolved native symbol.
    symbol: &'static str,
  },
}

impl fmt::Display for StateQueryError {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StateQueryError::UnavailableGLState => {
        write!(f, "unavailable graphics state on this thread")
      }

      StateQueryError::MissingGLFunction { symbol } => {
        write!(f, "the OpenGL function loader did not resolve {}", symbol)
      }
    }
  }
}

impl error::Error for StateQueryError {}

/// The OpenGL 3.3 backend.
///
/// A value of this type witnesses a current OpenGL context on the calling
/// thread; every wrapper constructor in this crate takes `&mut Gl33`.
#[derive(Debug)]
pub struct Gl33 {
  pub(crate) state: Rc<RefCell<GLState>>,
}

impl Gl33 {
  /// Create a new OpenGL 3.3 backend.
  ///
  /// The function loader must have run before this is called; platform crates
  /// call it right after making their context current.
  pub fn new() -> Result<Self, StateQueryError> {
    GLState::new().map(|state| Gl33 {
      state: Rc::new(RefCell::new(state)),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn state_query_error_names_the_missing_symbol() {
    let e = StateQueryError::MissingGLFunction {
      symbol: "glReadPixels",
    };
    assert_eq!(
      e.to_string(),
      "the OpenGL function loader did not resolve glReadPixels"
    );
  }

  #[test]
  fn loader_probes_cover_the_render_path() {
    let probes = loaded_function_probes();
    let names: Vec<_> = probes.iter().map(|p| p.0).collect();

    for symbol in [
      "glBufferData",
      "glVertexAttribPointer",
      "glClear",
      "glPixelStorei",
      "glLinkProgram",
      "glUseProgram",
    ] {
      assert!(names.contains(&symbol), "{} is not probed", symbol);
    }
  }

  #[test]
  fn state_acquisition_is_once_per_thread() {
    // no loader has run in the test process, so the first acquisition must
    // report the loader failure, not grant a state
    assert_eq!(
      GLState::new().unwrap_err(),
      StateQueryError::MissingGLFunction {
        symbol: "glGetError"
      }
    );

    // the slot was consumed by the first attempt
    assert_eq!(
      GLState::new().unwrap_err(),
      StateQueryError::UnavailableGLState
    );
  }
}
