//! Shader stages and programs.

use crate::state::{Gl33, GLState};
use crate::vertex::VertexAttrib;
use gl::{self, types::*};
use log::debug;
use std::cell::RefCell;
use std::error;
use std::ffi::CString;
use std::fmt;
use std::panic::Location;
use std::ptr::{null, null_mut};
use std::rc::Rc;

/// A shader stage type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StageType {
  /// Vertex shader.
  VertexShader,
  /// Fragment shader.
  FragmentShader,
}

impl fmt::Display for StageType {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageType::VertexShader => f.write_str("vertex shader"),
      StageType::FragmentShader => f.write_str("fragment shader"),
    }
  }
}

/// Error a shader stage might emit.
///
/// Besides the failure itself, the error carries the source location of the
/// wrapper call that failed, and renders it as a `[file:line]` suffix.
#[derive(Debug)]
pub struct StageError {
  /// What failed.
  pub kind: StageErrorKind,
  /// Source location of the failing wrapper call.
  pub location: &'static Location<'static>,
}

/// Kinds of shader stage failures.
#[derive(Debug)]
pub enum StageErrorKind {
  /// Occurs when a shader fails to compile.
  ///
  /// Carries the failing stage and the driver’s info log. Compile failures
  /// are always attributed to their stage, never to the link phase.
  CompilationFailed(StageType, String),
  /// Occurs when the driver cannot create a shader object.
  UnableToCreate(StageType),
}

impl StageError {
  /// A shader stage failed to compile.
  #[track_caller]
  pub fn compilation_failed(ty: StageType, reason: impl Into<String>) -> Self {
    StageError {
      kind: StageErrorKind::CompilationFailed(ty, reason.into()),
      location: Location::caller(),
    }
  }
}

impl fmt::Display for StageErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      StageErrorKind::CompilationFailed(ref ty, ref log) => {
        write!(f, "{} compilation error: {}", ty, log)
      }

      StageErrorKind::UnableToCreate(ref ty) => {
        write!(f, "unable to create a shader object for a {}", ty)
      }
    }
  }
}

impl fmt::Display for StageError {
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

impl error::Error for StageError {}

/// A shader stage: a compiled unit of GLSL source code.
///
/// The native shader object is deleted when the stage is dropped.
#[derive(Debug)]
pub struct Stage {
  handle: GLuint,
  ty: StageType,
}

impl Drop for Stage {
  fn drop(&mut self) {
    unsafe {
      gl::DeleteShader(self.handle);
    }
  }
}

impl Stage {
  /// Create and compile a shader stage from GLSL source.
  ///
  /// The source is passed to the driver verbatim; it must carry its own
  /// `#version` pragma.
  #[track_caller]
  pub fn new(_ctx: &mut Gl33, ty: StageType, src: &str) -> Result<Self, StageError> {
    let location = Location::caller();

    unsafe {
      let handle = gl::CreateShader(opengl_shader_type(ty));

      if handle == 0 {
        return Err(StageError {
          kind: StageErrorKind::UnableToCreate(ty),
          location,
        });
      }

      let c_src = CString::new(src.as_bytes()).map_err(|_| StageError {
        kind: StageErrorKind::CompilationFailed(ty, "nul byte in shader source".to_owned()),
        location,
      })?;
      gl::ShaderSource(handle, 1, [c_src.as_ptr()].as_ptr(), null());
      gl::CompileShader(handle);

      let mut compiled: GLint = gl::FALSE.into();
      gl::GetShaderiv(handle, gl::COMPILE_STATUS, &mut compiled);

      if compiled == gl::TRUE.into() {
        debug!("compiled {} (handle {})", ty, handle);
        Ok(Stage { handle, ty })
      } else {
        let mut log_len: GLint = 0;
        gl::GetShaderiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);

        let mut log: Vec<u8> = Vec::with_capacity(log_len as usize);
        gl::GetShaderInfoLog(handle, log_len, null_mut(), log.as_mut_ptr() as *mut GLchar);

        gl::DeleteShader(handle);

        log.set_len(log_len as usize);

        Err(StageError {
          kind: StageErrorKind::CompilationFailed(ty, info_log_to_string(log)),
          location,
        })
      }
    }
  }

  /// Type of the stage.
  pub fn ty(&self) -> StageType {
    self.ty
  }
}

/// Error a shader program might emit.
///
/// Besides the failure itself, the error carries the source location of the
/// wrapper call that failed, and renders it as a `[file:line]` suffix.
#[derive(Debug)]
pub struct ProgramError {
  /// What failed.
  pub kind: ProgramErrorKind,
  /// Source location of the failing wrapper call.
  pub location: &'static Location<'static>,
}

/// Kinds of shader program failures.
#[derive(Debug)]
pub enum ProgramErrorKind {
  /// Occurs when the driver cannot create a program object.
  CreationFailed(String),
  /// Program link failed. Carries the driver’s info log.
  LinkFailed(String),
  /// A vertex attribute was looked up by a name the linked program doesn’t
  /// expose (inactive or misspelled input).
  InactiveAttrib {
    /// Name of the looked-up attribute.
    name: String,
  },
}

impl ProgramError {
  /// A program failed to link.
  #[track_caller]
  pub fn link_failed(reason: impl Into<String>) -> Self {
    ProgramError {
      kind: ProgramErrorKind::LinkFailed(reason.into()),
      location: Location::caller(),
    }
  }

  /// An inactive attribute was looked up.
  #[track_caller]
  pub fn inactive_attrib(name: impl Into<String>) -> Self {
    ProgramError {
      kind: ProgramErrorKind::InactiveAttrib { name: name.into() },
      location: Location::caller(),
    }
  }
}

impl fmt::Display for ProgramErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    match *self {
      ProgramErrorKind::CreationFailed(ref reason) => {
        write!(f, "unable to create a program object: {}", reason)
      }

      ProgramErrorKind::LinkFailed(ref log) => write!(f, "program link error: {}", log),

      ProgramErrorKind::InactiveAttrib { ref name } => {
        write!(f, "inactive vertex attribute: {}", name)
      }
    }
  }
}

impl fmt::Display for ProgramError {
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

impl error::Error for ProgramError {}

/// A linked shader program.
///
/// The native program object is deleted when the program is dropped.
#[derive(Debug)]
pub struct Program {
  handle: GLuint,
  state: Rc<RefCell<GLState>>,
}

impl Drop for Program {
  fn drop(&mut self) {
    unsafe {
      gl::DeleteProgram(self.handle);
    }
  }
}

impl Program {
  /// Create a program by attaching a vertex and a fragment stage and linking
  /// them.
  #[track_caller]
  pub fn new(ctx: &mut Gl33, vertex: &Stage, fragment: &Stage) -> Result<Self, ProgramError> {
    let location = Location::caller();

    let handle = unsafe { gl::CreateProgram() };

    if handle == 0 {
      return Err(ProgramError {
        kind: ProgramErrorKind::CreationFailed(
          "the driver returned a null program handle".to_owned(),
        ),
        location,
      });
    }

    // the wrapper owns the handle from here on, so a link failure still
    // deletes the native object
    let program = Program {
      handle,
      state: ctx.state.clone(),
    };

    unsafe {
      gl::AttachShader(handle, vertex.handle);
      gl::AttachShader(handle, fragment.handle);
    }

    program.link(location)?;
    debug!("linked program (handle {})", handle);

    Ok(program)
  }

  fn link(&self, location: &'static Location<'static>) -> Result<(), ProgramError> {
    let handle = self.handle;

    unsafe {
      gl::LinkProgram(handle);

      let mut linked: GLint = gl::FALSE.into();
      gl::GetProgramiv(handle, gl::LINK_STATUS, &mut linked);

      if linked == gl::TRUE.into() {
        Ok(())
      } else {
        let mut log_len: GLint = 0;
        gl::GetProgramiv(handle, gl::INFO_LOG_LENGTH, &mut log_len);

        let mut log: Vec<u8> = Vec::with_capacity(log_len as usize);
        gl::GetProgramInfoLog(handle, log_len, null_mut(), log.as_mut_ptr() as *mut GLchar);

        log.set_len(log_len as usize);

        Err(ProgramError {
          kind: ProgramErrorKind::LinkFailed(info_log_to_string(log)),
          location,
        })
      }
    }
  }

  /// Make this program the active one.
  pub fn activate(&self) {
    unsafe {
      self.state.borrow_mut().use_program(self.handle);
    }
  }

  /// Resolve a named vertex input of the linked program.
  #[track_caller]
  pub fn attribute(&self, name: &str) -> Result<VertexAttrib, ProgramError> {
    let location = Location::caller();
    let inactive = |name: &str| ProgramError {
      kind: ProgramErrorKind::InactiveAttrib {
        name: name.to_owned(),
      },
      location,
    };

    let c_name = CString::new(name.as_bytes()).map_err(|_| inactive(name))?;
    let index = unsafe { gl::GetAttribLocation(self.handle, c_name.as_ptr() as *const GLchar) };

    if index < 0 {
      Err(inactive(name))
    } else {
      Ok(VertexAttrib::new(index as GLuint))
    }
  }
}

fn opengl_shader_type(t: StageType) -> GLenum {
  match t {
    StageType::VertexShader => gl::VERTEX_SHADER,
    StageType::FragmentShader => gl::FRAGMENT_SHADER,
  }
}

// driver info logs are NUL-terminated and INFO_LOG_LENGTH counts the
// terminator; strip it so rendered messages don’t embed a NUL
fn info_log_to_string(mut log: Vec<u8>) -> String {
  if log.last() == Some(&0) {
    log.pop();
  }

  String::from_utf8_lossy(&log).into_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn compile_errors_name_their_stage() {
    let e = StageError::compilation_failed(StageType::VertexShader, "0:1: syntax error");
    let msg = e.to_string();
    assert!(msg.starts_with("vertex shader compilation error: 0:1: syntax error"));

    let e = StageError::compilation_failed(StageType::FragmentShader, "bad");
    assert!(e.to_string().starts_with("fragment shader"));
    assert!(!e.to_string().contains("link"));
  }

  #[test]
  fn errors_carry_the_failing_call_site() {
    let e = StageError::compilation_failed(StageType::VertexShader, "bad");
    assert_eq!(e.location.file(), file!());
    assert!(e.to_string().ends_with(&format!(
      "[{}:{}]",
      e.location.file(),
      e.location.line()
    )));

    let e = ProgramError::link_failed("unresolved symbol");
    assert_eq!(e.location.file(), file!());
    assert!(e
      .to_string()
      .ends_with(&format!("[{}:{}]", e.location.file(), e.location.line())));
  }

  #[test]
  fn link_errors_are_not_stage_errors() {
    let e = ProgramError::link_failed("unresolved symbol");
    assert!(e
      .to_string()
      .starts_with("program link error: unresolved symbol"));
  }

  #[test]
  fn inactive_attrib_reports_the_name() {
    let e = ProgramError::inactive_attrib("Position");
    assert!(e.to_string().starts_with("inactive vertex attribute: Position"));
  }

  #[test]
  fn info_logs_drop_the_nul_terminator() {
    assert_eq!(info_log_to_string(b"0:1: error\0".to_vec()), "0:1: error");

    // a driver that doesn’t count the terminator loses nothing
    assert_eq!(info_log_to_string(b"0:1: error".to_vec()), "0:1: error");
    assert_eq!(info_log_to_string(Vec::new()), "");
  }
}
