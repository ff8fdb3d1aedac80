//! Error types returned by spindle.
//!
//! Failures come in three flavors with very different blast radii: a
//! `Bailout` aborts parallelization of a single procedure (which then runs
//! in its unmodified sequential form), an `UnsupportedOperation` is fatal
//! for the current compilation unit, and a `Configuration` error is fatal
//! at startup, before any compilation proceeds.

use std::error;
use std::fmt;

/// Internal macro for creating a compile error.
macro_rules! compile_err {
    ( $($arg:tt)* ) => ({
        ::std::result::Result::Err($crate::error::CompileError::new(
                $crate::error::ErrorKind::Internal, format!($($arg)*)))
    })
}

/// Creates a recoverable, procedure-scoped parallelization failure.
macro_rules! bailout_err {
    ( $($arg:tt)* ) => ({
        ::std::result::Result::Err($crate::error::CompileError::new(
                $crate::error::ErrorKind::Bailout, format!($($arg)*)))
    })
}

/// Creates a fatal error for an operation with no backend lowering.
macro_rules! unsupported_err {
    ( $($arg:tt)* ) => ({
        ::std::result::Result::Err($crate::error::CompileError::new(
                $crate::error::ErrorKind::UnsupportedOperation, format!($($arg)*)))
    })
}

/// Creates a fatal startup configuration error.
macro_rules! config_err {
    ( $($arg:tt)* ) => ({
        ::std::result::Result::Err($crate::error::CompileError::new(
                $crate::error::ErrorKind::Configuration, format!($($arg)*)))
    })
}

/// Classifies how far an error propagates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Recoverable: the procedure falls back to sequential compilation.
    Bailout,
    /// Fatal for the compilation unit: a live intrinsic has no backend builtin.
    UnsupportedOperation,
    /// Fatal at startup: the configuration names an unknown collaborator.
    Configuration,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let text = match *self {
            ErrorKind::Bailout => "bailout",
            ErrorKind::UnsupportedOperation => "unsupported operation",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Internal => "internal",
        };
        f.write_str(text)
    }
}

/// A compilation error produced by spindle.
#[derive(Debug, Clone)]
pub struct CompileError {
    kind: ErrorKind,
    message: String,
}

impl CompileError {
    pub fn new<T: Into<String>>(kind: ErrorKind, message: T) -> CompileError {
        CompileError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Whether the caller may recover by recompiling the procedure
    /// sequentially.
    pub fn is_bailout(&self) -> bool {
        self.kind == ErrorKind::Bailout
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl error::Error for CompileError {
    fn description(&self) -> &str {
        &self.message
    }
}

/// Result type returned by spindle.
pub type SpindleResult<T> = Result<T, CompileError>;
