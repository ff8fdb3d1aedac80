//! Spindle: a middle-end compiler core for data-parallel loop retargeting.
//!
//! Spindle consumes an SSA-form control-flow graph and rewrites loops whose
//! induction variables were declared parallel-across-iterations (by an
//! external annotation-discovery collaborator) into explicit parallel-range
//! primitives, which a downstream scheduler later maps onto device
//! work-item coordinates. Independently of the loop machinery, it models
//! binary floating-point builtins (atan2, pow, fmin, fmax, ...) as IR nodes
//! that constant-fold at construction and lower to exactly one backend
//! builtin call during code generation.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

#[macro_use]
pub mod error;

pub mod analysis;
pub mod annotations;
pub mod code_builder;
pub mod codegen;
pub mod conf;
pub mod context;
pub mod ir;
pub mod transforms;
pub mod util;

pub use crate::conf::SpindleConf;
pub use crate::context::CompilationContext;
pub use crate::error::{CompileError, ErrorKind, SpindleResult};
pub use crate::util::stats::CompilationStats;
