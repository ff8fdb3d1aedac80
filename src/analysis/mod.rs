//! Structural analyses over spindle graphs.

pub mod loops;

pub use self::loops::{InductionVariable, Loop, LoopsData};
