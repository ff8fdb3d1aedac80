//! Transformation passes over spindle graphs.
//!
//! A pass is a named graph-to-graph transformation. The registry maps
//! stable pass names to `Pass` objects; `apply_passes` runs a list of
//! passes in order, timing each one and logging the graph after it.

use std::collections::HashMap;
use std::fmt;

use time::PreciseTime;

use crate::context::CompilationContext;
use crate::error::*;
use crate::ir::Graph;
use crate::util::stats::CompilationStats;

pub mod fold_intrinsics;
pub mod parallelize;

pub type PassFn = fn(&mut Graph, &CompilationContext) -> SpindleResult<()>;

/// A single graph transformation.
#[derive(Clone)]
pub struct Pass {
    func: PassFn,
    pass_name: String,
}

impl Pass {
    pub fn new(func: PassFn, pass_name: &'static str) -> Pass {
        Pass {
            func,
            pass_name: pass_name.to_string(),
        }
    }

    pub fn transform(&self, graph: &mut Graph, ctx: &CompilationContext) -> SpindleResult<()> {
        (self.func)(graph, ctx)
    }

    pub fn pass_name(&self) -> String {
        self.pass_name.clone()
    }
}

impl fmt::Debug for Pass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Pass({})", self.pass_name)
    }
}

lazy_static! {
    pub static ref TRANSFORMATION_PASSES: HashMap<&'static str, Pass> = {
        let mut m = HashMap::new();
        m.insert(
            "parallelize-loops",
            Pass::new(parallelize::parallelize, "parallelize-loops"),
        );
        m.insert(
            "fold-intrinsics",
            Pass::new(fold_intrinsics::fold_intrinsics, "fold-intrinsics"),
        );
        m
    };
}

/// Apply passes from a list, in order.
pub fn apply_passes(
    graph: &mut Graph,
    passes: &[Pass],
    ctx: &CompilationContext,
    stats: &mut CompilationStats,
) -> SpindleResult<()> {
    for pass in passes {
        let start = PreciseTime::now();
        pass.transform(graph, ctx)?;
        let end = PreciseTime::now();
        stats.pass_times.push((pass.pass_name(), start.to(end)));
        debug!("After {} pass:\n{}", pass.pass_name(), graph);
    }
    Ok(())
}
