//! Compilation context threading configuration and collaborators through
//! the passes.
//!
//! The annotation-discovery implementation is named by configuration and
//! resolved exactly once, when the context is constructed; a resolution
//! failure aborts before any compilation proceeds. Afterwards the
//! provider travels inside the context as an explicit dependency rather
//! than a global. A context owns no graph state: independent procedures
//! may be compiled concurrently, each on its own thread with its own
//! graph, all sharing one context.

use std::sync::Arc;

use time::PreciseTime;

use crate::annotations::{self, AnnotationProvider};
use crate::conf::{self, ParsedConf, SpindleConf};
use crate::error::*;
use crate::ir::Graph;
use crate::transforms::{self, Pass, TRANSFORMATION_PASSES};
use crate::util::stats::CompilationStats;

#[derive(Debug)]
pub struct CompilationContext {
    conf: ParsedConf,
    provider: Arc<dyn AnnotationProvider>,
}

impl CompilationContext {
    /// Parses `conf` and resolves the annotation-discovery implementation
    /// it names.
    pub fn new(conf: &SpindleConf) -> SpindleResult<CompilationContext> {
        let parsed = conf::parse(conf)?;
        let provider = annotations::resolve_provider(&parsed.annotation_provider)?;
        Ok(CompilationContext {
            conf: parsed,
            provider,
        })
    }

    /// Builds a context around an explicitly injected provider, bypassing
    /// the registry.
    pub fn with_provider(
        conf: &SpindleConf,
        provider: Arc<dyn AnnotationProvider>,
    ) -> SpindleResult<CompilationContext> {
        Ok(CompilationContext {
            conf: conf::parse(conf)?,
            provider,
        })
    }

    pub fn conf(&self) -> &ParsedConf {
        &self.conf
    }

    pub fn annotation_provider(&self) -> &dyn AnnotationProvider {
        self.provider.as_ref()
    }

    /// Runs the standard pass list over `graph`: the parallel-loop
    /// rewrite, then intrinsic folding unless disabled. A `Bailout` from
    /// the rewrite is returned to the caller, whose contract is to fall
    /// back to sequential compilation of the procedure.
    pub fn compile_graph(
        &self,
        graph: &mut Graph,
        stats: &mut CompilationStats,
    ) -> SpindleResult<()> {
        let mut passes: Vec<Pass> = vec![TRANSFORMATION_PASSES["parallelize-loops"].clone()];
        if self.conf.apply_fold_intrinsics {
            passes.push(TRANSFORMATION_PASSES["fold-intrinsics"].clone());
        }

        let start = PreciseTime::now();
        let result = transforms::apply_passes(graph, &passes, self, stats);
        let end = PreciseTime::now();
        stats
            .phase_times
            .push(("Parallelization".to_string(), start.to(end)));
        result
    }
}
