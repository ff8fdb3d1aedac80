//! Utilities and helper functions for integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use spindle::annotations::StaticAnnotationProvider;
use spindle::{CompilationContext, SpindleConf};

/// Initializes logging for a test run (ignores repeat initialization).
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Builds a context around a static annotation table.
pub fn context(provider: StaticAnnotationProvider, reverse_loops: bool) -> CompilationContext {
    let mut conf = SpindleConf::new();
    if reverse_loops {
        conf.set("spindle.loops.reverse", "true");
    }
    CompilationContext::with_provider(&conf, Arc::new(provider))
        .expect("context construction failed")
}
