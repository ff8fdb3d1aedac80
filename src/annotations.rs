//! Parallel annotation records and their correlation onto graph values.
//!
//! An external discovery collaborator inspects procedure bytecode and
//! reports which loop-local variable slots were declared
//! parallel-across-iterations, each as a byte-offset range plus a local
//! slot index. `resolve` correlates those records with the graph's
//! frame-capture sites to produce the annotated-node map consumed by the
//! parallel-loop rewriter: for each site whose offset falls inside a
//! record's range, the value bound to the record's slot at that site is
//! marked. The first site to mark a value wins; later correlations of the
//! same value are ignored.

use std::collections::HashMap;
use std::sync::Arc;

use fnv::FnvHashMap;

use crate::error::*;
use crate::ir::{FunctionId, Graph, NodeId, NodeKind};

/// A single parallel-across-iterations declaration discovered in a
/// procedure's bytecode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParallelAnnotation {
    /// First bytecode offset the declaration covers.
    pub start: u32,
    /// Length of the covered offset range.
    pub length: u32,
    /// Local-variable slot holding the declared value.
    pub index: u32,
}

impl ParallelAnnotation {
    pub fn new(start: u32, length: u32, index: u32) -> ParallelAnnotation {
        ParallelAnnotation {
            start,
            length,
            index,
        }
    }

    /// Whether `bci` lies within `[start, start + length)`.
    pub fn contains(&self, bci: u32) -> bool {
        bci >= self.start && bci < self.start + self.length
    }
}

/// The external annotation-discovery collaborator. Implementations must be
/// deterministic and side-effect-free; records are returned in discovery
/// order.
pub trait AnnotationProvider: Send + Sync + std::fmt::Debug {
    fn parallel_annotations(&self, procedure: &str) -> Vec<ParallelAnnotation>;
}

/// A provider that discovers nothing. Compilations under it never
/// parallelize.
#[derive(Debug)]
pub struct NullAnnotationProvider;

impl AnnotationProvider for NullAnnotationProvider {
    fn parallel_annotations(&self, _procedure: &str) -> Vec<ParallelAnnotation> {
        vec![]
    }
}

/// A provider backed by an explicit per-procedure table, for embedders
/// that discover annotations ahead of time (and for tests).
#[derive(Default, Debug)]
pub struct StaticAnnotationProvider {
    table: FnvHashMap<String, Vec<ParallelAnnotation>>,
}

impl StaticAnnotationProvider {
    pub fn new() -> StaticAnnotationProvider {
        StaticAnnotationProvider {
            table: FnvHashMap::default(),
        }
    }

    pub fn insert<S: Into<String>>(&mut self, procedure: S, annotations: Vec<ParallelAnnotation>) {
        self.table.insert(procedure.into(), annotations);
    }
}

impl AnnotationProvider for StaticAnnotationProvider {
    fn parallel_annotations(&self, procedure: &str) -> Vec<ParallelAnnotation> {
        self.table.get(procedure).cloned().unwrap_or_default()
    }
}

type ProviderFactory = fn() -> Arc<dyn AnnotationProvider>;

fn null_provider() -> Arc<dyn AnnotationProvider> {
    Arc::new(NullAnnotationProvider)
}

fn static_provider() -> Arc<dyn AnnotationProvider> {
    Arc::new(StaticAnnotationProvider::new())
}

lazy_static! {
    /// Loadable annotation-discovery implementations by registry name.
    static ref ANNOTATION_PROVIDERS: HashMap<&'static str, ProviderFactory> = {
        let mut m: HashMap<&'static str, ProviderFactory> = HashMap::new();
        m.insert("none", null_provider as ProviderFactory);
        m.insert("static", static_provider as ProviderFactory);
        m
    };
}

/// Resolves the annotation-discovery implementation named by the
/// configuration. Failure here is fatal at startup: no compilation may
/// proceed without a provider binding.
pub fn resolve_provider(name: &str) -> SpindleResult<Arc<dyn AnnotationProvider>> {
    match ANNOTATION_PROVIDERS.get(name) {
        Some(factory) => Ok(factory()),
        None => config_err!("Annotation discovery implementation not found: {}", name),
    }
}

/// Builds the annotated-node map for `graph`: for the root procedure and
/// every inlined callee with at least one record, correlates each
/// frame-capture site inside a record's offset range with the value bound
/// to the record's slot. First match per value wins. Pure with respect to
/// the graph.
pub fn resolve(
    graph: &Graph,
    provider: &dyn AnnotationProvider,
) -> FnvHashMap<NodeId, ParallelAnnotation> {
    let mut method_annotations: FnvHashMap<FunctionId, Vec<ParallelAnnotation>> =
        FnvHashMap::default();

    let root = graph.root_function();
    method_annotations.insert(root, provider.parallel_annotations(graph.function_name(root)));

    for inlinee in graph.inlined_functions() {
        let records = provider.parallel_annotations(graph.function_name(inlinee));
        if !records.is_empty() {
            method_annotations.insert(inlinee, records);
        }
    }

    let mut parallel_nodes = FnvHashMap::default();
    for id in graph.node_ids() {
        let (function, bci) = match graph.node(id).kind {
            NodeKind::FrameState { function, bci, .. } => (function, bci),
            _ => continue,
        };
        if let Some(records) = method_annotations.get(&function) {
            for record in records.iter() {
                if record.contains(bci) {
                    if let Some(local) = graph.local_at(id, record.index) {
                        if !parallel_nodes.contains_key(&local) {
                            parallel_nodes.insert(local, record.clone());
                        }
                    }
                }
            }
        }
    }
    parallel_nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Graph;

    #[test]
    fn annotation_range() {
        let an = ParallelAnnotation::new(8, 16, 2);
        assert!(an.contains(8));
        assert!(an.contains(23));
        assert!(!an.contains(24));
        assert!(!an.contains(7));
    }

    #[test]
    fn resolve_unknown_provider_is_fatal() {
        assert!(resolve_provider("none").is_ok());
        assert!(resolve_provider("static").is_ok());
        let err = resolve_provider("asm").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn correlates_sites_in_range() {
        let mut graph = Graph::new("kernel");
        let entry = graph.entry();
        let value = graph.parameter(entry, 0);
        let other = graph.parameter(entry, 1);
        graph.frame_state(entry, 0, 4, &[(2, value)]);
        // Outside the record's range; must not correlate.
        graph.frame_state(entry, 0, 40, &[(2, other)]);

        let mut provider = StaticAnnotationProvider::new();
        provider.insert("kernel", vec![ParallelAnnotation::new(0, 10, 2)]);

        let map = resolve(&graph, &provider);
        assert_eq!(map.len(), 1);
        assert_eq!(map[&value], ParallelAnnotation::new(0, 10, 2));
    }

    #[test]
    fn first_correlation_wins() {
        let mut graph = Graph::new("kernel");
        let entry = graph.entry();
        let value = graph.parameter(entry, 0);
        graph.frame_state(entry, 0, 4, &[(2, value)]);
        graph.frame_state(entry, 0, 6, &[(3, value)]);

        let mut provider = StaticAnnotationProvider::new();
        provider.insert(
            "kernel",
            vec![
                ParallelAnnotation::new(0, 10, 2),
                ParallelAnnotation::new(0, 10, 3),
            ],
        );

        let map = resolve(&graph, &provider);
        // Both records correlate to `value`; the first mapping is kept.
        assert_eq!(map[&value].index, 2);
    }

    #[test]
    fn correlates_inlined_callees() {
        let mut graph = Graph::new("kernel");
        let callee = graph.add_function("helper");
        let quiet = graph.add_function("no_annotations");
        let entry = graph.entry();
        let value = graph.parameter(entry, 0);
        graph.frame_state(entry, callee, 12, &[(0, value)]);
        graph.frame_state(entry, quiet, 12, &[(0, value)]);

        let mut provider = StaticAnnotationProvider::new();
        provider.insert("helper", vec![ParallelAnnotation::new(10, 4, 0)]);

        let map = resolve(&graph, &provider);
        assert_eq!(map[&value].index, 0);
        assert_eq!(map.len(), 1);
    }
}
