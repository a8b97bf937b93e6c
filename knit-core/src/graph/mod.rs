//! The module graph produced by one build.
//!
//! Modules are stored in discovery order: a module is inserted before any of
//! its dependencies are visited, so the entry always comes first.
//!
//! # Cycles
//!
//! Circular requires are legal. The walk stops at modules it has already
//! inserted, and [`ModuleGraph::cycles`] reports the strongly connected
//! components (Kosaraju, O(V + E)) so callers can warn about them.

mod builder;

pub use builder::GraphBuilder;

use std::collections::HashMap;
use std::path::PathBuf;

use indexmap::IndexMap;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::error::{BuildError, Result};

/// One rewritten load call: the canonical key and the specifier as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dependency {
    pub key: String,
    pub specifier: String,
}

/// A fully processed module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleRecord {
    pub key: String,
    /// File the module was read from.
    pub path: PathBuf,
    /// Source after loaders and load-call rewriting.
    pub source: String,
    /// Hash of the file's raw bytes.
    pub hash: String,
    pub dependencies: Vec<Dependency>,
}

/// Key → record, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleGraph {
    entry: Option<String>,
    modules: IndexMap<String, ModuleRecord>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key of the entry module.
    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub(crate) fn set_entry(&mut self, key: impl Into<String>) {
        self.entry = Some(key.into());
    }

    /// Insert a record. Returns `false`, leaving the graph unchanged, if the
    /// key is already present.
    pub fn insert(&mut self, record: ModuleRecord) -> bool {
        if self.modules.contains_key(&record.key) {
            return false;
        }
        self.modules.insert(record.key.clone(), record);
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.modules.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ModuleRecord> {
        self.modules.get(key)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Records in discovery order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleRecord> {
        self.modules.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    /// Key → content hash, in discovery order.
    pub fn assets(&self) -> IndexMap<&str, &str> {
        self.modules
            .values()
            .map(|m| (m.key.as_str(), m.hash.as_str()))
            .collect()
    }

    /// Total number of dependency edges, duplicates included.
    pub fn dependency_count(&self) -> usize {
        self.modules.values().map(|m| m.dependencies.len()).sum()
    }

    /// Check that every dependency of every module is in the graph.
    pub fn verify(&self) -> Result<()> {
        for module in self.modules.values() {
            for dep in &module.dependencies {
                if !self.modules.contains_key(&dep.key) {
                    return Err(BuildError::UnresolvedModule {
                        key: dep.key.clone(),
                        specifier: dep.specifier.clone(),
                        importer: module.key.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Groups of modules that require each other, directly or transitively.
    ///
    /// Each cycle lists its keys in discovery order; cycles are ordered by
    /// their first key. A module that requires itself is a cycle of one.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(self.modules.len(), 0);
        let mut node_map: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.modules.len());

        for key in self.modules.keys() {
            node_map.insert(key, graph.add_node(key));
        }

        for module in self.modules.values() {
            let src = node_map[module.key.as_str()];
            for dep in &module.dependencies {
                if let Some(&dst) = node_map.get(dep.key.as_str()) {
                    graph.update_edge(src, dst, ());
                }
            }
        }

        let mut cycles: Vec<Vec<NodeIndex>> = kosaraju_scc(&graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
            .map(|mut scc| {
                scc.sort_unstable();
                scc
            })
            .collect();
        cycles.sort_unstable_by_key(|scc| scc[0]);

        cycles
            .into_iter()
            .map(|scc| scc.into_iter().map(|idx| graph[idx].to_string()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &str, deps: &[&str]) -> ModuleRecord {
        ModuleRecord {
            key: key.to_string(),
            path: PathBuf::from(key),
            source: String::new(),
            hash: format!("hash-of-{}", key),
            dependencies: deps
                .iter()
                .map(|d| Dependency {
                    key: d.to_string(),
                    specifier: d.to_string(),
                })
                .collect(),
        }
    }

    fn create_test_graph() -> ModuleGraph {
        // a -> b -> c -> a, b -> d, d -> d
        let mut graph = ModuleGraph::new();
        graph.set_entry("a");
        graph.insert(record("a", &["b"]));
        graph.insert(record("b", &["c", "d"]));
        graph.insert(record("c", &["a"]));
        graph.insert(record("d", &["d"]));
        graph.insert(record("e", &[]));
        graph
    }

    #[test]
    fn test_insert_once() {
        let mut graph = ModuleGraph::new();
        assert!(graph.insert(record("a", &[])));
        assert!(!graph.insert(record("a", &["b"])));
        assert_eq!(graph.len(), 1);
        assert!(graph.get("a").unwrap().dependencies.is_empty());
    }

    #[test]
    fn test_discovery_order_and_assets() {
        let graph = create_test_graph();
        assert_eq!(graph.entry(), Some("a"));
        assert_eq!(graph.keys().collect::<Vec<_>>(), vec!["a", "b", "c", "d", "e"]);

        let assets = graph.assets();
        assert_eq!(assets.len(), 5);
        assert_eq!(assets["c"], "hash-of-c");
        assert_eq!(graph.dependency_count(), 5);
    }

    #[test]
    fn test_cycles() {
        let graph = create_test_graph();
        let cycles = graph.cycles();
        assert_eq!(
            cycles,
            vec![
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
                vec!["d".to_string()],
            ]
        );
    }

    #[test]
    fn test_no_cycles() {
        let mut graph = ModuleGraph::new();
        graph.insert(record("a", &["b", "c"]));
        graph.insert(record("b", &["c"]));
        graph.insert(record("c", &[]));
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn test_verify() {
        assert!(create_test_graph().verify().is_ok());

        let mut graph = ModuleGraph::new();
        graph.insert(record("a", &["missing"]));
        match graph.verify().unwrap_err() {
            BuildError::UnresolvedModule { key, importer, .. } => {
                assert_eq!(key, "missing");
                assert_eq!(importer, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
