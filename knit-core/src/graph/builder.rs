use std::path::Path;

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, info, trace};

use super::{ModuleGraph, ModuleRecord};
use crate::config::LoaderRule;
use crate::error::{BuildError, Result};
use crate::loader::{LoaderPipeline, TransformRegistry};
use crate::reader::read_source;
use crate::resolver::{complete_file_path, is_bare_specifier, resolve_specifier};
use crate::rewriter::SourceRewriter;
use crate::syntax::SourceFrontEnd;

/// A module to visit, with where it was asked for.
struct Request {
    key: String,
    specifier: String,
    importer: Option<String>,
}

/// Builds a [`ModuleGraph`] by walking load calls depth-first from the entry.
pub struct GraphBuilder<'a> {
    root: &'a Path,
    pipeline: LoaderPipeline<'a>,
    front_end: &'a dyn SourceFrontEnd,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        root: &'a Path,
        rules: &'a [LoaderRule],
        transforms: &'a TransformRegistry,
        front_end: &'a dyn SourceFrontEnd,
    ) -> Self {
        Self {
            root,
            pipeline: LoaderPipeline::new(rules, transforms),
            front_end,
        }
    }

    /// Build the graph reachable from `entry`, a path resolved against the
    /// project root. The entry is always a file path, never a package name.
    pub async fn make(&self, entry: &str) -> Result<ModuleGraph> {
        let key = if is_bare_specifier(entry) {
            resolve_specifier(self.root, &format!("./{}", entry), self.root)
        } else {
            resolve_specifier(self.root, entry, self.root)
        };
        let mut graph = ModuleGraph::new();
        graph.set_entry(key.clone());

        self.walk(
            &mut graph,
            Request {
                key,
                specifier: entry.to_string(),
                importer: None,
            },
        )
        .await?;

        info!(
            modules = graph.len(),
            dependencies = graph.dependency_count(),
            "module graph complete"
        );
        Ok(graph)
    }

    /// Visit one module, then its dependencies in declaration order.
    ///
    /// The walk holds the only reference to `graph`, so nothing can insert
    /// between the visited check and the insertion. Records go in before
    /// recursing, so cycles terminate and every key is processed once.
    fn walk<'s>(&'s self, graph: &'s mut ModuleGraph, request: Request) -> BoxFuture<'s, Result<()>> {
        async move {
            if graph.contains(&request.key) {
                trace!(module = %request.key, "already in graph");
                return Ok(());
            }

            let origin =
                |e: BuildError| e.with_origin(&request.specifier, request.importer.as_deref());

            let path = complete_file_path(self.root, &request.key).map_err(origin)?;
            let file = read_source(&path).await?;

            let content = self
                .pipeline
                .apply(&request.key, &path, file.content)
                .map_err(origin)?;
            let rewritten = SourceRewriter::new(self.front_end, self.root)
                .rewrite(&request.key, &content)
                .map_err(origin)?;

            debug!(
                module = %request.key,
                path = %path.display(),
                dependencies = rewritten.dependencies.len(),
                "module added"
            );

            let dependencies = rewritten.dependencies.clone();
            graph.insert(ModuleRecord {
                key: request.key.clone(),
                path,
                source: rewritten.source,
                hash: file.hash,
                dependencies: rewritten.dependencies,
            });

            for dep in dependencies {
                self.walk(
                    graph,
                    Request {
                        key: dep.key,
                        specifier: dep.specifier,
                        importer: Some(request.key.clone()),
                    },
                )
                .await?;
            }

            Ok(())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoaderEntry, UseSpec};
    use crate::syntax::JavaScriptFrontEnd;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    async fn make(root: &Path, entry: &str) -> Result<ModuleGraph> {
        let transforms = TransformRegistry::new();
        let front_end = JavaScriptFrontEnd::new();
        GraphBuilder::new(root, &[], &transforms, &front_end)
            .make(entry)
            .await
    }

    #[tokio::test]
    async fn test_depth_first_discovery_order() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        write(root, "src/index.js", "require('./a'); require('./c');");
        write(root, "src/a.js", "require('./b');");
        write(root, "src/b.js", "");
        write(root, "src/c.js", "");

        let graph = make(root, "./src/index.js").await.unwrap();
        assert_eq!(graph.entry(), Some("./src/index.js"));
        assert_eq!(
            graph.keys().collect::<Vec<_>>(),
            vec!["./src/index.js", "./src/a.js", "./src/b.js", "./src/c.js"]
        );
        assert_eq!(graph.get("./src/b.js").unwrap().path, root.join("src/b.js"));
    }

    #[tokio::test]
    async fn test_missing_dependency_names_importer() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        write(root, "src/index.js", "require('./a');");

        let err = make(root, "./src/index.js").await.unwrap_err();
        match err {
            BuildError::Resolution {
                key,
                specifier,
                importer,
            } => {
                assert_eq!(key, "./src/a.js");
                assert_eq!(specifier, "./a");
                assert_eq!(importer.as_deref(), Some("./src/index.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_entry() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let err = make(dir.path(), "./src/index.js").await.unwrap_err();
        assert!(matches!(err, BuildError::Resolution { importer: None, .. }));
    }

    #[tokio::test]
    async fn test_entry_without_extension() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        write(root, "main.js", "module.exports = 1;");

        let graph = make(root, "main").await.unwrap();
        assert_eq!(graph.entry(), Some("./main.js"));
        assert_eq!(graph.len(), 1);
    }

    #[tokio::test]
    async fn test_loader_failure_names_specifier_and_importer() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        write(root, "src/index.js", "require('./a');");
        write(root, "src/a.js", "module.exports = 1;");

        let mut transforms = TransformRegistry::new();
        transforms.register_fn("boom", |_| Err("exploded".into()));
        let rules = vec![LoaderRule::new(
            r"a\.js$",
            UseSpec::Single(LoaderEntry::Name("boom".to_string())),
        )
        .unwrap()];
        let front_end = JavaScriptFrontEnd::new();

        let err = GraphBuilder::new(root, &rules, &transforms, &front_end)
            .make("./src/index.js")
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::LoaderExecution { .. }));
        assert_eq!(err.specifier(), Some("./a"));
        let msg = err.to_string();
        assert!(msg.contains("'./src/a.js'"));
        assert!(msg.contains("'./a'"));
        assert!(msg.contains("'./src/index.js'"));
    }

    #[tokio::test]
    async fn test_syntax_error_names_specifier_and_importer() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path();
        write(root, "src/index.js", "require('./a');");
        write(root, "src/a.js", "const = ;");

        let err = make(root, "./src/index.js").await.unwrap_err();
        match &err {
            BuildError::Syntax { key, origin, .. } => {
                assert_eq!(key, "./src/a.js");
                assert_eq!(origin.specifier.as_deref(), Some("./a"));
                assert_eq!(origin.importer.as_deref(), Some("./src/index.js"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("(loaded as './a' by './src/index.js')"));
    }
}
