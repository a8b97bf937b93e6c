use std::sync::Arc;

use indexmap::IndexMap;
use knit_core::{BoxError, HookContext, Hooks, Phase, Plugin, PluginRegistry};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Registry with every built-in plugin.
pub fn plugins() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry
        .register("manifest", |options| {
            Ok(Arc::new(ManifestPlugin::from_options(options)?) as Arc<dyn Plugin>)
        })
        .register("build-log", |_| Ok(Arc::new(BuildLogPlugin) as Arc<dyn Plugin>));
    registry
}

/// Writes `<output>/manifest.json` (key → content hash) once the artifact
/// is on disk.
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    file_name: String,
}

#[derive(Serialize)]
struct Manifest<'a> {
    entry: Option<&'a str>,
    artifact: &'a str,
    modules: IndexMap<&'a str, &'a str>,
}

impl ManifestPlugin {
    pub const DEFAULT_FILE_NAME: &'static str = "manifest.json";

    pub fn from_options(options: &Value) -> Result<Self, BoxError> {
        let file_name = match options.get("fileName") {
            None => Self::DEFAULT_FILE_NAME.to_string(),
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            Some(other) => {
                return Err(format!("fileName must be a non-empty string, got {}", other).into())
            }
        };
        Ok(Self { file_name })
    }

    async fn write(file_name: String, cx: Arc<HookContext>) -> Result<(), BoxError> {
        let Some(graph) = cx.graph.as_ref() else {
            return Ok(());
        };

        let manifest = Manifest {
            entry: graph.entry(),
            artifact: &cx.config.output_file_name,
            modules: graph.assets(),
        };
        let path = cx.config.output_path.join(&file_name);
        let json = serde_json::to_string_pretty(&manifest)?;
        tokio::fs::write(&path, json + "\n").await?;

        info!(path = %path.display(), modules = graph.len(), "wrote manifest");
        Ok(())
    }
}

impl Plugin for ManifestPlugin {
    fn name(&self) -> &str {
        "manifest"
    }

    fn apply(&self, hooks: &mut Hooks) {
        let file_name = self.file_name.clone();
        hooks
            .after_run
            .tap(self.name(), move |cx| Self::write(file_name.clone(), cx));
    }
}

/// Logs every lifecycle phase.
#[derive(Debug, Clone, Copy)]
pub struct BuildLogPlugin;

impl Plugin for BuildLogPlugin {
    fn name(&self) -> &str {
        "build-log"
    }

    fn apply(&self, hooks: &mut Hooks) {
        for phase in Phase::ALL {
            hooks.get_mut(phase).tap(self.name(), |cx| async move {
                match cx.phase {
                    Phase::Failed => info!(
                        phase = %cx.phase,
                        error = cx.error.as_deref().unwrap_or("unknown"),
                        "build phase"
                    ),
                    _ => info!(
                        phase = %cx.phase,
                        modules = cx.graph.as_ref().map(|g| g.len()),
                        bytes = cx.artifact.as_ref().map(|a| a.len()),
                        "build phase"
                    ),
                }
                Ok::<(), BoxError>(())
            });
        }
    }
}
