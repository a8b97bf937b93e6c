//! Loaders and plugins available to every `knit.toml` by name.

mod loaders;
mod plugins;

pub use loaders::transforms;
pub use plugins::plugins;
