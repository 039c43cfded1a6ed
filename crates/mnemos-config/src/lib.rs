//! Configuration system for the mnemos memory engine.
//!
//! Provides TOML-based configuration with:
//! - Engine thresholds (`[engine]`) for classification, linking and decay
//! - Query tuning (`[query]`, `[query.ranking]`) including cache TTL and boosts
//! - Embedding provider selection (`[embedding]`)
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path, ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use types::*;
