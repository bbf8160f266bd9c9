//! Configuration for the sprite splitter
//!
//! Provides types and parsing for the optional `spritesplit.toml`.

pub mod loader;
pub mod schema;

pub use loader::{
    find_config, find_config_from, load_config, merge_cli_overrides, CliOverrides, ConfigError,
    CONFIG_FILENAME,
};
pub use schema::*;
