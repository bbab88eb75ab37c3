// src/config/mod.rs

//! Configuration loading and validation for forget-me.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve readers and validate lanes into a [`SystemConfig`] (`validate.rs`).
//!
//! A [`SystemConfig`] is built once at startup and passed to the engine
//! behind an `Arc`; nothing reads configuration through global state.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{config_path_in, load_and_validate, load_from_path, CONFIG_FILE_NAME};
pub use model::{
    ConfigSection, RawConfigFile, SourceConfig, SourceEntry, SystemConfig, DEFAULT_LANE_TIMEOUT,
    MAX_LANES,
};
