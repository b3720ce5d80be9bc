// src/config/mod.rs

//! Configuration loading and validation for assetdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, or fall back to the built-in one (`loader.rs`).
//! - Validate references and graph acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    BUILTIN_CONFIG, default_config_path, load_and_validate, load_builtin, load_from_path,
    load_or_builtin, parse_and_validate,
};
pub use model::{
    ConfigFile, PathsSection, PlanConfig, RawConfigFile, ServerSection, StageConfig, TaskConfig,
    TaskKind, WatchBindingConfig, WatchSection,
};
