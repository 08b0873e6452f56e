// src/config/mod.rs

//! Configuration loading for covsched.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load the config file and merge environment overrides into the resolved
//!   [`Settings`] the rest of the crate consumes (`loader.rs`).
//! - Validate basic invariants like usable tool locations (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_resolve, load_from_path};
pub use model::{ConfigFile, Settings};
pub use validate::validate_settings;
