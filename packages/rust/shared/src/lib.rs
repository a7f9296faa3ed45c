//! Shared types, error model, and configuration for DocRelay.
//!
//! This crate is the foundation depended on by all other DocRelay crates.
//! It provides:
//! - [`DocRelayError`] — the unified error type
//! - Domain types ([`PackageIndex`], [`ModuleEntry`], [`OptionEntry`], [`SpecEntry`], ...)
//! - Configuration ([`AppConfig`], [`SiteConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, PackageCoords, SiteConfig, UpstreamConfig, WrapperConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocRelayError, FetchAttempt, Result};
pub use types::{
    GuideEntry, ModuleEntry, OptionEntry, PackageIndex, SpecEntry, TaskEntry, TaskMapEntry,
    TaskMapLink,
};
