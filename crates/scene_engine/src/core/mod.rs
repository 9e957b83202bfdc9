//! # Core Engine Module
//!
//! Shared configuration for the visibility and batching passes.
//!
//! - **Config**: renderer-wide settings loaded from TOML or RON

pub mod config;

pub use config::{
    BatchConfig,
    LoggingConfig,
    RendererConfig,
    TransparentOrdering,
    VisibilityConfig,
};
pub use crate::config::{Config, ConfigError};
