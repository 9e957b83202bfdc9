//! # Renderer Configuration
//!
//! Settings for the per-frame visibility pass and the draw batcher. Every
//! struct has working defaults, so a config file only needs the keys it
//! changes.
//!
//! ```toml
//! [visibility]
//! collect_terrain = false
//!
//! [batching]
//! instance_cache_capacity = 1024
//! transparent_ordering = "BackToFront"
//! ```

use serde::{Serialize, Deserialize};

use crate::config::{Config, ConfigError};
use crate::foundation::collections::DEFAULT_INSTANCE_CACHE_SIZE;
use crate::scene::CollectMask;

/// How the transparent partition is ordered after grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransparentOrdering {
    /// Grouped by material, then mesh, then nearest-first, like the opaque partition
    #[default]
    Grouped,
    /// Strict farthest-first order for correct alpha blending, at the cost of batching
    BackToFront,
}

/// Visibility collection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Collect visible static meshes
    pub collect_static_meshes: bool,
    /// Collect visible instanced static meshes
    pub collect_instanced_meshes: bool,
    /// Collect visible terrain patches
    pub collect_terrain: bool,
    /// Rebuild nested zones when a zone's hierarchy is rebuilt
    pub rebuild_child_zones: bool,
    /// Rebuild region trees automatically when the scene graph is dirty
    pub auto_rebuild: bool,
}

impl VisibilityConfig {
    /// Collection mask built from the per-kind switches
    pub fn collect_mask(&self) -> CollectMask {
        let mut mask = CollectMask::empty();
        mask.set(CollectMask::STATIC_MESH, self.collect_static_meshes);
        mask.set(CollectMask::INSTANCED_MESH, self.collect_instanced_meshes);
        mask.set(CollectMask::TERRAIN_PATCH, self.collect_terrain);
        mask
    }
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            collect_static_meshes: true,
            collect_instanced_meshes: true,
            collect_terrain: true,
            rebuild_child_zones: true,
            auto_rebuild: true,
        }
    }
}

/// Draw batching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Initial capacity of the instance transform cache
    pub instance_cache_capacity: usize,
    /// Ordering used inside the transparent partition
    pub transparent_ordering: TransparentOrdering,
}

impl BatchConfig {
    /// Set the instance cache capacity
    pub fn with_instance_cache_capacity(mut self, capacity: usize) -> Self {
        self.instance_cache_capacity = capacity;
        self
    }

    /// Set the transparent ordering
    pub fn with_transparent_ordering(mut self, ordering: TransparentOrdering) -> Self {
        self.transparent_ordering = ordering;
        self
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            instance_cache_capacity: DEFAULT_INSTANCE_CACHE_SIZE,
            transparent_ordering: TransparentOrdering::default(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `env_logger` filter, overridden by `RUST_LOG`
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// # Complete Renderer Configuration
///
/// Top-level configuration applications load from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Visibility pass settings
    pub visibility: VisibilityConfig,
    /// Batching settings
    pub batching: BatchConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl RendererConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batching.instance_cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "instance_cache_capacity must be at least 1".to_string(),
            ));
        }

        if self.visibility.collect_mask().is_empty() {
            return Err(ConfigError::Invalid(
                "visibility pass collects no node kinds".to_string(),
            ));
        }

        if self.logging.log_level.trim().is_empty() {
            return Err(ConfigError::Invalid("log_level cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Config for RendererConfig {}
