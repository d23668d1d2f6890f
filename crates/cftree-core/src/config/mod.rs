//! Configuration for building CF-trees.
//!
//! # Loading Configuration
//!
//! ```rust,ignore
//! use cftree_core::CFTreeConfig;
//!
//! // Load from file
//! let config = CFTreeConfig::from_file("cftree.toml")?;
//!
//! // Or use defaults, with environment overrides
//! let config = CFTreeConfig::default().with_env_overrides();
//!
//! let tree = config.builder()?.build(points)?;
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! branching_factor = 64
//! threshold = 0.0
//! distance = "variance_increase"
//! absorption = "diameter"
//! max_leaves = 0.05
//! ```
//!
//! Missing keys take their defaults. Invalid values are rejected by
//! [`CFTreeConfig::validate`], never silently replaced.


use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::absorption::AbsorptionKind;
use crate::builder::CFTreeBuilder;
use crate::distance::DistanceKind;
use crate::error::{ClusterError, ClusterResult};

/// Default maximum number of children per node.
pub const DEFAULT_BRANCHING_FACTOR: usize = 64;

/// Default leaf budget: 5% of the input size.
pub const DEFAULT_MAX_LEAVES: f64 = 0.05;

/// Parameters of a CF-tree and its bulk-loading builder.
///
/// # Example
///
/// ```
/// use cftree_core::{AbsorptionKind, CFTreeConfig, DistanceKind};
///
/// let config = CFTreeConfig::from_toml_str(
///     r#"
///     branching_factor = 16
///     distance = "centroid_euclidean"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.branching_factor, 16);
/// assert_eq!(config.distance, DistanceKind::CentroidEuclidean);
/// assert_eq!(config.absorption, AbsorptionKind::Diameter);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CFTreeConfig {
    /// Maximum number of children per node. Must be >= 2.
    pub branching_factor: usize,

    /// Initial absorption threshold. Rebuilds may raise it.
    /// Must be finite and >= 0.
    pub threshold: f64,

    /// Distance used for descent and node splits.
    pub distance: DistanceKind,

    /// Criterion used to decide whether a leaf absorbs a vector.
    pub absorption: AbsorptionKind,

    /// Leaf budget before the builder rebuilds the tree. Values up to 1 are
    /// relative to the number of input points, larger values absolute.
    /// Must be finite and > 0.
    pub max_leaves: f64,
}

impl Default for CFTreeConfig {
    fn default() -> Self {
        Self {
            branching_factor: DEFAULT_BRANCHING_FACTOR,
            threshold: 0.0,
            distance: DistanceKind::default(),
            absorption: AbsorptionKind::default(),
            max_leaves: DEFAULT_MAX_LEAVES,
        }
    }
}

impl CFTreeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `ClusterError::Config` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> ClusterResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClusterError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&contents).map_err(|e| {
            ClusterError::config(format!(
                "Failed to parse TOML in '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Create configuration from a TOML string.
    ///
    /// # Errors
    /// - `ClusterError::Config` if TOML parsing fails
    pub fn from_toml_str(toml: &str) -> ClusterResult<Self> {
        toml::from_str(toml)
            .map_err(|e| ClusterError::config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to a TOML string.
    ///
    /// # Errors
    /// - `ClusterError::Config` if serialization fails
    pub fn to_toml_string(&self) -> ClusterResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClusterError::config(format!("Failed to serialize to TOML: {}", e)))
    }

    /// Validate all configuration values, returning the first error found.
    ///
    /// # Errors
    /// - `ClusterError::Config` naming the offending field
    pub fn validate(&self) -> ClusterResult<()> {
        if self.branching_factor < 2 {
            return Err(ClusterError::config(format!(
                "branching_factor must be >= 2, got {}",
                self.branching_factor
            )));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ClusterError::config(format!(
                "threshold must be finite and >= 0.0, got {}",
                self.threshold
            )));
        }
        if !self.max_leaves.is_finite() || self.max_leaves <= 0.0 {
            return Err(ClusterError::config(format!(
                "max_leaves must be finite and > 0.0, got {}",
                self.max_leaves
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides. Prefix: `CFTREE_`
    ///
    /// Values that fail to parse are ignored.
    ///
    /// # Supported Variables
    ///
    /// | Variable | Field | Type |
    /// |----------|-------|------|
    /// | `CFTREE_BRANCHING_FACTOR` | `branching_factor` | usize |
    /// | `CFTREE_THRESHOLD` | `threshold` | f64 |
    /// | `CFTREE_MAX_LEAVES` | `max_leaves` | f64 |
    /// | `CFTREE_DISTANCE` | `distance` | snake_case name |
    /// | `CFTREE_ABSORPTION` | `absorption` | snake_case name |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("CFTREE_BRANCHING_FACTOR") {
            if let Ok(n) = val.parse::<usize>() {
                self.branching_factor = n;
            }
        }
        if let Ok(val) = env::var("CFTREE_THRESHOLD") {
            if let Ok(t) = val.parse::<f64>() {
                self.threshold = t;
            }
        }
        if let Ok(val) = env::var("CFTREE_MAX_LEAVES") {
            if let Ok(m) = val.parse::<f64>() {
                self.max_leaves = m;
            }
        }
        if let Ok(val) = env::var("CFTREE_DISTANCE") {
            if let Ok(kind) = val.parse::<DistanceKind>() {
                self.distance = kind;
            }
        }
        if let Ok(val) = env::var("CFTREE_ABSORPTION") {
            if let Ok(kind) = val.parse::<AbsorptionKind>() {
                self.absorption = kind;
            }
        }

        self
    }

    /// Set the branching factor.
    #[must_use]
    pub fn with_branching_factor(mut self, branching_factor: usize) -> Self {
        self.branching_factor = branching_factor;
        self
    }

    /// Set the initial absorption threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the distance strategy.
    #[must_use]
    pub fn with_distance(mut self, distance: DistanceKind) -> Self {
        self.distance = distance;
        self
    }

    /// Set the absorption criterion.
    #[must_use]
    pub fn with_absorption(mut self, absorption: AbsorptionKind) -> Self {
        self.absorption = absorption;
        self
    }

    /// Set the leaf budget.
    #[must_use]
    pub fn with_max_leaves(mut self, max_leaves: f64) -> Self {
        self.max_leaves = max_leaves;
        self
    }

    /// Validate and turn this configuration into a tree builder.
    ///
    /// # Errors
    /// - `ClusterError::Config` if [`validate`](Self::validate) fails
    pub fn builder(&self) -> ClusterResult<CFTreeBuilder> {
        CFTreeBuilder::from_config(self)
    }
}
