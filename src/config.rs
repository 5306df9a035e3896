//! Build parameters of the hierarchy.

use crate::error::{BvhError, Result};
use crate::{Real, EPSILON};

/// Maximum depth of a leaf below the root.
pub const MAX_DEPTH: usize = 32;

/// Number of uniform bins per axis of the split search.
pub const NUM_BINS: usize = 12;

/// Parameters of [`Bvh::build_with_config`].
///
/// [`Bvh::build_with_config`]: crate::bvh::Bvh::build_with_config
///
/// # Examples
/// ```
/// use mesh_bvh::BuildConfig;
///
/// let config = BuildConfig {
///     max_depth: 8,
///     ..BuildConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.bin_count, 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuildConfig {
    /// Nodes at this depth always become leaves.
    pub max_depth: usize,

    /// Number of uniform bins per axis. Must be at least two.
    pub bin_count: usize,

    /// Axes along which a node is thinner than this are not split.
    pub axis_epsilon: Real,
}

impl Default for BuildConfig {
    fn default() -> BuildConfig {
        BuildConfig {
            max_depth: MAX_DEPTH,
            bin_count: NUM_BINS,
            axis_epsilon: EPSILON,
        }
    }
}

impl BuildConfig {
    /// Checks that the configuration can produce a hierarchy.
    pub fn validate(&self) -> Result<()> {
        if self.bin_count < 2 {
            return Err(BvhError::InvalidConfig(format!(
                "bin_count must be at least 2, got {}",
                self.bin_count
            )));
        }
        if !self.axis_epsilon.is_finite() || self.axis_epsilon < 0.0 {
            return Err(BvhError::InvalidConfig(format!(
                "axis_epsilon must be finite and non-negative, got {}",
                self.axis_epsilon
            )));
        }
        Ok(())
    }
}
