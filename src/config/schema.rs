//! Configuration data structures for the wirelist engine.
//!
//! Defines the YAML config format: traversal limits, batch progress cadence
//! and distribution-box codes. Every field has a default so partial files
//! are valid.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WireGraphError};
use crate::graph::orientation::{BoxCodes, DEFAULT_BOX_CODES};
use crate::graph::traversal::DEFAULT_MAX_DEPTH;
use crate::types::SOLDER_PIN;

/// Largest hop limit accepted by [`EngineConfig::validate`].
pub const MAX_ALLOWED_DEPTH: u32 = 64;

/// Progress cadence used when none is configured.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
///
/// Loaded from YAML files and environment variables; see
/// [`crate::config::loader`] for source priority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub traversal: TraversalConfig,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub orientation: OrientationConfig,
}

impl EngineConfig {
    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.traversal.max_depth == 0 || self.traversal.max_depth > MAX_ALLOWED_DEPTH {
            return Err(WireGraphError::Config(format!(
                "traversal.max_depth must be between 1 and {MAX_ALLOWED_DEPTH}, got {}",
                self.traversal.max_depth
            )));
        }
        if self.traversal.solder_pin.trim().is_empty() {
            return Err(WireGraphError::Config(
                "traversal.solder_pin must not be blank".into(),
            ));
        }
        if self.batch.progress_interval == 0 {
            return Err(WireGraphError::Config(
                "batch.progress_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn box_codes(&self) -> BoxCodes {
        BoxCodes::new(&self.orientation.box_codes)
    }
}

// ---------------------------------------------------------------------------
// TraversalConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Hop limit through solder joints and splices.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Pin value that marks a solder joint.
    #[serde(default = "default_solder_pin")]
    pub solder_pin: String,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            solder_pin: default_solder_pin(),
        }
    }
}

// ---------------------------------------------------------------------------
// BatchConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Emit a progress notification every this many processed requests.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            progress_interval: default_progress_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// OrientationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrientationConfig {
    /// Distribution-box code fragments.
    #[serde(default = "default_box_codes")]
    pub box_codes: Vec<String>,
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            box_codes: default_box_codes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

fn default_solder_pin() -> String {
    SOLDER_PIN.to_string()
}

fn default_progress_interval() -> usize {
    DEFAULT_PROGRESS_INTERVAL
}

fn default_box_codes() -> Vec<String> {
    DEFAULT_BOX_CODES.iter().map(|c| c.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
