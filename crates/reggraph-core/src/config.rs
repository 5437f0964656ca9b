use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{RegGraphError, Result};

pub const MIN_MAX_DEPTH: usize = 1;
pub const MAX_MAX_DEPTH: usize = 20;

/// Tunables for a propagation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropagationOptions {
    /// In [1, 20].
    pub max_depth: usize,
    /// In [0, 1]; branches whose accumulated impact falls below are dropped.
    pub impact_threshold: f64,
    pub include_indirect: bool,
}

impl Default for PropagationOptions {
    fn default() -> Self {
        Self {
            max_depth: 10,
            impact_threshold: 0.01,
            include_indirect: true,
        }
    }
}

impl PropagationOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_impact_threshold(mut self, threshold: f64) -> Self {
        self.impact_threshold = threshold;
        self
    }

    pub fn with_include_indirect(mut self, include: bool) -> Self {
        self.include_indirect = include;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_MAX_DEPTH..=MAX_MAX_DEPTH).contains(&self.max_depth) {
            return Err(RegGraphError::Invalid(format!(
                "max_depth {} outside [{MIN_MAX_DEPTH}, {MAX_MAX_DEPTH}]",
                self.max_depth
            )));
        }
        if !(0.0..=1.0).contains(&self.impact_threshold) {
            return Err(RegGraphError::Invalid(format!(
                "impact_threshold {} outside [0, 1]",
                self.impact_threshold
            )));
        }
        Ok(())
    }
}

/// Cache timing knobs.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Applied when `set` is called without an explicit TTL.
    pub default_ttl: Duration,
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
    /// TTL for cached dependency graphs.
    pub graph_ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            graph_ttl: Duration::from_secs(60 * 60),
        }
    }
}
