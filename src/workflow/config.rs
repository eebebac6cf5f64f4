// SPDX-License-Identifier: MIT

//! Engine configuration

use crate::error::{HitlError, Result};

/// Environment variable setting [`EngineConfig::recursion_limit`]
pub const RECURSION_LIMIT_VAR: &str = "HITL_RECURSION_LIMIT";

/// Runtime knobs for [`Engine`](crate::workflow::graph::Engine)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum node executions within a single run call.
    ///
    /// Unset by default: a validated graph always reaches the terminal
    /// marker, so a run is bounded by the graph length.
    pub recursion_limit: Option<usize>,
}

impl EngineConfig {
    /// Read overrides from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(RECURSION_LIMIT_VAR) {
            let limit: usize = raw.trim().parse().map_err(|_| {
                HitlError::config(format!(
                    "{} must be a positive integer, got '{}'",
                    RECURSION_LIMIT_VAR, raw
                ))
            })?;
            if limit == 0 {
                return Err(HitlError::config(format!(
                    "{} must be greater than zero",
                    RECURSION_LIMIT_VAR
                )));
            }
            config.recursion_limit = Some(limit);
        }

        Ok(config)
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }
}
