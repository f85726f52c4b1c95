// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::OptimizationLevel;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings shared by the planner and the solver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub optimization_level: OptimizationLevel,
    /// Skip choice points that cannot change the outcome of a failed edge
    pub backjump: bool,
    /// Seed the right operand of a JOIN with the left rows when it starts
    /// with a clause consuming contextual bindings
    pub join_mappings: bool,
    /// Run the checker before evaluation
    pub check: bool,
    /// Cooperative deadline, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimization_level: OptimizationLevel::Basic,
            backjump: true,
            join_mappings: true,
            check: false,
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}
