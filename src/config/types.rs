use serde::Deserialize;
use std::path::PathBuf;

use crate::config::api::ApiConfig;
use crate::config::settings::SettingsConfig;
use crate::utils::constants::{DEFAULT_EXCLUDED_CLASSES, DEFAULT_INDEX_OFFSETS};

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub api: ApiConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// ================================
/// Student snapshot
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// JSON snapshot of the student directory
    pub path: PathBuf,
    /// roster offsets pulled on rebuild
    #[serde(default = "default_offsets")]
    pub offsets: Vec<u32>,
}

/// ================================
/// Lookup pipeline
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// fetch `students/{id}/classes` before the identifier lookup
    #[serde(default = "default_fetch_class_list")]
    pub fetch_class_list: bool,
    /// case-insensitive substrings of class descriptions that are not reported
    #[serde(default = "default_excluded_classes")]
    pub excluded_classes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_class_list: default_fetch_class_list(),
            excluded_classes: default_excluded_classes(),
        }
    }
}

fn default_offsets() -> Vec<u32> {
    DEFAULT_INDEX_OFFSETS.to_vec()
}

fn default_fetch_class_list() -> bool {
    true
}

fn default_excluded_classes() -> Vec<String> {
    DEFAULT_EXCLUDED_CLASSES.iter().map(|s| s.to_string()).collect()
}
