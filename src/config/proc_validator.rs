//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Checks credentials, paging and rate-limit knobs, snapshot settings,
//!   exclusion list, retry/logging/server invariants.

use tracing::{error, info};

use crate::config::api::ApiConfig;
use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::types::{IndexConfig, PipelineConfig, ServiceConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_api(&cfg.api, &mut errors);
    validate_index(&cfg.index, &mut errors);
    validate_pipeline(&cfg.pipeline, &mut errors);

    if errors.is_empty() {
        info!("config is valid");
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(errors)
    }
}

fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry(retry, errors);
    }

    if let Some(logging) = &settings.logging {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of {:?}",
                logging.level, LOG_LEVELS
            ));
        }
    }

    if settings.server.host.trim().is_empty() {
        errors.push("settings.server.host must not be empty".to_string());
    }
    if settings.server.port.parse::<u16>().is_err() {
        errors.push(format!(
            "settings.server.port '{}' is not a valid port",
            settings.server.port
        ));
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push("settings.retry.attempts must be >= 1".to_string());
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "settings.retry.max_delay_ms ({}) must be >= base_delay_ms ({})",
                max, base
            ));
        }
    }
}

fn validate_api(api: &ApiConfig, errors: &mut Vec<String>) {
    if api.school.trim().is_empty() {
        errors.push("api.school must not be empty".to_string());
    }
    if api.client_id.trim().is_empty() {
        errors.push("api.client_id must not be empty".to_string());
    }
    if api.client_secret.trim().is_empty() {
        errors.push("api.client_secret must not be empty".to_string());
    }
    if api.scopes.is_empty() {
        errors.push("api.scopes must list at least one scope".to_string());
    }
    if api.page_size == 0 {
        errors.push("api.page_size must be > 0".to_string());
    }
    if api.request_timeout_ms == 0 {
        errors.push("api.request_timeout_ms must be > 0".to_string());
    }

    let endpoints = api.endpoints();
    for (name, url) in [
        ("api.token_url", &endpoints.token_url),
        ("api.api_base_url", &endpoints.api_base_url),
        ("api.roster_base_url", &endpoints.roster_base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(format!("{} '{}' must be an http(s) URL", name, url));
        }
    }
}

fn validate_index(index: &IndexConfig, errors: &mut Vec<String>) {
    if index.path.as_os_str().is_empty() {
        errors.push("index.path must not be empty".to_string());
    }
    if index.offsets.is_empty() {
        errors.push("index.offsets must contain at least one offset".to_string());
    }
}

fn validate_pipeline(pipeline: &PipelineConfig, errors: &mut Vec<String>) {
    for (i, banned) in pipeline.excluded_classes.iter().enumerate() {
        if banned.trim().is_empty() {
            errors.push(format!(
                "pipeline.excluded_classes[{}] is empty and would exclude every class",
                i
            ));
        }
    }
}
