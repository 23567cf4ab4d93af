use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use crate::utils::constants::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_PAGE_SIZE, DEFAULT_RATE_LIMIT_LOW_WATER, DEFAULT_SCOPES,
    DEFAULT_TOKEN_SAFETY_MARGIN_SECS,
};

/// ================================
/// Upstream API access
/// ================================
#[derive(Deserialize, Clone)]
pub struct ApiConfig {
    pub school: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// items requested per page, also the pagination threshold
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// pause until the window resets when fewer requests than this remain
    #[serde(default = "default_low_water")]
    pub rate_limit_low_water: u64,
    /// keep the bearer token until it is close to expiry instead of minting one per fetch
    #[serde(default = "default_reuse_token")]
    pub reuse_token: bool,
    #[serde(default = "default_safety_margin")]
    pub token_safety_margin_seconds: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    pub token_url: Option<String>,
    pub api_base_url: Option<String>,
    pub roster_base_url: Option<String>,
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("school", &self.school)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("page_size", &self.page_size)
            .field("rate_limit_low_water", &self.rate_limit_low_water)
            .field("reuse_token", &self.reuse_token)
            .field("token_safety_margin_seconds", &self.token_safety_margin_seconds)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("endpoints", &self.endpoints())
            .finish()
    }
}

impl ApiConfig {
    pub fn credential(&self) -> Credential {
        Credential {
            school: self.school.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            scopes: self.scopes.iter().cloned().collect(),
        }
    }

    /// Explicit overrides win, otherwise the URLs are derived from the school slug.
    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints {
            token_url: self
                .token_url
                .clone()
                .unwrap_or_else(|| format!("https://accounts.veracross.com/{}/oauth/token", self.school)),
            api_base_url: with_trailing_slash(
                self.api_base_url
                    .clone()
                    .unwrap_or_else(|| format!("https://api.veracross.com/{}/v3/", self.school)),
            ),
            roster_base_url: with_trailing_slash(self.roster_base_url.clone().unwrap_or_else(|| {
                format!(
                    "https://oneroster.veracross.com/{}/ims/oneroster/v1p1/",
                    self.school
                )
            })),
        }
    }
}

/// Client-credentials material. Immutable once loaded.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub school: String,
    pub client_id: String,
    pub client_secret: String,
    pub scopes: BTreeSet<String>,
}

impl Credential {
    pub fn scope_string(&self) -> String {
        self.scopes.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("school", &self.school)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    pub token_url: String,
    pub api_base_url: String,
    pub roster_base_url: String,
}

fn with_trailing_slash(mut url: String) -> String {
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_low_water() -> u64 {
    DEFAULT_RATE_LIMIT_LOW_WATER
}

fn default_reuse_token() -> bool {
    true
}

fn default_safety_margin() -> u64 {
    DEFAULT_TOKEN_SAFETY_MARGIN_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(yaml: &str) -> ApiConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn endpoints_derive_from_school() {
        let cfg = api("school: springfield\nclient_id: id\nclient_secret: shh\n");
        let endpoints = cfg.endpoints();
        assert_eq!(endpoints.token_url, "https://accounts.veracross.com/springfield/oauth/token");
        assert_eq!(endpoints.api_base_url, "https://api.veracross.com/springfield/v3/");
        assert_eq!(
            endpoints.roster_base_url,
            "https://oneroster.veracross.com/springfield/ims/oneroster/v1p1/"
        );
        assert_eq!(cfg.page_size, 500);
        assert_eq!(cfg.rate_limit_low_water, 2);
        assert_eq!(cfg.scopes.len(), DEFAULT_SCOPES.len());
    }

    #[test]
    fn overrides_get_a_trailing_slash() {
        let cfg = api(
            "school: s\nclient_id: id\nclient_secret: shh\napi_base_url: http://localhost:1/v3\nroster_base_url: http://localhost:1/roster/\n",
        );
        let endpoints = cfg.endpoints();
        assert_eq!(endpoints.api_base_url, "http://localhost:1/v3/");
        assert_eq!(endpoints.roster_base_url, "http://localhost:1/roster/");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let cfg = api("school: s\nclient_id: id\nclient_secret: super-secret-value\n");
        assert!(!format!("{:?}", cfg).contains("super-secret-value"));
        assert!(!format!("{:?}", cfg.credential()).contains("super-secret-value"));
    }

    #[test]
    fn scope_string_is_space_separated() {
        let cfg = api("school: s\nclient_id: id\nclient_secret: x\nscopes: [b, a, a]\n");
        assert_eq!(cfg.credential().scope_string(), "a b");
    }
}
