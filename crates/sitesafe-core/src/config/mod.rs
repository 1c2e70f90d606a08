//! Backend configuration.
//!
//! SiteSafe talks to a single Supabase project: PostgREST for structured
//! records, Storage for uploaded files, and GoTrue for sign-in. The project
//! URL and anon key are public client values; no service-role secret belongs
//! here.

use std::env;
use std::time::Duration;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_STORAGE_BUCKET: &str = "SUPABASE_STORAGE_BUCKET";

/// Bucket that safety photos are uploaded to unless overridden.
pub const DEFAULT_STORAGE_BUCKET: &str = "safety-uploads";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Project base URL, without a trailing slash.
    pub supabase_url: String,
    /// Public anon key sent as `apikey`.
    pub anon_key: String,
    /// Storage bucket for report attachments.
    pub storage_bucket: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl BackendConfig {
    pub fn new(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Result<Self> {
        let supabase_url = normalize_base_url(supabase_url.into())?;
        let anon_key = normalize_text_option(Some(anon_key.into()))
            .ok_or_else(|| Error::InvalidInput(format!("{ENV_SUPABASE_ANON_KEY} is empty")))?;

        Ok(Self {
            supabase_url,
            anon_key,
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }

    #[must_use]
    pub fn with_storage_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.storage_bucket = bucket.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when none of the variables are set and an error when
    /// only some of the required ones are.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }

    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.supabase_url)
    }

    pub fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{function}", self.supabase_url)
    }

    pub fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.supabase_url, path.trim_start_matches('/'))
    }

    /// Upload endpoint for an object path inside the configured bucket.
    pub fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.supabase_url,
            self.storage_bucket,
            encode_object_path(path)
        )
    }

    /// Public download URL for an object path inside the configured bucket.
    pub fn public_object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.supabase_url,
            self.storage_bucket,
            encode_object_path(path)
        )
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<BackendConfig>> {
    let url = normalize_text_option(lookup(ENV_SUPABASE_URL));
    let anon_key = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY));
    let bucket = normalize_text_option(lookup(ENV_STORAGE_BUCKET));

    if url.is_none() && anon_key.is_none() && bucket.is_none() {
        return Ok(None);
    }

    let (url, anon_key) = match (url, anon_key) {
        (Some(url), Some(anon_key)) => (url, anon_key),
        (url, anon_key) => {
            let mut missing = Vec::new();
            if url.is_none() {
                missing.push(ENV_SUPABASE_URL);
            }
            if anon_key.is_none() {
                missing.push(ENV_SUPABASE_ANON_KEY);
            }
            return Err(Error::InvalidInput(format!(
                "Backend configuration is incomplete. Missing: {}",
                missing.join(", ")
            )));
        }
    };

    let mut config = BackendConfig::new(url, anon_key)?;
    if let Some(bucket) = bucket {
        config = config.with_storage_bucket(bucket);
    }
    Ok(Some(config))
}

fn normalize_base_url(raw: String) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput(format!("{ENV_SUPABASE_URL} is empty")))?;
    if !is_http_url(&value) {
        return Err(Error::InvalidInput(format!(
            "{ENV_SUPABASE_URL} must include http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<Option<BackendConfig>> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_none_returns_none() {
        assert!(parse_from_map(&HashMap::new()).unwrap().is_none());
    }

    #[test]
    fn parse_config_requires_url_and_key() {
        let mut map = HashMap::new();
        map.insert(ENV_STORAGE_BUCKET, "photos");

        match parse_from_map(&map).unwrap_err() {
            Error::InvalidInput(message) => {
                assert!(message.contains(ENV_SUPABASE_URL));
                assert!(message.contains(ENV_SUPABASE_ANON_KEY));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_normalizes_url_and_defaults_bucket() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, " https://project.supabase.co/ ");
        map.insert(ENV_SUPABASE_ANON_KEY, "anon");

        let config = parse_from_map(&map).unwrap().unwrap();
        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.storage_bucket, DEFAULT_STORAGE_BUCKET);
        assert_eq!(
            config.rest_url("form_records"),
            "https://project.supabase.co/rest/v1/form_records"
        );
    }

    #[test]
    fn parse_config_rejects_non_http_url() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, "project.supabase.co");
        map.insert(ENV_SUPABASE_ANON_KEY, "anon");
        assert!(parse_from_map(&map).is_err());
    }

    #[test]
    fn object_urls_encode_each_segment() {
        let config = BackendConfig::new("https://project.supabase.co", "anon").unwrap();
        assert_eq!(
            config.object_url("uploads/user 1/1700_a.jpg"),
            "https://project.supabase.co/storage/v1/object/safety-uploads/uploads/user%201/1700_a.jpg"
        );
        assert_eq!(
            config.public_object_url("uploads/u1/1700_a.jpg"),
            "https://project.supabase.co/storage/v1/object/public/safety-uploads/uploads/u1/1700_a.jpg"
        );
    }
}
