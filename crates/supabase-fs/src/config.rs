//! Adapter configuration

use crate::{Result, StorageError, UrlOptions};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

/// Default lifetime of signed URLs (seconds)
pub const DEFAULT_SIGNED_URL_EXPIRES: u64 = 3600;

/// Default request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw disk configuration, as found in an application config file.
///
/// Every field is optional here; [`Settings::from_config`] validates it.
/// Keys are camelCase; snake_case and lowercased spellings are accepted too.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdapterConfig {
    /// Project endpoint, e.g. `https://xyz.supabase.co`
    pub endpoint: Option<String>,
    /// Bucket name
    pub bucket: Option<String>,
    /// API key, sent as bearer token and `apiKey` header
    pub key: Option<String>,
    /// Whether the bucket serves public URLs (bool or string)
    pub public: Option<PublicFlag>,
    /// Base for generated URLs, defaults to the storage endpoint
    pub url: Option<String>,
    /// `public` or `signed`
    #[serde(alias = "default_url_generation", alias = "defaulturlgeneration")]
    pub default_url_generation: Option<String>,
    /// Options applied by [`crate::SupabaseAdapter::url`]
    #[serde(alias = "default_url_generation_options", alias = "defaulturlgenerationoptions")]
    pub default_url_generation_options: UrlOptions,
    /// Signed URL lifetime in seconds
    #[serde(alias = "signed_url_expires", alias = "signedurlexpires")]
    pub signed_url_expires: Option<u64>,
    /// Request timeout in seconds
    pub timeout: Option<u64>,
    /// User agent string
    #[serde(alias = "user_agent", alias = "useragent")]
    pub user_agent: Option<String>,
    /// What to do when a listing page fails
    #[serde(alias = "listing_error_policy", alias = "listingerrorpolicy")]
    pub listing_error_policy: ListingErrorPolicy,
}

impl AdapterConfig {
    /// Create a config with the three required settings
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            bucket: Some(bucket.into()),
            key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Set the base for generated URLs
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Mark the bucket public or private
    pub fn with_public(mut self, public: bool) -> Self {
        self.public = Some(PublicFlag::Bool(public));
        self
    }

    /// Pick the strategy used by `url()`
    pub fn with_url_generation(mut self, mode: UrlGeneration) -> Self {
        self.default_url_generation = Some(mode.to_string());
        self
    }

    /// Options used by `url()`
    pub fn with_url_options(mut self, options: UrlOptions) -> Self {
        self.default_url_generation_options = options;
        self
    }

    /// Set signed URL lifetime
    pub fn with_signed_url_expires(mut self, seconds: u64) -> Self {
        self.signed_url_expires = Some(seconds);
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout.as_secs());
        self
    }

    /// Set the listing error policy
    pub fn with_listing_error_policy(mut self, policy: ListingErrorPolicy) -> Self {
        self.listing_error_policy = policy;
        self
    }
}

/// `public` accepts a boolean or a string such as `"public"` / `"private"`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublicFlag {
    Bool(bool),
    Text(String),
}

impl PublicFlag {
    fn resolve(&self) -> Result<bool> {
        match self {
            Self::Bool(value) => Ok(*value),
            Self::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "public" | "true" | "1" | "yes" => Ok(true),
                "private" | "false" | "0" | "no" | "" => Ok(false),
                other => Err(StorageError::Config(format!(
                    "Invalid value for \"public\": {}",
                    other
                ))),
            },
        }
    }
}

/// Strategy used by [`crate::SupabaseAdapter::url`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlGeneration {
    Public,
    Signed,
}

impl FromStr for UrlGeneration {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Self::Public),
            "signed" => Ok(Self::Signed),
            other => Err(StorageError::Config(format!(
                "Invalid value for \"defaultUrlGeneration\": {}",
                other
            ))),
        }
    }
}

impl fmt::Display for UrlGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Signed => f.write_str("signed"),
        }
    }
}

/// Behavior when a listing page comes back unsuccessful
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingErrorPolicy {
    /// Stop listing the failing prefix and carry on silently
    #[default]
    Truncate,
    /// Yield a `ListFailed` error and end the listing
    Fail,
}

/// Validated, immutable adapter settings
#[derive(Clone, Debug)]
pub struct Settings {
    /// `{endpoint}/storage/v1`
    pub storage_url: String,
    pub bucket: String,
    pub key: String,
    pub public: bool,
    /// Base for generated URLs
    pub url_base: String,
    pub url_generation: UrlGeneration,
    pub url_options: UrlOptions,
    pub signed_url_expires: u64,
    pub timeout: Duration,
    pub user_agent: String,
    pub listing_error_policy: ListingErrorPolicy,
}

impl Settings {
    /// Validate a raw config, failing on the first missing requirement
    pub fn from_config(config: AdapterConfig) -> Result<Self> {
        let endpoint = required(config.endpoint, "endpoint")?;
        let bucket = required(config.bucket, "bucket")?;
        let key = required(config.key, "key")?;

        let storage_url = format!("{}/storage/v1", endpoint.trim_end_matches('/'));
        let public = match &config.public {
            Some(flag) => flag.resolve()?,
            None => true,
        };
        let url_generation = match config.default_url_generation.as_deref() {
            Some(mode) => mode.parse()?,
            None if public => UrlGeneration::Public,
            None => UrlGeneration::Signed,
        };

        Ok(Self {
            url_base: config.url.unwrap_or_else(|| storage_url.clone()),
            storage_url,
            bucket,
            key,
            public,
            url_generation,
            url_options: config.default_url_generation_options,
            signed_url_expires: config
                .signed_url_expires
                .unwrap_or(DEFAULT_SIGNED_URL_EXPIRES),
            timeout: Duration::from_secs(config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            user_agent: config
                .user_agent
                .unwrap_or_else(|| format!("supabase-fs/{}", env!("CARGO_PKG_VERSION"))),
            listing_error_policy: config.listing_error_policy,
        })
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(StorageError::Config(format!(
            "Supabase {} is not specified",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_settings_fail_fast() {
        let err = Settings::from_config(AdapterConfig::default()).unwrap_err();
        assert!(err.to_string().contains("endpoint is not specified"));

        let config = AdapterConfig {
            endpoint: Some("https://example.com".to_string()),
            key: Some("k".to_string()),
            ..Default::default()
        };
        let err = Settings::from_config(config).unwrap_err();
        assert!(err.to_string().contains("bucket is not specified"));

        let config = AdapterConfig::new("https://example.com", "b", "  ");
        let err = Settings::from_config(config).unwrap_err();
        assert!(err.to_string().contains("key is not specified"));
    }

    #[test]
    fn test_defaults() {
        let settings =
            Settings::from_config(AdapterConfig::new("https://example.com/", "b", "k")).unwrap();
        assert_eq!(settings.storage_url, "https://example.com/storage/v1");
        assert_eq!(settings.url_base, settings.storage_url);
        assert!(settings.public);
        assert_eq!(settings.url_generation, UrlGeneration::Public);
        assert_eq!(settings.signed_url_expires, 3600);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.listing_error_policy, ListingErrorPolicy::Truncate);
    }

    #[test]
    fn test_private_bucket_defaults_to_signed() {
        let config = AdapterConfig::new("https://example.com", "b", "k").with_public(false);
        let settings = Settings::from_config(config).unwrap();
        assert!(!settings.public);
        assert_eq!(settings.url_generation, UrlGeneration::Signed);
    }

    #[test]
    fn test_deserialize_disk_config() {
        let json = serde_json::json!({
            "endpoint": "https://xyz.supabase.co",
            "bucket": "avatars",
            "key": "service-key",
            "public": "private",
            "url": "https://cdn.example.com",
            "defaultUrlGeneration": "signed",
            "defaultUrlGenerationOptions": { "download": true },
            "signedUrlExpires": 60,
            "listingErrorPolicy": "fail"
        });
        let config: AdapterConfig = serde_json::from_value(json).unwrap();
        let settings = Settings::from_config(config).unwrap();

        assert!(!settings.public);
        assert_eq!(settings.url_base, "https://cdn.example.com");
        assert_eq!(settings.url_generation, UrlGeneration::Signed);
        assert!(settings.url_options.download);
        assert_eq!(settings.signed_url_expires, 60);
        assert_eq!(settings.listing_error_policy, ListingErrorPolicy::Fail);
    }

    #[test]
    fn test_invalid_url_generation_rejected() {
        let config = AdapterConfig {
            default_url_generation: Some("cdn".to_string()),
            ..AdapterConfig::new("https://example.com", "b", "k")
        };
        let err = Settings::from_config(config).unwrap_err();
        assert!(err.to_string().contains("defaultUrlGeneration"));
    }

    #[test]
    fn test_public_flag_strings() {
        assert!(PublicFlag::Text("public".into()).resolve().unwrap());
        assert!(!PublicFlag::Text("false".into()).resolve().unwrap());
        assert!(PublicFlag::Text("maybe".into()).resolve().is_err());
    }

    #[test]
    fn test_snake_case_keys_accepted() {
        let json = serde_json::json!({
            "endpoint": "https://example.com",
            "bucket": "b",
            "key": "k",
            "public": "private",
            "signed_url_expires": 120,
            "default_url_generation": "signed",
            "default_url_generation_options": { "expires_in": 30 }
        });
        let config: AdapterConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.default_url_generation.as_deref(), Some("signed"));
        assert_eq!(config.default_url_generation_options.expires_in, Some(30));
    }

    #[test]
    fn test_lowercased_keys_accepted() {
        let json = serde_json::json!({
            "endpoint": "https://example.com",
            "bucket": "b",
            "key": "k",
            "signedurlexpires": 60,
            "defaulturlgeneration": "signed",
            "defaulturlgenerationoptions": { "expiresin": 30, "download": true },
            "useragent": "tests/1.0",
            "listingerrorpolicy": "fail"
        });
        let config: AdapterConfig = serde_json::from_value(json).unwrap();
        let settings = Settings::from_config(config).unwrap();

        assert_eq!(settings.signed_url_expires, 60);
        assert_eq!(settings.url_generation, UrlGeneration::Signed);
        assert_eq!(settings.url_options.expires_in, Some(30));
        assert_eq!(settings.user_agent, "tests/1.0");
        assert_eq!(settings.listing_error_policy, ListingErrorPolicy::Fail);
    }
}
