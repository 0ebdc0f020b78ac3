//! Public and signed URL builders

use crate::{config::Settings, paths::join_paths, Result, StorageError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Image transformation options, forwarded as JSON
pub type TransformOptions = Map<String, Value>;

/// Options for URL generation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlOptions {
    /// Signed URL lifetime (seconds), overrides the configured default
    #[serde(alias = "expires_in", alias = "expiresin", skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    /// Image transformation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformOptions>,
    /// Ask the server to serve the object as an attachment
    pub download: bool,
}

impl UrlOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    /// Add one transformation option
    pub fn with_transform(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.transform
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_download(mut self) -> Self {
        self.download = true;
        self
    }
}

/// Body of `POST /object/sign/{bucket}/{path}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SignRequest<'a> {
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<&'a TransformOptions>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignResponse {
    #[serde(rename = "signedURL", default)]
    pub signed_url: Option<String>,
}

impl<'a> SignRequest<'a> {
    pub fn new(settings: &Settings, options: &'a UrlOptions) -> Self {
        Self {
            expires_in: options.expires_in.unwrap_or(settings.signed_url_expires),
            transform: options.transform.as_ref(),
        }
    }
}

/// Build the public URL of an object.
///
/// `{base}/object/public/{bucket}/{path}`, or
/// `{base}/render/image/public/{bucket}/{path}?transform=...` when a
/// transformation is requested.
pub fn public_url(settings: &Settings, path: &str, options: &UrlOptions) -> Result<String> {
    if !settings.public {
        return Err(StorageError::InvalidArgument(format!(
            "Your filesystem for the {} bucket is not configured to allow public URLs",
            settings.bucket
        )));
    }

    let render_path = if options.transform.is_some() {
        "render/image"
    } else {
        "object"
    };
    let mut url = join_paths(&[
        settings.url_base.as_str(),
        render_path,
        "public",
        settings.bucket.as_str(),
        path,
    ]);

    let mut query = Vec::new();
    if let Some(transform) = &options.transform {
        query.push(format!("transform={}", serde_json::to_string(transform)?));
    }
    if options.download {
        query.push("download".to_string());
    }
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query.join("&"));
    }

    Ok(percent_decode(url))
}

/// Turn the relative `signedURL` returned by the remote into an absolute URL.
///
/// The transform JSON always starts from `{"format":"origin"}`.
pub fn signed_url(
    settings: &Settings,
    signed_path: &str,
    options: &UrlOptions,
) -> Result<String> {
    let mut transform = Map::new();
    transform.insert("format".to_string(), Value::from("origin"));
    if let Some(extra) = &options.transform {
        transform.extend(extra.clone());
    }

    let mut url = join_paths(&[settings.url_base.as_str(), signed_path]);
    url.push(if url.contains('?') { '&' } else { '?' });
    url.push_str("transform=");
    url.push_str(&serde_json::to_string(&transform)?);
    if options.download {
        url.push_str("&download");
    }

    Ok(percent_decode(url))
}

/// Generated URLs keep their query human readable
fn percent_decode(url: String) -> String {
    let decoded = urlencoding::decode(&url).ok().map(Cow::into_owned);
    decoded.unwrap_or(url)
}
