//! Supabase Storage implementation of [`FilesystemAdapter`]

use crate::{
    config::{AdapterConfig, Settings, UrlGeneration},
    listing::{Lister, PAGE_SIZE},
    mime,
    paths::{self, EMPTY_FOLDER_PLACEHOLDER},
    types::*,
    urls::{self, SignRequest, SignResponse, UrlOptions},
    ByteStream, FilesystemAdapter, Result, SeekableReader, StorageError,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use reqwest::{header, Body, Client, Method, RequestBuilder, Response};
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument, warn};

/// Filesystem adapter backed by one Supabase Storage bucket
pub struct SupabaseAdapter {
    settings: Settings,
    http: Client,
}

impl SupabaseAdapter {
    /// Create an adapter, validating the configuration
    pub fn new(config: AdapterConfig) -> Result<Self> {
        let settings = Settings::from_config(config)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            settings.user_agent.parse().map_err(|_| {
                StorageError::Config(format!("Invalid user agent: {}", settings.user_agent))
            })?,
        );

        let http = Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { settings, http })
    }

    /// Create an adapter on top of a caller-provided HTTP client.
    ///
    /// Timeout and user agent settings are left to the given client.
    pub fn with_client(config: AdapterConfig, http: Client) -> Result<Self> {
        let settings = Settings::from_config(config)?;
        Ok(Self { settings, http })
    }

    /// Get the validated settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Bucket this adapter operates on
    pub fn bucket(&self) -> &str {
        &self.settings.bucket
    }

    // ==================== URL Generation ====================

    /// Public URL of an object; fails unless the bucket is public
    pub fn public_url(&self, path: &str, options: &UrlOptions) -> Result<String> {
        urls::public_url(&self.settings, path, options)
    }

    /// Ask the remote for a signed URL and make it absolute
    #[instrument(skip(self, options))]
    pub async fn signed_url(&self, path: &str, options: &UrlOptions) -> Result<String> {
        let response = self
            .request(Method::POST, &format!("/object/sign/{}/{}", self.settings.bucket, path))
            .json(&SignRequest::new(&self.settings, options))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let signed = status
            .is_success()
            .then(|| serde_json::from_str::<SignResponse>(&text).ok())
            .flatten()
            .and_then(|r| r.signed_url);

        match signed {
            Some(signed) => urls::signed_url(&self.settings, &signed, options),
            None => Err(StorageError::temporary_url(path, text)),
        }
    }

    /// Signed URL valid until `expiration`
    pub async fn temporary_url(
        &self,
        path: &str,
        expiration: DateTime<Utc>,
        options: &UrlOptions,
    ) -> Result<String> {
        let seconds = (expiration - Utc::now()).num_seconds().max(0) as u64;
        let options = options.clone().with_expires_in(seconds);
        self.signed_url(path, &options).await
    }

    /// URL built with the configured default strategy and options
    pub async fn url(&self, path: &str) -> Result<String> {
        let options = &self.settings.url_options;
        match self.settings.url_generation {
            UrlGeneration::Public => self.public_url(path, options),
            UrlGeneration::Signed => self.signed_url(path, options).await,
        }
    }

    // ==================== Helper Methods ====================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.settings.storage_url, path);
        debug!("Sending {} request to {}", method, url);

        self.http
            .request(method, url)
            .bearer_auth(&self.settings.key)
            .header("apiKey", &self.settings.key)
    }

    fn object_path(&self, path: &str) -> String {
        format!("/object/{}/{}", self.settings.bucket, path)
    }

    pub(crate) async fn list(&self, body: &ListRequest<'_>) -> Result<Response> {
        let response = self
            .request(Method::POST, &format!("/object/list/{}", self.settings.bucket))
            .json(body)
            .send()
            .await?;
        Ok(response)
    }

    async fn upload(
        &self,
        path: &str,
        body: Body,
        content_type: &str,
        options: &WriteOptions,
    ) -> Result<()> {
        let response = self
            .request(Method::POST, &self.object_path(path))
            .header("x-upsert", "true")
            .header(header::CACHE_CONTROL, options.cache_control.as_str())
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let confirmed = status.is_success()
            && serde_json::from_str::<UploadResponse>(&text)
                .ok()
                .and_then(|r| r.id)
                .is_some();
        if !confirmed {
            return Err(StorageError::write(path, text));
        }

        self.remove_placeholder(path).await;
        Ok(())
    }

    /// A real object now lives next to the placeholder, so drop it
    async fn remove_placeholder(&self, path: &str) {
        if paths::is_placeholder(path) {
            return;
        }
        let placeholder = paths::sibling_placeholder(path);
        if let Err(e) = self.delete(&placeholder).await {
            warn!(placeholder = %placeholder, "failed to remove folder placeholder: {}", e);
        }
    }

    async fn transfer(&self, endpoint: &str, source: &str, destination: &str) -> Result<Response> {
        let body = TransferRequest {
            bucket_id: &self.settings.bucket,
            source_key: source,
            destination_key: destination,
        };
        let response = self
            .request(Method::POST, endpoint)
            .json(&body)
            .send()
            .await?;
        Ok(response)
    }

    /// Look up the listing entry of a single file
    async fn fetch_file_metadata(&self, path: &str) -> Result<ListedObject> {
        let filename = paths::basename(path);
        let body = ListRequest {
            prefix: paths::parent(path).unwrap_or(""),
            limit: PAGE_SIZE,
            offset: None,
            sort_by: None,
            search: Some(filename),
        };
        let response = self.list(&body).await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(StorageError::read(path, text));
        }
        let entries: Vec<ListedObject> = serde_json::from_str(&text).unwrap_or_default();
        if entries.is_empty() {
            return Err(StorageError::read(path, text));
        }

        entries
            .into_iter()
            .find(|entry| entry.name == filename)
            .ok_or_else(|| StorageError::read(path, "File not found"))
    }
}

#[async_trait]
impl FilesystemAdapter for SupabaseAdapter {
    #[instrument(skip(self))]
    async fn file_exists(&self, path: &str) -> Result<bool> {
        let response = self
            .request(Method::HEAD, &self.object_path(path))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    #[instrument(skip(self))]
    async fn directory_exists(&self, path: &str) -> Result<bool> {
        let body = ListRequest {
            prefix: path,
            limit: 1,
            offset: None,
            sort_by: None,
            search: None,
        };
        let response = self.list(&body).await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let entries: Vec<serde_json::Value> = response.json().await.unwrap_or_default();
        Ok(!entries.is_empty())
    }

    #[instrument(skip(self, contents, options), fields(size = contents.len()))]
    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()> {
        let content_type = match &options.content_type {
            Some(ct) => ct.clone(),
            None => mime::sniff(&contents, path),
        };
        self.upload(path, Body::from(contents), &content_type, options)
            .await
    }

    #[instrument(skip(self, contents, options))]
    async fn write_stream(
        &self,
        path: &str,
        mut contents: Box<dyn SeekableReader>,
        options: &WriteOptions,
    ) -> Result<()> {
        let content_type = match &options.content_type {
            Some(ct) => ct.clone(),
            None => {
                let mut scratch = Vec::with_capacity(mime::SNIFF_LEN);
                (&mut contents)
                    .take(mime::SNIFF_LEN as u64)
                    .read_to_end(&mut scratch)
                    .await
                    .map_err(|e| StorageError::write(path, e.to_string()))?;
                let detected = mime::sniff(&scratch, path);
                drop(scratch);
                detected
            }
        };

        contents
            .seek(SeekFrom::Start(0))
            .await
            .map_err(|e| StorageError::write(path, e.to_string()))?;

        let body = Body::wrap_stream(ReaderStream::new(contents));
        self.upload(path, body, &content_type, options).await
    }

    #[instrument(skip(self))]
    async fn read(&self, path: &str) -> Result<Bytes> {
        let response = self
            .request(Method::GET, &self.object_path(path))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::read(path, text));
        }
        Ok(response.bytes().await?)
    }

    #[instrument(skip(self))]
    async fn read_stream(&self, path: &str) -> Result<ByteStream> {
        let response = self
            .request(Method::GET, &self.object_path(path))
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::read(path, text));
        }
        Ok(response.bytes_stream().map_err(StorageError::from).boxed())
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<()> {
        if !self.file_exists(path).await? {
            return Ok(());
        }

        let response = self
            .request(Method::DELETE, &format!("/object/{}", self.settings.bucket))
            .json(&DeleteRequest { prefixes: vec![path] })
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::DeleteFailed {
                path: path.to_string(),
                reason: text,
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_directory(&self, path: &str) -> Result<()> {
        if !self.directory_exists(path).await? {
            return Ok(());
        }

        let entries: Vec<StorageAttributes> = self.list_contents(path, true).try_collect().await?;
        let prefixes: Vec<&str> = entries.iter().map(StorageAttributes::path).collect();
        if prefixes.is_empty() {
            return Ok(());
        }

        debug!(count = prefixes.len(), "deleting directory contents");
        let response = self
            .request(Method::DELETE, &format!("/object/{}", self.settings.bucket))
            .json(&DeleteRequest { prefixes })
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::DeleteDirectoryFailed {
                path: path.to_string(),
                reason: text,
            });
        }
        Ok(())
    }

    #[instrument(skip(self, options))]
    async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()> {
        if self.directory_exists(path).await? {
            return Ok(());
        }

        let placeholder = paths::join_paths(&[path, EMPTY_FOLDER_PLACEHOLDER]);
        match self.write(&placeholder, Bytes::new(), options).await {
            Err(e @ StorageError::WriteFailed { .. }) => Err(StorageError::CreateDirectoryFailed {
                path: path.to_string(),
                reason: e.to_string(),
                source: Box::new(e),
            }),
            other => other,
        }
    }

    async fn set_visibility(&self, path: &str, _visibility: Visibility) -> Result<()> {
        Err(StorageError::VisibilityUnsupported {
            path: path.to_string(),
        })
    }

    async fn visibility(&self, path: &str) -> Result<FileAttributes> {
        Err(StorageError::VisibilityUnsupported {
            path: path.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn mime_type(&self, path: &str) -> Result<FileAttributes> {
        let entry = self.fetch_file_metadata(path).await?;
        // "text/plain; charset=utf-8" -> "text/plain"
        let mime_type = entry
            .mime_type()
            .map(|mt| mt.split(';').next().unwrap_or_default().trim().to_string());

        Ok(FileAttributes {
            mime_type,
            ..FileAttributes::new(path)
        })
    }

    #[instrument(skip(self))]
    async fn last_modified(&self, path: &str) -> Result<FileAttributes> {
        let entry = self.fetch_file_metadata(path).await?;
        Ok(FileAttributes {
            last_modified: entry.last_modified(),
            ..FileAttributes::new(path)
        })
    }

    #[instrument(skip(self))]
    async fn file_size(&self, path: &str) -> Result<FileAttributes> {
        let entry = self.fetch_file_metadata(path).await?;
        Ok(FileAttributes {
            file_size: entry.size(),
            ..FileAttributes::new(path)
        })
    }

    fn list_contents(&self, path: &str, deep: bool) -> BoxStream<'_, Result<StorageAttributes>> {
        Lister::new(self, path, deep).into_stream()
    }

    #[instrument(skip(self))]
    async fn move_file(&self, source: &str, destination: &str) -> Result<()> {
        let response = self.transfer("/object/move", source, destination).await?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::MoveFailed {
                from: source.to_string(),
                to: destination.to_string(),
                reason: text,
            });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        let response = self.transfer("/object/copy", source, destination).await?;
        let status = response.status();
        let text = response.text().await?;
        let confirmed = status.is_success()
            && serde_json::from_str::<CopyResponse>(&text)
                .ok()
                .and_then(|r| r.key)
                .is_some();

        if !confirmed {
            return Err(StorageError::CopyFailed {
                from: source.to_string(),
                to: destination.to_string(),
                reason: text,
            });
        }
        Ok(())
    }
}
