//! # supabase-fs
//!
//! A path-based filesystem adapter over the Supabase Storage REST API.
//!
//! The remote store is a flat key space. Directories are derived from key
//! prefixes, and an empty directory is kept alive by a zero-byte
//! `.emptyFolderPlaceholder` object that is removed again as soon as a real
//! file is written next to it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use supabase_fs::{AdapterConfig, FilesystemAdapter, SupabaseAdapter, WriteOptions};
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> supabase_fs::Result<()> {
//!     let adapter = SupabaseAdapter::new(AdapterConfig::new(
//!         "https://xyz.supabase.co",
//!         "avatars",
//!         "service-role-key",
//!     ))?;
//!
//!     adapter.write("users/42/me.txt", "hello".into(), &WriteOptions::default()).await?;
//!     let data = adapter.read("users/42/me.txt").await?;
//!
//!     let entries: Vec<_> = adapter.list_contents("users", true).try_collect().await?;
//!     println!("{} bytes, {} entries", data.len(), entries.len());
//!     Ok(())
//! }
//! ```

mod adapter;
pub mod config;
mod error;
mod listing;
pub mod mime;
pub mod paths;
mod types;
pub mod urls;

pub use adapter::SupabaseAdapter;
pub use config::{AdapterConfig, ListingErrorPolicy, PublicFlag, Settings, UrlGeneration};
pub use error::{Result, StorageError};
pub use listing::PAGE_SIZE;
pub use paths::EMPTY_FOLDER_PLACEHOLDER;
pub use types::{
    parse_timestamp, DirectoryAttributes, FileAttributes, Metadata, StorageAttributes,
    Visibility, WriteOptions,
};
pub use urls::{TransformOptions, UrlOptions};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::io::{AsyncRead, AsyncSeek};

/// Object contents as a stream of chunks
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Byte source accepted by [`FilesystemAdapter::write_stream`].
///
/// It must be seekable: the first bytes are read for content sniffing and
/// the source is rewound before upload.
pub trait SeekableReader: AsyncRead + AsyncSeek + Send + Sync + Unpin {}

impl<T: AsyncRead + AsyncSeek + Send + Sync + Unpin + ?Sized> SeekableReader for T {}

/// Path-oriented storage operations
#[async_trait]
pub trait FilesystemAdapter: Send + Sync {
    /// Whether an object exists at exactly `path`
    async fn file_exists(&self, path: &str) -> Result<bool>;

    /// Whether at least one object lives under the `path` prefix
    async fn directory_exists(&self, path: &str) -> Result<bool>;

    /// Upload `contents`, replacing any existing object
    async fn write(&self, path: &str, contents: Bytes, options: &WriteOptions) -> Result<()>;

    /// Upload from a seekable reader without buffering it
    async fn write_stream(
        &self,
        path: &str,
        contents: Box<dyn SeekableReader>,
        options: &WriteOptions,
    ) -> Result<()>;

    /// Download an object
    async fn read(&self, path: &str) -> Result<Bytes>;

    /// Download an object as a stream
    async fn read_stream(&self, path: &str) -> Result<ByteStream>;

    /// Delete an object; missing objects are ignored
    async fn delete(&self, path: &str) -> Result<()>;

    /// Delete everything under a prefix
    async fn delete_directory(&self, path: &str) -> Result<()>;

    /// Make an empty directory listable
    async fn create_directory(&self, path: &str, options: &WriteOptions) -> Result<()>;

    async fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()>;

    async fn visibility(&self, path: &str) -> Result<FileAttributes>;

    async fn mime_type(&self, path: &str) -> Result<FileAttributes>;

    async fn last_modified(&self, path: &str) -> Result<FileAttributes>;

    async fn file_size(&self, path: &str) -> Result<FileAttributes>;

    /// Lazily list entries under `path`, recursing into directories when `deep`
    fn list_contents(&self, path: &str, deep: bool) -> BoxStream<'_, Result<StorageAttributes>>;

    async fn move_file(&self, source: &str, destination: &str) -> Result<()>;

    async fn copy(&self, source: &str, destination: &str) -> Result<()>;
}
