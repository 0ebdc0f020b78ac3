//! Common types for the adapter

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arbitrary metadata attached to a listed entry
pub type Metadata = Map<String, Value>;

/// Metadata keys promoted to typed fields and removed from `extra_metadata`
const PROMOTED_KEYS: [&str; 4] = ["mimetype", "size", "contentLength", "lastModified"];

/// Object visibility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Attributes of a file
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FileAttributes {
    /// Object key
    pub path: String,
    /// Size in bytes
    pub file_size: Option<u64>,
    /// Unix timestamp (seconds)
    pub last_modified: Option<i64>,
    /// Content type
    pub mime_type: Option<String>,
    pub visibility: Option<Visibility>,
    /// Remaining remote metadata
    pub extra_metadata: Metadata,
}

impl FileAttributes {
    /// Attributes carrying only a path
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Attributes of a synthetic directory
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryAttributes {
    /// Prefix, without trailing slash
    pub path: String,
    pub last_modified: Option<i64>,
    pub extra_metadata: Metadata,
}

/// A listing entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageAttributes {
    File(FileAttributes),
    Directory(DirectoryAttributes),
}

impl StorageAttributes {
    /// Full key of the entry
    pub fn path(&self) -> &str {
        match self {
            Self::File(file) => &file.path,
            Self::Directory(dir) => &dir.path,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    pub fn last_modified(&self) -> Option<i64> {
        match self {
            Self::File(file) => file.last_modified,
            Self::Directory(dir) => dir.last_modified,
        }
    }
}

/// Per-write options
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteOptions {
    /// Skip sniffing and send this content type
    pub content_type: Option<String>,
    /// `Cache-Control` header value
    pub cache_control: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            cache_control: "3600".to_string(),
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set content type
    pub fn with_content_type(mut self, ct: impl Into<String>) -> Self {
        self.content_type = Some(ct.into());
        self
    }

    /// Set cache control
    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = value.into();
        self
    }
}

// ==================== Wire Types ====================

/// Body of `POST /object/list/{bucket}`
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListRequest<'a> {
    pub prefix: &'a str,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct SortBy {
    pub column: &'static str,
    pub order: &'static str,
}

impl SortBy {
    pub fn name_asc() -> Self {
        Self {
            column: "name",
            order: "asc",
        }
    }
}

/// One entry of a listing response
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ListedObject {
    pub name: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl ListedObject {
    /// Entries without an object id are prefixes
    pub fn is_directory(&self) -> bool {
        self.id.is_none()
    }

    pub fn mime_type(&self) -> Option<String> {
        self.field("mimetype")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn size(&self) -> Option<u64> {
        self.field("size").and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        })
    }

    pub fn last_modified(&self) -> Option<i64> {
        self.field("lastModified")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    fn field(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref()?.get(key)
    }

    /// Convert into listing attributes rooted at `path`
    pub fn into_attributes(self, path: String) -> StorageAttributes {
        if self.is_directory() {
            return StorageAttributes::Directory(DirectoryAttributes {
                path,
                last_modified: None,
                extra_metadata: self.metadata.unwrap_or_default(),
            });
        }

        let file_size = self.size();
        let last_modified = self.last_modified();
        let mime_type = self.mime_type();
        let mut extra_metadata = self.metadata.unwrap_or_default();
        for key in PROMOTED_KEYS {
            extra_metadata.remove(key);
        }

        StorageAttributes::File(FileAttributes {
            path,
            file_size,
            last_modified,
            mime_type,
            visibility: None,
            extra_metadata,
        })
    }
}

/// Body of the batch delete
#[derive(Clone, Debug, Serialize)]
pub(crate) struct DeleteRequest<'a> {
    pub prefixes: Vec<&'a str>,
}

/// Body of move and copy
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TransferRequest<'a> {
    pub bucket_id: &'a str,
    pub source_key: &'a str,
    pub destination_key: &'a str,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(rename = "Id", default)]
    pub id: Option<Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CopyResponse {
    #[serde(rename = "Key", default)]
    pub key: Option<Value>,
}

/// Parse a remote timestamp into unix seconds.
///
/// Accepts RFC 3339 (`2023-01-01T00:00:00.000Z`) and naive ISO-8601
/// (`2023-01-01T00:00:00`, taken as UTC).
pub fn parse_timestamp(value: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("2023-01-01T00:00:00Z"), Some(1672531200));
        assert_eq!(parse_timestamp("2023-01-01T00:00:00.000Z"), Some(1672531200));
        assert_eq!(parse_timestamp("2023-01-01T01:00:00+01:00"), Some(1672531200));
        assert_eq!(parse_timestamp("2023-01-01T00:00:00"), Some(1672531200));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_listed_file_attributes() {
        let entry: ListedObject = serde_json::from_value(json!({
            "name": "file1.txt",
            "id": "1",
            "metadata": {
                "size": 100,
                "mimetype": "text/plain",
                "lastModified": "2023-01-01T00:00:00Z",
                "contentLength": 100,
                "eTag": "\"abc\"",
                "cacheControl": "max-age=3600"
            }
        }))
        .unwrap();

        let attributes = entry.into_attributes("test-dir/file1.txt".into());
        let StorageAttributes::File(file) = attributes else {
            panic!("expected a file");
        };
        assert_eq!(file.path, "test-dir/file1.txt");
        assert_eq!(file.file_size, Some(100));
        assert_eq!(file.mime_type.as_deref(), Some("text/plain"));
        assert_eq!(file.last_modified, Some(1672531200));
        assert_eq!(file.extra_metadata.len(), 2);
        assert!(file.extra_metadata.contains_key("eTag"));
        assert!(!file.extra_metadata.contains_key("contentLength"));
    }

    #[test]
    fn test_listed_directory_attributes() {
        let entry: ListedObject =
            serde_json::from_value(json!({ "name": "photos", "id": null, "metadata": null }))
                .unwrap();
        let attrs = entry.into_attributes("photos".into());
        assert!(attrs.is_dir());
        assert_eq!(attrs.path(), "photos");
    }

    #[test]
    fn test_list_request_omits_unset_fields() {
        let body = serde_json::to_value(ListRequest {
            prefix: "test-dir",
            limit: 1,
            offset: None,
            sort_by: None,
            search: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "prefix": "test-dir", "limit": 1 }));

        let body = serde_json::to_value(ListRequest {
            prefix: "",
            limit: 100,
            offset: Some(200),
            sort_by: Some(SortBy::name_asc()),
            search: Some("a.txt"),
        })
        .unwrap();
        assert_eq!(body["sortBy"], json!({ "column": "name", "order": "asc" }));
        assert_eq!(body["offset"], json!(200));
        assert_eq!(body["search"], json!("a.txt"));
    }
}
