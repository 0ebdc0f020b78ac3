//! Paginated, depth-first prefix listing

use crate::{
    config::ListingErrorPolicy,
    paths::join_paths,
    types::{ListRequest, ListedObject, SortBy},
    Result, StorageAttributes, StorageError, SupabaseAdapter,
};
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use tracing::warn;

/// Entries requested per listing page
pub const PAGE_SIZE: usize = 100;

/// Progress through one prefix
struct Cursor {
    prefix: String,
    offset: usize,
    page: VecDeque<ListedObject>,
    done: bool,
}

impl Cursor {
    fn new(prefix: String) -> Self {
        Self {
            prefix,
            offset: 0,
            page: VecDeque::new(),
            done: false,
        }
    }
}

enum Page {
    Entries(Vec<ListedObject>),
    /// Non-success status or a body that is not an entry array
    Rejected(String),
}

/// Lazy listing over one or more prefixes.
///
/// The top of `stack` is the prefix currently being paged. A directory
/// found during a deep listing pushes a new cursor, so its contents are
/// emitted before the rest of the parent's page.
pub(crate) struct Lister<'a> {
    adapter: &'a SupabaseAdapter,
    deep: bool,
    policy: ListingErrorPolicy,
    stack: Vec<Cursor>,
}

impl<'a> Lister<'a> {
    pub fn new(adapter: &'a SupabaseAdapter, path: &str, deep: bool) -> Self {
        Self {
            adapter,
            deep,
            policy: adapter.settings().listing_error_policy,
            stack: vec![Cursor::new(path.to_string())],
        }
    }

    pub fn into_stream(self) -> BoxStream<'a, Result<StorageAttributes>> {
        stream::unfold(self, |mut lister| async move {
            let item = lister.next_entry().await?;
            Some((item, lister))
        })
        .boxed()
    }

    async fn next_entry(&mut self) -> Option<Result<StorageAttributes>> {
        let adapter = self.adapter;

        loop {
            let cursor = self.stack.last_mut()?;

            if let Some(entry) = cursor.page.pop_front() {
                let path = join_paths(&[cursor.prefix.as_str(), entry.name.as_str()]);
                let descend = self.deep && entry.is_directory();
                let attributes = entry.into_attributes(path.clone());
                if descend {
                    self.stack.push(Cursor::new(path));
                }
                return Some(Ok(attributes));
            }

            if cursor.done {
                self.stack.pop();
                continue;
            }

            match fetch_page(adapter, &cursor.prefix, cursor.offset).await {
                Ok(Page::Entries(entries)) => {
                    cursor.done = entries.len() < PAGE_SIZE;
                    cursor.offset += PAGE_SIZE;
                    cursor.page = entries.into();
                }
                Ok(Page::Rejected(reason)) => {
                    let prefix = cursor.prefix.clone();
                    self.stack.pop();
                    match self.policy {
                        ListingErrorPolicy::Truncate => {
                            warn!(prefix = %prefix, "listing page failed, truncating: {}", reason);
                        }
                        ListingErrorPolicy::Fail => {
                            self.stack.clear();
                            return Some(Err(StorageError::ListFailed {
                                path: prefix,
                                reason,
                            }));
                        }
                    }
                }
                Err(e) => {
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

async fn fetch_page(adapter: &SupabaseAdapter, prefix: &str, offset: usize) -> Result<Page> {
    let body = ListRequest {
        prefix,
        limit: PAGE_SIZE,
        offset: Some(offset),
        sort_by: Some(SortBy::name_asc()),
        search: None,
    };
    let response = adapter.list(&body).await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Ok(Page::Rejected(text));
    }
    Ok(match serde_json::from_str::<Vec<ListedObject>>(&text) {
        Ok(entries) => Page::Entries(entries),
        Err(e) => Page::Rejected(e.to_string()),
    })
}
