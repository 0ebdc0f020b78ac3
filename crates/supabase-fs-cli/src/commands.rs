//! Subcommand implementations

use crate::Command;
use anyhow::Context;
use chrono::DateTime;
use futures::TryStreamExt;
use supabase_fs::{
    FileAttributes, FilesystemAdapter, StorageAttributes, SupabaseAdapter, UrlOptions,
    WriteOptions,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Execute one subcommand, writing its output to `out`
pub async fn run<W>(
    adapter: &SupabaseAdapter,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Ls { path, deep, long } => {
            let mut entries = adapter.list_contents(&path, deep);
            while let Some(entry) = entries.try_next().await? {
                let line = if long {
                    format_long(&entry)
                } else {
                    entry.path().to_string()
                };
                write_line(out, &line).await?;
            }
        }
        Command::Cat { path } => {
            let mut chunks = adapter.read_stream(&path).await?;
            while let Some(chunk) = chunks.try_next().await? {
                out.write_all(&chunk).await?;
            }
        }
        Command::Put {
            local,
            remote,
            content_type,
            cache_control,
        } => {
            let file = tokio::fs::File::open(&local)
                .await
                .with_context(|| format!("failed to open {}", local.display()))?;
            let mut options = WriteOptions::new().with_cache_control(cache_control);
            if let Some(ct) = content_type {
                options = options.with_content_type(ct);
            }
            adapter.write_stream(&remote, Box::new(file), &options).await?;
            tracing::info!("Uploaded {} to {}", local.display(), remote);
        }
        Command::Rm { path } => adapter.delete(&path).await?,
        Command::Rmdir { path } => adapter.delete_directory(&path).await?,
        Command::Mkdir { path } => {
            adapter
                .create_directory(&path, &WriteOptions::default())
                .await?
        }
        Command::Mv { from, to } => adapter.move_file(&from, &to).await?,
        Command::Cp { from, to } => adapter.copy(&from, &to).await?,
        Command::Stat { path } => {
            let attributes = stat(adapter, &path).await?;
            write_line(out, &serde_json::to_string_pretty(&attributes)?).await?;
        }
        Command::Url {
            path,
            signed,
            public,
            expires,
            download,
        } => {
            let mut options = UrlOptions::new();
            if let Some(seconds) = expires {
                options = options.with_expires_in(seconds);
            }
            if download {
                options = options.with_download();
            }

            let url = if signed {
                adapter.signed_url(&path, &options).await?
            } else if public {
                adapter.public_url(&path, &options)?
            } else {
                adapter.url(&path).await?
            };
            write_line(out, &url).await?;
        }
        Command::Exists { path, dir } => {
            let exists = if dir {
                adapter.directory_exists(&path).await?
            } else {
                adapter.file_exists(&path).await?
            };
            write_line(out, &exists.to_string()).await?;
        }
    }

    out.flush().await?;
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, line: &str) -> std::io::Result<()> {
    out.write_all(line.as_bytes()).await?;
    out.write_all(b"\n").await
}

/// Combine the single-attribute lookups into one record
async fn stat(adapter: &SupabaseAdapter, path: &str) -> anyhow::Result<FileAttributes> {
    let mime = adapter.mime_type(path).await?;
    let size = adapter.file_size(path).await?;
    let modified = adapter.last_modified(path).await?;

    Ok(FileAttributes {
        mime_type: mime.mime_type,
        file_size: size.file_size,
        last_modified: modified.last_modified,
        ..FileAttributes::new(path)
    })
}

fn format_long(entry: &StorageAttributes) -> String {
    let modified = entry
        .last_modified()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".repeat(16));

    match entry {
        StorageAttributes::File(file) => format!(
            "-  {:>10}  {}  {}",
            file.file_size.unwrap_or(0),
            modified,
            file.path
        ),
        StorageAttributes::Directory(dir) => format!("d  {:>10}  {}  {}", "-", modified, dir.path),
    }
}
