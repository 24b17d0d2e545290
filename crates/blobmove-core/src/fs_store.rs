//! Filesystem-backed stores.
//!
//! The source models a blob account as a directory per container with
//! `/`-separated keys below it; the destination is a plain directory tree.
//! These back the integration tests and deployments that stage through a
//! mounted share; cloud backends implement the same traits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use walkdir::WalkDir;

use crate::activity::StoreProvider;
use crate::config::RunConfig;
use crate::credentials::Credential;
use crate::errors::{classify_read_error, classify_write_error, ActivityError, ActivityResult};
use crate::store::{ByteStream, DestinationStore, ObjectRef, SourceStore};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Map a `/`-separated object key onto a path below `root`.
fn join_key(root: &Path, key: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in key.split('/').filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}

/// Source store over one container directory.
#[derive(Debug)]
pub struct FsSourceStore {
    container_root: PathBuf,
    container: String,
}

impl FsSourceStore {
    /// Open `container` under `account_root`. The container directory must
    /// already exist; a missing or unreadable one fails here, not at first
    /// listing.
    pub async fn open(account_root: impl Into<PathBuf>, container: &str) -> ActivityResult<Self> {
        let account_root: PathBuf = account_root.into();
        let container_root = account_root.join(container);
        let meta = tokio::fs::metadata(&container_root).await.map_err(|_| {
            ActivityError::connection(format!(
                "container {container} doesn't exist under {}",
                account_root.display()
            ))
        })?;
        if !meta.is_dir() {
            return Err(ActivityError::connection(format!(
                "container path {} is not a directory",
                container_root.display()
            )));
        }
        info!(
            "opened source container {container} at {}",
            container_root.display()
        );
        Ok(Self {
            container_root,
            container: container.to_string(),
        })
    }

    fn object_path(&self, object: &ObjectRef) -> PathBuf {
        join_key(&self.container_root, &object.path)
    }
}

#[async_trait::async_trait]
impl SourceStore for FsSourceStore {
    async fn list(&self, prefix: &str) -> ActivityResult<Vec<ObjectRef>> {
        let root = self.container_root.clone();
        let container = self.container.clone();
        let prefix = prefix.to_string();
        debug!("listing {container}/{prefix}");

        let objects = tokio::task::spawn_blocking(move || {
            let mut objects = Vec::new();
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(|err| {
                    ActivityError::connection(format!("listing {container} failed: {err}"))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry.path().strip_prefix(&root).map_err(|err| {
                    ActivityError::connection(format!("listing {container} failed: {err}"))
                })?;
                let key = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(&prefix) {
                    continue;
                }
                let size_hint = entry.metadata().ok().map(|m| m.len());
                objects.push(ObjectRef {
                    container: container.clone(),
                    path: key,
                    size_hint,
                });
            }
            Ok(objects)
        })
        .await
        .map_err(|err| ActivityError::connection(format!("listing task failed: {err}")))??;

        debug!("finished listing, {} objects", objects.len());
        Ok(objects)
    }

    async fn open_read_stream(&self, object: &ObjectRef) -> ActivityResult<ByteStream> {
        let path = self.object_path(object);
        let key = object.path.clone();
        let file = tokio::fs::File::open(&path)
            .await
            .map_err(|err| classify_read_error(&err, &key))?;

        let stream = futures::stream::try_unfold((file, key), |(mut file, key)| async move {
            let mut buf = vec![0u8; READ_CHUNK_SIZE];
            let n = file
                .read(&mut buf)
                .await
                .map_err(|err| classify_read_error(&err, &key))?;
            if n == 0 {
                Ok(None)
            } else {
                buf.truncate(n);
                Ok(Some((Bytes::from(buf), (file, key))))
            }
        });
        Ok(Box::pin(stream))
    }

    async fn delete_prefix(&self, prefix: &str) -> ActivityResult<u64> {
        let objects = self.list(prefix).await?;
        let mut count = 0u64;
        for object in &objects {
            info!("deleting {}/{}", self.container, object.path);
            match tokio::fs::remove_file(self.object_path(object)).await {
                Ok(()) => count += 1,
                // Already gone is fine; the point is that it no longer exists.
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(ActivityError::connection(format!(
                        "deleting {} failed: {err}",
                        object.path
                    )))
                }
            }
        }
        info!("finished deleting {count} objects under {prefix}");
        Ok(count)
    }
}

/// Destination store rooted at one directory.
pub struct FsDestinationStore {
    root: PathBuf,
}

impl FsDestinationStore {
    /// Open the destination rooted at `root`, creating it when missing. A
    /// root that cannot be created fails here.
    pub async fn open(root: impl Into<PathBuf>) -> ActivityResult<Self> {
        let root: PathBuf = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|err| {
            ActivityError::connection(format!(
                "destination root {} is not usable: {err}",
                root.display()
            ))
        })?;
        info!("opened destination at {}", root.display());
        Ok(Self { root })
    }

    fn full_path(&self, path: &str) -> PathBuf {
        join_key(&self.root, path)
    }
}

#[async_trait::async_trait]
impl DestinationStore for FsDestinationStore {
    async fn write_stream(&self, path: &str, mut stream: ByteStream) -> ActivityResult<u64> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| classify_write_error(&err, path))?;
        }
        let mut file = tokio::fs::File::create(&full)
            .await
            .map_err(|err| classify_write_error(&err, path))?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|err| classify_write_error(&err, path))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|err| classify_write_error(&err, path))?;
        debug!("wrote {written} bytes to {path}");
        Ok(written)
    }

    async fn exists(&self, path: &str) -> ActivityResult<bool> {
        tokio::fs::try_exists(self.full_path(path))
            .await
            .map_err(|err| ActivityError::connection(format!("exists({path}) failed: {err}")))
    }

    async fn delete(&self, path: &str) -> ActivityResult<()> {
        info!("deleting {path}");
        match tokio::fs::remove_file(self.full_path(path)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(classify_write_error(&err, path)),
        }
    }
}

/// Opens filesystem stores for a run. The source account maps to one
/// directory, the destination to another.
pub struct FsStoreProvider {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
}

#[async_trait::async_trait]
impl StoreProvider for FsStoreProvider {
    async fn open_source(
        &self,
        config: &RunConfig,
        _credential: &Credential,
    ) -> ActivityResult<Arc<dyn SourceStore>> {
        let store = FsSourceStore::open(self.source_root.clone(), &config.source.container).await?;
        Ok(Arc::new(store))
    }

    async fn open_destination(
        &self,
        _config: &RunConfig,
        _credential: &Credential,
    ) -> ActivityResult<Arc<dyn DestinationStore>> {
        let store = FsDestinationStore::open(self.destination_root.clone()).await?;
        Ok(Arc::new(store))
    }
}
