//! Local filesystem gateway (lite mode).
//!
//! Used when running without S3/MinIO. Layout under `data_dir`:
//!
//! ```text
//! objects/<name>   file bytes
//! types/<name>     content type recorded at upload
//! staging/         uploads in flight, renamed into objects/ when complete
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use filebox_common::config::StorageConfig;
use filebox_common::models::FileRecord;
use futures_util::StreamExt;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{CallLimits, FileStore, FileStream, StorageError, guess_content_type};

const OBJECTS_DIR: &str = "objects";
const TYPES_DIR: &str = "types";
const STAGING_DIR: &str = "staging";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct LocalFileStore {
    data_dir: PathBuf,
    limits: CallLimits,
    /// Canonical `data_dir`, set once the directories exist.
    root: Arc<OnceCell<PathBuf>>,
}

impl LocalFileStore {
    /// Create the store and its directories.
    pub async fn open(
        cfg: &StorageConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, StorageError> {
        let store = Self::new(
            &cfg.data_dir,
            Duration::from_secs(cfg.operation_timeout_secs),
            shutdown,
        );
        store.ready().await?;
        Ok(store)
    }

    /// Create the store lazily; directories are made by the first operation.
    pub fn new(data_dir: impl Into<PathBuf>, timeout: Duration, shutdown: CancellationToken) -> Self {
        Self {
            data_dir: data_dir.into(),
            limits: CallLimits::new(timeout, shutdown),
            root: Arc::new(OnceCell::new()),
        }
    }

    async fn root(&self) -> Result<&Path, StorageError> {
        let root = self
            .root
            .get_or_try_init(|| self.limits.run("ensure_data_dir", self.ensure_dirs()))
            .await?;
        Ok(root.as_path())
    }

    async fn ensure_dirs(&self) -> Result<PathBuf, StorageError> {
        for dir in [OBJECTS_DIR, TYPES_DIR, STAGING_DIR] {
            let path = self.data_dir.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }
        let root = tokio::fs::canonicalize(&self.data_dir)
            .await
            .with_context(|| format!("Failed to resolve {}", self.data_dir.display()))?;
        tracing::info!(data_dir = %root.display(), "Local file storage ready");
        Ok(root)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn ready(&self) -> Result<(), StorageError> {
        self.root().await.map(|_| ())
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        if check_name(name).is_err() {
            return Ok(false);
        }
        let path = self.root().await?.join(OBJECTS_DIR).join(name);
        self.limits
            .run("exists", async {
                match tokio::fs::metadata(&path).await {
                    Ok(meta) => Ok(meta.is_file()),
                    Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                    Err(e) => Err(anyhow::Error::new(e)
                        .context(format!("Failed to stat {name}"))
                        .into()),
                }
            })
            .await
    }

    async fn upload(&self, file: FileRecord) -> Result<String, StorageError> {
        let FileRecord {
            name,
            content_type,
            content,
            ..
        } = file;
        check_name(&name)?;
        let root = self.root().await?;
        let object = root.join(OBJECTS_DIR).join(&name);
        let type_file = root.join(TYPES_DIR).join(&name);
        let staged = root.join(STAGING_DIR).join(format!(
            "{}-{}-{name}",
            std::process::id(),
            STAGING_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let content = content.unwrap_or_default();

        // A type file only ever describes the bytes currently in objects/.
        let result = self
            .limits
            .run("upload", async {
                tokio::fs::write(&staged, &content)
                    .await
                    .with_context(|| format!("Failed to stage {name}"))?;
                remove_if_present(&type_file)
                    .await
                    .with_context(|| format!("Failed to clear content type of {name}"))?;
                tokio::fs::rename(&staged, &object)
                    .await
                    .with_context(|| format!("Failed to write {name}"))?;
                tokio::fs::write(&type_file, content_type.as_bytes())
                    .await
                    .with_context(|| format!("Failed to record content type of {name}"))?;
                Ok(())
            })
            .await;
        if result.is_err() {
            let _ = remove_if_present(&staged).await;
        }
        result?;

        let location = Url::from_file_path(&object)
            .map_err(|_| anyhow::anyhow!("{} is not an absolute path", object.display()))?;
        Ok(location.to_string())
    }

    async fn download(&self, name: &str) -> Result<FileRecord, StorageError> {
        check_name(name)?;
        let root = self.root().await?;

        self.limits
            .run("download", async {
                let bytes = match tokio::fs::read(root.join(OBJECTS_DIR).join(name)).await {
                    Ok(bytes) => bytes,
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(StorageError::NotFound {
                            name: name.to_string(),
                        });
                    }
                    Err(e) => {
                        return Err(anyhow::Error::new(e)
                            .context(format!("Failed to read {name}"))
                            .into());
                    }
                };
                let content_type = read_content_type(root, name).await;
                Ok(FileRecord::with_content(name, content_type, bytes))
            })
            .await
    }

    async fn list(&self) -> Result<FileStream, StorageError> {
        let root = self.root().await?.to_path_buf();
        let entries = self
            .limits
            .run("list", async {
                tokio::fs::read_dir(root.join(OBJECTS_DIR))
                    .await
                    .context("Failed to open objects directory")
                    .map_err(StorageError::from)
            })
            .await?;

        let stream = futures_util::stream::unfold(Some(entries), move |state| {
            let root = root.clone();
            async move {
                let mut entries = state?;
                loop {
                    match entries.next_entry().await {
                        Ok(None) => return None,
                        Ok(Some(entry)) => {
                            let meta = match entry.metadata().await {
                                Ok(meta) => meta,
                                Err(e) => {
                                    tracing::warn!(
                                        entry = %entry.path().display(),
                                        error = %e,
                                        "Skipping unreadable entry in listing"
                                    );
                                    continue;
                                }
                            };
                            if !meta.is_file() {
                                continue;
                            }
                            let name = entry.file_name().to_string_lossy().into_owned();
                            let content_type = read_content_type(&root, &name).await;
                            let record = FileRecord::summary(name, content_type, meta.len() as i64);
                            return Some((Ok(record), Some(entries)));
                        }
                        Err(e) => {
                            let err = anyhow::Error::new(e).context("Failed to list objects");
                            return Some((Err(err.into()), None));
                        }
                    }
                }
            }
        });

        Ok(stream.boxed())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        check_name(name)?;
        let root = self.root().await?;

        self.limits
            .run("delete", async {
                match tokio::fs::remove_file(root.join(OBJECTS_DIR).join(name)).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
                    Err(e) => {
                        return Err(anyhow::Error::new(e)
                            .context(format!("Failed to delete {name}"))
                            .into());
                    }
                }
                // The object is gone; a stale type file is harmless.
                let _ = remove_if_present(&root.join(TYPES_DIR).join(name)).await;
                Ok(true)
            })
            .await
    }
}

/// Object names must be a single, plain path component.
fn check_name(name: &str) -> Result<(), StorageError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(StorageError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

async fn read_content_type(root: &Path, name: &str) -> String {
    match tokio::fs::read_to_string(root.join(TYPES_DIR).join(name)).await {
        Ok(ct) if !ct.trim().is_empty() => ct.trim().to_string(),
        _ => guess_content_type(name),
    }
}
