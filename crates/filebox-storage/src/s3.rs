//! MinIO / S3-compatible object storage gateway.
//!
//! Wraps `aws-sdk-s3` to provide exists / upload / download / list / delete
//! against a single bucket (the container).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Builder as S3Builder, Credentials, Region},
    error::SdkError,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration, Object},
};
use filebox_common::config::StorageConfig;
use filebox_common::models::FileRecord;
use futures_util::StreamExt;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{CallLimits, FileStore, FileStream, StorageError, guess_content_type};

/// S3/MinIO storage gateway over the AWS SDK.
#[derive(Clone)]
pub struct S3FileStore {
    inner: Client,
    bucket: String,
    region: String,
    /// Objects are addressed as `location_base/<key>`.
    location_base: Url,
    limits: CallLimits,
    ready: Arc<OnceCell<()>>,
}

impl S3FileStore {
    /// Build the client and wait for the bucket to exist.
    pub async fn connect(
        cfg: &StorageConfig,
        shutdown: CancellationToken,
    ) -> Result<Self, StorageError> {
        let store = Self::new(cfg, shutdown).await?;
        store.ready().await?;
        Ok(store)
    }

    /// Build the client without touching the bucket. The first operation
    /// performs the bucket check.
    pub async fn new(cfg: &StorageConfig, shutdown: CancellationToken) -> Result<Self, StorageError> {
        let mut builder = if cfg.access_key.is_empty() {
            // Environment, profile, or instance credentials.
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(Region::new(cfg.region.clone()))
                .load()
                .await;
            S3Builder::from(&shared)
        } else {
            let creds = Credentials::new(
                &cfg.access_key,
                &cfg.secret_key,
                None, // session token
                None, // expiry
                "filebox-storage",
            );
            S3Builder::new()
                .credentials_provider(creds)
                .region(Region::new(cfg.region.clone()))
        };

        if !cfg.endpoint.is_empty() {
            // Force path-style URLs (required for MinIO)
            builder = builder.endpoint_url(&cfg.endpoint).force_path_style(true);
        }

        Ok(Self {
            inner: Client::from_conf(builder.build()),
            bucket: cfg.container.clone(),
            region: cfg.region.clone(),
            location_base: location_base(cfg)?,
            limits: CallLimits::new(
                Duration::from_secs(cfg.operation_timeout_secs),
                shutdown,
            ),
            ready: Arc::new(OnceCell::new()),
        })
    }

    // ------------------------------------------------------------------
    // Bucket management
    // ------------------------------------------------------------------

    /// Ensure the bucket exists; create it if absent.
    async fn ensure_bucket(&self) -> Result<(), StorageError> {
        match self.inner.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => {
                tracing::debug!(bucket = %self.bucket, "Bucket already exists");
                return Ok(());
            }
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to check bucket {}", self.bucket))
                    .into());
            }
        }

        tracing::info!(bucket = %self.bucket, "Bucket does not exist, creating");
        let mut create = self.inner.create_bucket().bucket(&self.bucket);
        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            create = create.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match create.send().await {
            Ok(_) => Ok(()),
            // Another instance created it between our check and create.
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_bucket_already_owned_by_you()) =>
            {
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e)
                .context("Failed to create object storage bucket")
                .into()),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// HEAD the object. 404 is `false`; anything else unexpected is an error.
    async fn head(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .inner
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to stat {key} in object storage"))
                .into()),
        }
    }

    fn object_location(&self, key: &str) -> String {
        let mut url = self.location_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        url.to_string()
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn ready(&self) -> Result<(), StorageError> {
        self.ready
            .get_or_try_init(|| self.limits.run("ensure_bucket", self.ensure_bucket()))
            .await?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        if name.is_empty() {
            return Ok(false);
        }
        self.ready().await?;
        self.limits.run("exists", self.head(name)).await
    }

    async fn upload(&self, file: FileRecord) -> Result<String, StorageError> {
        let FileRecord {
            name: key,
            content_type,
            content,
            ..
        } = file;
        check_key(&key)?;
        self.ready().await?;

        let put = self
            .inner
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(content.unwrap_or_default()))
            .send();

        self.limits
            .run("upload", async {
                put.await
                    .with_context(|| format!("Failed to upload {key} to object storage"))?;
                Ok(())
            })
            .await?;

        Ok(self.object_location(&key))
    }

    async fn download(&self, name: &str) -> Result<FileRecord, StorageError> {
        check_key(name)?;
        self.ready().await?;

        self.limits
            .run("download", async {
                let out = match self
                    .inner
                    .get_object()
                    .bucket(&self.bucket)
                    .key(name)
                    .send()
                    .await
                {
                    Ok(out) => out,
                    Err(e) if is_not_found(&e) => {
                        return Err(StorageError::NotFound {
                            name: name.to_string(),
                        });
                    }
                    Err(e) => {
                        return Err(anyhow::Error::new(e)
                            .context(format!("Failed to download {name} from object storage"))
                            .into());
                    }
                };

                let content_type = out
                    .content_type()
                    .map(str::to_owned)
                    .unwrap_or_else(|| guess_content_type(name));
                let bytes = out
                    .body
                    .collect()
                    .await
                    .with_context(|| format!("Failed to read {name} body"))?
                    .into_bytes();

                Ok(FileRecord::with_content(name, content_type, bytes.to_vec()))
            })
            .await
    }

    async fn list(&self) -> Result<FileStream, StorageError> {
        self.ready().await?;

        let pages = self
            .inner
            .list_objects_v2()
            .bucket(&self.bucket)
            .into_paginator()
            .send();
        let limits = self.limits.clone();

        // Pages are fetched on demand and drained one object at a time; the
        // stream ends after the first error.
        let stream = futures_util::stream::unfold(
            (Some(pages), VecDeque::<Object>::new()),
            move |(pages, mut buffered)| {
                let limits = limits.clone();
                async move {
                    let mut pages = pages?;
                    loop {
                        if let Some(object) = buffered.pop_front() {
                            let record = object_summary(&object);
                            return Some((Ok(record), (Some(pages), buffered)));
                        }
                        let next = limits
                            .run("list", async { Ok::<_, StorageError>(pages.next().await) })
                            .await;
                        match next {
                            Ok(None) => return None,
                            Ok(Some(Ok(page))) => {
                                buffered.extend(page.contents.unwrap_or_default());
                            }
                            Ok(Some(Err(e))) => {
                                let err = anyhow::Error::new(e).context("Failed to list objects");
                                return Some((Err(err.into()), (None, VecDeque::new())));
                            }
                            Err(e) => return Some((Err(e), (None, VecDeque::new()))),
                        }
                    }
                }
            },
        );

        Ok(stream.boxed())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        check_key(name)?;
        self.ready().await?;

        // DeleteObject succeeds for missing keys, so probe first.
        self.limits
            .run("delete", async {
                if !self.head(name).await? {
                    return Ok(false);
                }
                self.inner
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(name)
                    .send()
                    .await
                    .with_context(|| format!("Failed to delete {name} from object storage"))?;
                Ok(true)
            })
            .await
    }
}

/// Check if an S3 SDK error is a 404 (object or bucket not found).
/// Only `ServiceError` with HTTP 404 qualifies; timeouts, auth failures, etc. do not.
fn is_not_found<E>(err: &SdkError<E>) -> bool {
    matches!(err, SdkError::ServiceError(e) if e.raw().status().as_u16() == 404)
}

fn check_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidName {
            name: key.to_string(),
        });
    }
    Ok(())
}

/// ListObjectsV2 carries no content type, so it is inferred from the key.
fn object_summary(object: &Object) -> FileRecord {
    let key = object.key().unwrap_or_default();
    FileRecord::summary(key, guess_content_type(key), object.size().unwrap_or(0))
}

/// Base URL for returned object locations: `public_url/<bucket>`, then
/// `endpoint/<bucket>` (path style), then the AWS virtual-hosted bucket URL.
fn location_base(cfg: &StorageConfig) -> Result<Url, StorageError> {
    let explicit = cfg
        .public_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .or(Some(cfg.endpoint.as_str()).filter(|u| !u.is_empty()));

    let url = match explicit {
        Some(base) => {
            let mut url = Url::parse(base)
                .with_context(|| format!("Invalid storage base URL {base}"))?;
            url.path_segments_mut()
                .map_err(|_| anyhow::anyhow!("Storage base URL {base} cannot hold a path"))?
                .pop_if_empty()
                .push(&cfg.container);
            url
        }
        None => Url::parse(&format!(
            "https://{}.s3.{}.amazonaws.com/",
            cfg.container, cfg.region
        ))
        .context("Invalid bucket name for AWS URL")?,
    };

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filebox_common::config::StorageBackend;

    fn cfg() -> StorageConfig {
        StorageConfig {
            backend: StorageBackend::S3,
            endpoint: String::new(),
            access_key: "minio".into(),
            secret_key: "minio123".into(),
            region: "eu-west-1".into(),
            container: "docs".into(),
            public_url: None,
            data_dir: String::new(),
            operation_timeout_secs: 30,
        }
    }

    #[test]
    fn test_location_base_defaults_to_aws_bucket_url() {
        let base = location_base(&cfg()).unwrap();
        assert_eq!(base.as_str(), "https://docs.s3.eu-west-1.amazonaws.com/");
    }

    #[test]
    fn test_location_base_uses_endpoint_path_style() {
        let mut c = cfg();
        c.endpoint = "http://localhost:9000".into();
        let base = location_base(&c).unwrap();
        assert_eq!(base.as_str(), "http://localhost:9000/docs");
    }

    #[test]
    fn test_public_url_wins_over_endpoint() {
        let mut c = cfg();
        c.endpoint = "http://localhost:9000".into();
        c.public_url = Some("https://cdn.example.com/".into());
        let base = location_base(&c).unwrap();
        assert_eq!(base.as_str(), "https://cdn.example.com/docs");
    }

    #[tokio::test]
    async fn test_object_location_escapes_key() {
        let mut c = cfg();
        c.endpoint = "http://localhost:9000".into();
        let store = S3FileStore::new(&c, CancellationToken::new()).await.unwrap();
        assert_eq!(
            store.object_location("Q1 report.pdf"),
            "http://localhost:9000/docs/Q1%20report.pdf"
        );
        assert_eq!(
            store.object_location("a.pdf"),
            "http://localhost:9000/docs/a.pdf"
        );
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected_before_any_request() {
        let store = S3FileStore::new(&cfg(), CancellationToken::new()).await.unwrap();
        let err = store.download("").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidName { .. }));
        assert!(!store.exists("").await.unwrap());
    }

    #[test]
    fn test_object_summary_guesses_type_from_key() {
        let object = Object::builder().key("reports/q1.pdf").size(42).build();
        assert_eq!(
            object_summary(&object),
            FileRecord::summary("reports/q1.pdf", "application/pdf", 42)
        );

        let bare = Object::builder().key("README").build();
        assert_eq!(
            object_summary(&bare),
            FileRecord::summary("README", "application/octet-stream", 0)
        );
    }

    #[tokio::test]
    async fn test_reorder_is_unsupported() {
        let store = S3FileStore::new(&cfg(), CancellationToken::new()).await.unwrap();
        let err = store
            .reorder(vec![FileRecord::named("a.pdf")])
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { operation: "reorder" }));
    }
}
