use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::config::BlobStoreConfig;

// 1. StorageService Contract
/// StorageService
///
/// The object-storage seam used by the upload pipeline. Handlers never talk to a
/// concrete backend; `main` picks the S3 client when a blob store is configured
/// and local disk otherwise, and tests use `MockStorageService`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// put_object
    ///
    /// Persists `bytes` under `key`. A backend that knows the public URL of the
    /// stored object returns it; otherwise `Ok(None)` and the caller derives the
    /// URL from the key.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Option<String>, String>;
}

// 2. The Real Implementation (any S3-compatible store)
/// S3StorageClient
///
/// Uses the AWS SDK. `force_path_style(true)` keeps it compatible with MinIO,
/// R2 and Supabase gateways, which do not support virtual-host addressing.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    /// new
    ///
    /// Builds the client from the blob-store section of `AppConfig`.
    pub fn new(config: &BlobStoreConfig) -> Self {
        let credentials = s3::config::Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "static",
        );

        let mut builder = s3::Config::builder()
            .credentials_provider(credentials)
            .region(s3::config::Region::new(config.region.clone()))
            .behavior_version_latest()
            .force_path_style(true);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: s3::Client::from_conf(builder.build()),
            bucket_name: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Option<String>, String> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        // S3 does not report a public URL; the resolver builds it from the key.
        Ok(None)
    }
}

/// LocalDiskStorage
///
/// Writes uploads into a directory that the router serves under `/uploads`.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<Option<String>, String> {
        let key = sanitize_key(key);
        if key.is_empty() {
            return Err("empty object key".to_string());
        }
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| e.to_string())?;
        Ok(None)
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments so a key
/// can never escape the bucket prefix or the upload directory.
pub fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 3. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Records every stored key and answers with a deterministic CDN-style URL, so
/// tests can check the cloud branch of the upload resolver without a network.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    stored: Arc<Mutex<Vec<String>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Keys written so far, in order.
    pub fn stored_keys(&self) -> Vec<String> {
        self.stored
            .lock()
            .map(|keys| keys.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn put_object(
        &self,
        key: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<Option<String>, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        let key = sanitize_key(key);
        if let Ok(mut stored) = self.stored.lock() {
            stored.push(key.clone());
        }
        Ok(Some(format!("https://cdn.mock.test/{key}")))
    }
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;
