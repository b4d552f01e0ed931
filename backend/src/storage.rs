use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::{SystemTime, UNIX_EPOCH},
};
use uuid::Uuid;

use crate::config::{AppConfig, UploadBackend};

/// Content types accepted for blog cover images.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

// 1. StorageService Contract
/// StorageService
///
/// Abstract contract for persisting uploaded files. Handlers store the path
/// returned by `put_object` on the row and hand it back to `delete_object`
/// when the row (or the image) goes away.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Prepares the backing location (directory or bucket). Safe to call at startup.
    async fn ensure_ready(&self) -> Result<(), String>;

    /// Persists `bytes` under `key` and returns the public path of the object.
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String>;

    /// Removes an object by the public path `put_object` returned. A missing
    /// object is not an error.
    async fn delete_object(&self, public_path: &str) -> Result<(), String>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

/// Builds the backend selected by `UPLOAD_BACKEND`.
pub async fn from_config(config: &AppConfig) -> StorageState {
    match &config.upload {
        UploadBackend::Disk {
            root,
            public_prefix,
        } => Arc::new(LocalDiskStorage::new(root.clone(), public_prefix.clone())),
        UploadBackend::S3 {
            endpoint,
            region,
            access_key,
            secret_key,
            bucket,
        } => Arc::new(S3StorageClient::new(endpoint, region, access_key, secret_key, bucket).await),
    }
}

// 2. Local disk
/// LocalDiskStorage
///
/// Writes files under `root` and exposes them as `{public_prefix}/{key}`; the
/// static file server maps the prefix back onto the directory.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, public_path: &str) -> Option<PathBuf> {
        let key = public_path
            .strip_prefix(&self.public_prefix)?
            .trim_start_matches('/');
        let key = sanitize_key(key);
        (!key.is_empty()).then(|| self.root.join(key))
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_ready(&self) -> Result<(), String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("cannot create {}: {e}", self.root.display()))
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, String> {
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
            .map_err(|e| format!("write {} failed: {e}", path.display()))?;
        Ok(format!("{}/{}", self.public_prefix, key))
    }

    async fn delete_object(&self, public_path: &str) -> Result<(), String> {
        let Some(path) = self.path_for(public_path) else {
            return Err(format!("'{public_path}' is not managed by this storage"));
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("remove {} failed: {e}", path.display())),
        }
    }
}

// 3. S3-compatible object storage
/// S3StorageClient
///
/// Uploads through the AWS SDK. Works against MinIO and other S3-compatible
/// gateways; `force_path_style(true)` is required for those.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    public_base: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base: format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        }
    }

    fn key_for<'a>(&self, public_path: &'a str) -> Option<&'a str> {
        public_path
            .strip_prefix(&self.public_base)
            .map(|k| k.trim_start_matches('/'))
            .filter(|k| !k.is_empty())
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent on the gateways we target; an "already
    /// owned" answer is fine.
    async fn ensure_ready(&self) -> Result<(), String> {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, String> {
        let key = sanitize_key(key);
        if key.is_empty() {
            return Err("empty object key".to_string());
        }
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(format!("{}/{}", self.public_base, key))
    }

    async fn delete_object(&self, public_path: &str) -> Result<(), String> {
        let Some(key) = self.key_for(public_path) else {
            return Err(format!("'{public_path}' is not managed by this storage"));
        };
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// sanitize_key
///
/// Removes directory navigation components (`..`, `.`) and empty segments
/// from a key so it can never escape the storage root.
fn sanitize_key(key: &str) -> String {
    key.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// object_key
///
/// Unique flat key for an uploaded file: `{millis}-{8 hex}-{cleaned name}`.
/// Only the last path component of the client-supplied name is kept.
pub fn object_key(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        cleaned = "upload".to_string();
    }

    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let short = Uuid::new_v4().simple().to_string();
    format!("{millis}-{}-{cleaned}", &short[..8])
}

// 4. The Mock Implementation (For Tests)
/// MockStorageService
///
/// In-memory storage for tests. `should_fail` makes every write fail; the
/// `objects` map can be inspected to assert on uploads and compensations.
#[derive(Clone, Default)]
pub struct MockStorageService {
    pub should_fail: bool,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
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

    /// Public paths of the objects currently stored.
    pub fn stored_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    pub fn contains(&self, public_path: &str) -> bool {
        self.objects
            .lock()
            .map(|o| o.contains_key(public_path))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), String> {
        Ok(())
    }

    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }
        let path = format!("/uploads/blogs/{}", sanitize_key(key));
        self.objects
            .lock()
            .map_err(|e| e.to_string())?
            .insert(path.clone(), bytes);
        Ok(path)
    }

    async fn delete_object(&self, public_path: &str) -> Result<(), String> {
        self.objects
            .lock()
            .map_err(|e| e.to_string())?
            .remove(public_path);
        Ok(())
    }
}
