use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{ApiResult, AppError},
    forms::UploadedFile,
    storage::{StorageService, sanitize_key},
};

/// Path prefix under which local uploads are served.
pub const LOCAL_UPLOAD_PREFIX: &str = "/uploads";

#[derive(Clone, Debug, PartialEq)]
enum UploadMode {
    Local,
    Cloud {
        public_base_url: String,
        folder: String,
    },
}

/// StoredUpload
///
/// What the storage backend reported after a write: the object key, and the
/// public URL when the backend knows it.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredUpload {
    pub key: String,
    pub url: Option<String>,
}

/// UploadResolver
///
/// Maps stored uploads to public URLs and repairs legacy stored values. Pure:
/// the output depends only on the configuration and the input.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadResolver {
    mode: UploadMode,
    max_bytes: usize,
}

impl UploadResolver {
    pub fn local() -> Self {
        Self {
            mode: UploadMode::Local,
            max_bytes: usize::MAX,
        }
    }

    pub fn cloud(public_base_url: &str, folder: &str) -> Self {
        Self {
            mode: UploadMode::Cloud {
                public_base_url: public_base_url.trim_end_matches('/').to_string(),
                folder: folder.trim_matches('/').to_string(),
            },
            max_bytes: usize::MAX,
        }
    }

    /// Cloud mode when a blob store is configured, local mode otherwise.
    pub fn from_config(config: &AppConfig) -> Self {
        let resolver = match &config.blob_store {
            Some(blob) => Self::cloud(&blob.public_base_url, &blob.folder),
            None => Self::local(),
        };
        resolver.with_max_bytes(config.max_upload_bytes)
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn is_cloud(&self) -> bool {
        matches!(self.mode, UploadMode::Cloud { .. })
    }

    /// object_key
    ///
    /// Generates a fresh key for an upload. Local keys keep a sanitized extension
    /// from the client filename so the static file server can set a content type;
    /// cloud keys are bare identifiers under the configured folder.
    pub fn object_key(&self, original_filename: Option<&str>) -> String {
        let id = Uuid::new_v4();
        match &self.mode {
            UploadMode::Local => format!("{id}.{}", extension_of(original_filename)),
            UploadMode::Cloud { folder, .. } => join_path(folder, &id.to_string()),
        }
    }

    /// resolve
    ///
    /// Turns a stored upload into the URL saved on the record.
    pub fn resolve(&self, stored: Option<&StoredUpload>) -> Option<String> {
        let stored = stored?;
        match &self.mode {
            UploadMode::Local => Some(format!(
                "{LOCAL_UPLOAD_PREFIX}/{}",
                sanitize_key(&stored.key)
            )),
            UploadMode::Cloud {
                public_base_url, ..
            } => Some(
                stored
                    .url
                    .clone()
                    .unwrap_or_else(|| join_path(public_base_url, &sanitize_key(&stored.key))),
            ),
        }
    }

    /// normalize
    ///
    /// Absolute URLs pass through. In cloud mode a legacy `/uploads/<id>` value
    /// whose last segment has no extension is rewritten to the blob-store URL.
    /// Anything else is returned unchanged, so the function is idempotent.
    pub fn normalize(&self, stored_url: &str) -> String {
        if is_absolute(stored_url) {
            return stored_url.to_string();
        }

        if let UploadMode::Cloud {
            public_base_url,
            folder,
        } = &self.mode
        {
            if let Some(segment) = stored_url
                .strip_prefix(LOCAL_UPLOAD_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
            {
                if !segment.is_empty() && !segment.contains('/') && !segment.contains('.') {
                    return join_path(public_base_url, &join_path(folder, segment));
                }
            }
        }

        stored_url.to_string()
    }

    pub fn normalize_opt(&self, stored_url: Option<String>) -> Option<String> {
        stored_url.map(|url| self.normalize(&url))
    }
}

/// store_image
///
/// Upload pipeline: validates the size and content type, writes the bytes to
/// storage and returns the public URL to persist on the record.
pub async fn store_image(
    storage: &dyn StorageService,
    resolver: &UploadResolver,
    file: UploadedFile,
) -> ApiResult<String> {
    if file.bytes.len() > resolver.max_bytes {
        return Err(AppError::PayloadTooLarge);
    }
    if !file.content_type.starts_with("image/") {
        return Err(AppError::invalid("image", "Only image uploads are allowed"));
    }

    let key = resolver.object_key(file.file_name.as_deref());
    let url = storage
        .put_object(&key, file.bytes, &file.content_type)
        .await
        .map_err(|e| {
            if resolver.is_cloud() {
                AppError::Upstream(format!("image upload failed: {e}"))
            } else {
                AppError::Internal(format!("image write failed: {e}"))
            }
        })?;

    tracing::info!(key = %key, "stored uploaded image");

    resolver
        .resolve(Some(&StoredUpload { key, url }))
        .ok_or_else(|| AppError::Internal("upload resolved to no URL".to_string()))
}

fn is_absolute(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

fn join_path(base: &str, tail: &str) -> String {
    match (base.is_empty(), tail.is_empty()) {
        (true, _) => tail.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{base}/{tail}"),
    }
}

fn extension_of(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

