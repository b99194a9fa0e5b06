use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// delete_objects accepts at most this many keys per request.
pub const DELETE_BATCH_SIZE: usize = 1000;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset directory {0:?} does not exist or is not a directory")]
    MissingDirectory(PathBuf),
    #[error("Asset directory {0:?} contains no files")]
    Empty(PathBuf),
    #[error("Failed to walk {path:?}\n{source}")]
    Walk { path: PathBuf, #[source] source: walkdir::Error },
    #[error("Failed to read {path:?}\n{source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error("Failed to upload {key} to {bucket}\n{message}")]
    Upload { bucket: String, key: String, message: String },
    #[error("Failed to list objects in {bucket}\n{message}")]
    List { bucket: String, message: String },
    #[error("Failed to delete objects from {bucket}\n{message}")]
    Delete { bucket: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFile {
    /// object key, relative to the asset root, always `/` separated.
    pub key: String,
    pub path: PathBuf,
    pub size: u64,
    pub checksum: u32,
    pub content_type: &'static str,
}

/// every file under a build output directory, sorted by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    pub root: PathBuf,
    pub files: Vec<AssetFile>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub deleted: usize,
}

pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "webmanifest" => "application/manifest+json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

fn object_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative.components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}

fn read_asset(root: &Path, path: PathBuf) -> Result<AssetFile, AssetError> {
    let data = std::fs::read(&path)
        .map_err(|source| AssetError::Io { path: path.clone(), source })?;
    let key = object_key(root, &path).ok_or_else(|| AssetError::Io {
        path: path.clone(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidData, "path is not valid utf-8"),
    })?;
    Ok(AssetFile {
        key,
        content_type: content_type_for(&path),
        size: data.len() as u64,
        checksum: adler::adler32_slice(&data),
        path,
    })
}

impl AssetManifest {
    pub fn scan<P: AsRef<Path>>(root: P) -> Result<Self, AssetError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(AssetError::MissingDirectory(root.to_path_buf()));
        }
        let mut paths = vec![];
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|source| AssetError::Walk { path: root.to_path_buf(), source })?;
            if entry.file_type().is_file() {
                paths.push(entry.into_path());
            }
        }
        if paths.is_empty() {
            return Err(AssetError::Empty(root.to_path_buf()));
        }
        let mut files = paths.into_par_iter()
            .map(|path| read_asset(root, path))
            .collect::<Result<Vec<_>, _>>()?;
        files.sort_by(|a, b| a.key.cmp(&b.key));
        debug!(root = ?root, files = files.len(), "scanned assets");
        Ok(Self { root: root.to_path_buf(), files })
    }

    pub fn keys(&self) -> BTreeSet<&str> {
        self.files.iter().map(|f| f.key.as_str()).collect()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// changes whenever any key or file content changes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = adler::Adler32::new();
        for file in self.files.iter() {
            hasher.write_slice(file.key.as_bytes());
            hasher.write_slice(&file.checksum.to_be_bytes());
        }
        format!("{:08x}", hasher.checksum())
    }
}

/// the bucket operations an asset upload needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_file(&self, bucket: &str, file: &AssetFile) -> Result<(), AssetError>;
    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, AssetError>;
    /// `keys` never holds more than `DELETE_BATCH_SIZE` entries.
    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<(), AssetError>;
}

pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_file(&self, bucket: &str, file: &AssetFile) -> Result<(), AssetError> {
        let upload_err = |message: String| AssetError::Upload {
            bucket: bucket.to_string(),
            key: file.key.clone(),
            message,
        };
        let body = ByteStream::from_path(&file.path).await
            .map_err(|e| upload_err(e.to_string()))?;
        self.client.put_object()
            .bucket(bucket)
            .key(&file.key)
            .content_type(file.content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| upload_err(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn list_keys(&self, bucket: &str) -> Result<Vec<String>, AssetError> {
        let mut keys = vec![];
        let mut pages = self.client.list_objects_v2().bucket(bucket).into_paginator().send();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| AssetError::List {
                bucket: bucket.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
            keys.extend(page.contents().iter().filter_map(|o| o.key().map(str::to_string)));
        }
        Ok(keys)
    }

    async fn delete_batch(&self, bucket: &str, keys: &[String]) -> Result<(), AssetError> {
        let delete_err = |message: String| AssetError::Delete { bucket: bucket.to_string(), message };
        let objects = keys.iter()
            .map(|key| ObjectIdentifier::builder().key(key).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| delete_err(e.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(true)
            .build()
            .map_err(|e| delete_err(e.to_string()))?;
        self.client.delete_objects().bucket(bucket).delete(delete).send().await
            .map_err(|e| delete_err(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

async fn delete_keys(store: &dyn ObjectStore, bucket: &str, keys: &[String]) -> Result<(), AssetError> {
    for chunk in keys.chunks(DELETE_BATCH_SIZE) {
        store.delete_batch(bucket, chunk).await?;
    }
    Ok(())
}

/// uploads every file in the manifest. When `prune` is set, objects in the
/// bucket that are not part of the manifest are deleted afterwards.
pub async fn upload_assets(
    store: &dyn ObjectStore,
    bucket: &str,
    manifest: &AssetManifest,
    prune: bool,
) -> Result<UploadReport, AssetError> {
    let mut report = UploadReport::default();
    for file in manifest.files.iter() {
        store.put_file(bucket, file).await?;
        debug!(key = %file.key, size = file.size, "uploaded");
        report.uploaded += 1;
    }

    if prune {
        let local = manifest.keys();
        let stale: Vec<String> = store.list_keys(bucket).await?
            .into_iter()
            .filter(|k| !local.contains(k.as_str()))
            .collect();
        if !stale.is_empty() {
            warn!(bucket, count = stale.len(), "pruning objects missing from the build output");
            delete_keys(store, bucket, &stale).await?;
        }
        report.deleted = stale.len();
    }
    info!(bucket, uploaded = report.uploaded, deleted = report.deleted, "assets uploaded");
    Ok(report)
}
