//! Local filesystem blob store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<container>/<name>                 blob content
//! <root>/<container>/.meta/<name>.json      content type + metadata
//! ```
//!
//! Moves are a rename within the same root, so a blob is never visible in
//! both areas or in neither.

use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::area::{AreaLayout, BlobArea};
use crate::error::{BlobError, BlobResult};
use crate::store::{
    guess_content_type, validate_name, BlobItem, BlobMetadata, BlobObject, BlobStore, META_DIR,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sidecar {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    metadata: BlobMetadata,
}

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    layout: AreaLayout,
}

impl LocalBlobStore {
    /// Open the store, creating the area directories if needed.
    pub async fn new(root: impl Into<PathBuf>, layout: AreaLayout) -> BlobResult<Self> {
        let root = root.into();
        for area in BlobArea::ALL {
            let dir = root.join(layout.container(area));
            fs::create_dir_all(&dir).await.map_err(|e| {
                BlobError::Config(format!(
                    "Failed to create blob area {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        info!(root = %root.display(), "Opened local blob store");
        Ok(Self { root, layout })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn area_dir(&self, area: BlobArea) -> PathBuf {
        self.root.join(self.layout.container(area))
    }

    fn blob_path(&self, area: BlobArea, name: &str) -> BlobResult<PathBuf> {
        validate_name(name)?;
        Ok(self.area_dir(area).join(name))
    }

    fn sidecar_path(&self, area: BlobArea, name: &str) -> BlobResult<PathBuf> {
        validate_name(name)?;
        Ok(self
            .area_dir(area)
            .join(META_DIR)
            .join(format!("{}.json", name)))
    }

    /// Missing and undecodable sidecars both read as empty, so one bad
    /// sidecar cannot make its area unlistable. The next move rewrites it.
    async fn read_sidecar(&self, path: &Path) -> BlobResult<Sidecar> {
        match fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(sidecar) => Ok(sidecar),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring corrupt sidecar");
                    Ok(Sidecar::default())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Sidecar::default()),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn write_sidecar(&self, path: &Path, sidecar: &Sidecar) -> BlobResult<()> {
        let bytes = serde_json::to_vec_pretty(sidecar)
            .map_err(|e| BlobError::Metadata(e.to_string()))?;
        write_file(path, &bytes).await
    }

    async fn describe(&self, area: BlobArea, name: &str, path: &Path) -> BlobResult<BlobItem> {
        let file_meta = fs::metadata(path).await?;
        let sidecar = self.read_sidecar(&self.sidecar_path(area, name)?).await?;
        Ok(BlobItem {
            name: name.to_string(),
            content_type: sidecar
                .content_type
                .unwrap_or_else(|| guess_content_type(name)),
            size_bytes: file_meta.len(),
            created_at: created_at(&file_meta),
            metadata: sidecar.metadata,
        })
    }
}

async fn ensure_parent_dir(path: &Path) -> BlobResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn write_file(path: &Path, bytes: &[u8]) -> BlobResult<()> {
    ensure_parent_dir(path).await?;
    let mut file = fs::File::create(path).await.map_err(|e| {
        BlobError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
    })?;
    file.write_all(bytes).await.map_err(|e| {
        BlobError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
    })?;
    file.sync_all().await.map_err(|e| {
        BlobError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
    })?;
    Ok(())
}

fn created_at(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified()
        .or_else(|_| meta.created())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

/// Relative blob names of every file under `dir`, skipping sidecars.
fn walk_names(dir: &Path) -> BlobResult<Vec<String>> {
    let mut names = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == META_DIR));

    for entry in walker {
        let entry = entry.map_err(|e| BlobError::ListFailed(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if validate_name(&name).is_err() {
            warn!(name = %name, "Skipping blob with unusable name");
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn list(&self, area: BlobArea) -> BlobResult<Vec<BlobItem>> {
        let dir = self.area_dir(area);
        let names = tokio::task::spawn_blocking(move || walk_names(&dir))
            .await
            .map_err(|e| BlobError::ListFailed(e.to_string()))??;

        let mut items = Vec::with_capacity(names.len());
        for name in names {
            let path = self.blob_path(area, &name)?;
            match self.describe(area, &name, &path).await {
                Ok(item) => items.push(item),
                // Raced with a concurrent move
                Err(BlobError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(area = %area, name = %name, error = %e, "Skipping unreadable blob"),
            }
        }
        items.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });

        debug!(area = %area, count = items.len(), "Listed blobs");
        Ok(items)
    }

    async fn download(&self, area: BlobArea, name: &str) -> BlobResult<BlobObject> {
        let path = self.blob_path(area, name)?;
        let start = Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BlobError::not_found(area, name));
        }

        let bytes = fs::read(&path).await.map_err(|e| {
            BlobError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        let item = self.describe(area, name, &path).await?;

        debug!(
            area = %area,
            name,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Downloaded blob"
        );
        Ok(BlobObject { item, bytes })
    }

    async fn upload(
        &self,
        area: BlobArea,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: BlobMetadata,
    ) -> BlobResult<()> {
        let path = self.blob_path(area, name)?;
        let start = Instant::now();

        write_file(&path, &bytes).await?;
        let sidecar = Sidecar {
            content_type: Some(content_type.to_string()),
            metadata,
        };
        self.write_sidecar(&self.sidecar_path(area, name)?, &sidecar)
            .await?;

        info!(
            area = %area,
            name,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Uploaded blob"
        );
        Ok(())
    }

    async fn move_blob(
        &self,
        from: BlobArea,
        to: BlobArea,
        name: &str,
        extra_metadata: BlobMetadata,
    ) -> BlobResult<()> {
        let src = self.blob_path(from, name)?;
        let dst = self.blob_path(to, name)?;
        let src_meta = self.sidecar_path(from, name)?;
        let dst_meta = self.sidecar_path(to, name)?;

        if !fs::try_exists(&src).await? {
            if fs::try_exists(&dst).await? {
                debug!(from = %from, to = %to, name, "Blob already moved");
                return Ok(());
            }
            return Err(BlobError::not_found(from, name));
        }

        let mut sidecar = self.read_sidecar(&src_meta).await?;
        sidecar.metadata.extend(extra_metadata);
        if sidecar.content_type.is_none() {
            sidecar.content_type = Some(guess_content_type(name));
        }
        self.write_sidecar(&dst_meta, &sidecar)
            .await
            .map_err(|e| BlobError::MoveFailed(format!("{}: {}", name, e)))?;

        ensure_parent_dir(&dst).await?;
        if let Err(e) = fs::rename(&src, &dst).await {
            // Leave the source untouched and drop the half-written sidecar
            let _ = fs::remove_file(&dst_meta).await;
            return Err(BlobError::MoveFailed(format!(
                "Failed to move {} from {} to {}: {}",
                name, from, to, e
            )));
        }

        match fs::remove_file(&src_meta).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %src_meta.display(), error = %e, "Failed to remove stale sidecar"),
        }

        info!(from = %from, to = %to, name, "Moved blob");
        Ok(())
    }

    async fn exists(&self, area: BlobArea, name: &str) -> BlobResult<bool> {
        let path = self.blob_path(area, name)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
