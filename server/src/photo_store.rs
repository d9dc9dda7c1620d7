use std::path::PathBuf;

use base64::Engine;

/// Stores uploaded images. Failures are reported, never raised: callers
/// degrade to an empty image path.
#[async_trait::async_trait]
pub trait PhotoStore: Send + Sync {
    async fn upload_photo(&self, content: &[u8], category: &str, file_name: &str) -> bool;
}

/// Writes images under `{root}/images/{category}/`, served at `/images`.
#[derive(Clone, Debug)]
pub struct DiskPhotoStore {
    root: PathBuf,
}

impl DiskPhotoStore {
    pub fn new(fs_root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: fs_root_dir.into(),
        }
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }
}

#[async_trait::async_trait]
impl PhotoStore for DiskPhotoStore {
    async fn upload_photo(&self, content: &[u8], category: &str, file_name: &str) -> bool {
        if !valid_segment(category) || !valid_segment(file_name) {
            log::warn!("Rejected photo path {category}/{file_name}");
            return false;
        }
        let dir = self.images_dir().join(category);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            log::error!("Failed to create photo dir {dir:?}: {e}");
            return false;
        }
        let path = dir.join(file_name);
        match tokio::fs::write(&path, content).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to write photo {path:?}: {e}");
                false
            }
        }
    }
}

fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
}

pub fn photo_path(category: &str, file_name: &str) -> String {
    format!("~/images/{category}/{file_name}")
}

pub fn random_file_name() -> String {
    format!("{:032x}.jpg", rand::random::<u128>())
}

/// Uploads `content` under a fresh name; empty string on failure.
pub async fn upload_bytes(store: &dyn PhotoStore, content: &[u8], category: &str) -> String {
    let file_name = random_file_name();
    if store.upload_photo(content, category, &file_name).await {
        photo_path(category, &file_name)
    } else {
        String::new()
    }
}

/// Decodes a base64 image (optionally a `data:` URI) and uploads it.
/// Missing input, bad encoding or a failed upload all yield "".
pub async fn upload_base64(
    store: &dyn PhotoStore,
    encoded: Option<&str>,
    category: &str,
) -> String {
    let Some(encoded) = encoded.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let payload = match encoded.split_once(',') {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    match base64::engine::general_purpose::STANDARD.decode(payload) {
        Ok(content) => upload_bytes(store, &content, category).await,
        Err(e) => {
            log::warn!("Ignoring undecodable {category} image: {e}");
            String::new()
        }
    }
}
