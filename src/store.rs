//! Blob store boundary.
//!
//! The pipeline only needs two calls from whatever hosts the workbooks:
//! list the objects directly under a folder prefix, and download one object.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use crate::error::StoreError;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_CONTENT_TYPE: &str = "application/vnd.ms-excel";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata for one object in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub full_path: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Objects directly under `prefix`, in the store's listing order.
    ///
    /// A prefix with nothing under it is an empty listing, not an error.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;

    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Guess a content type from the file extension.
pub fn content_type_for(path: &str) -> &'static str {
    let lower = path.to_lowercase();
    if lower.ends_with(".xlsx") {
        XLSX_CONTENT_TYPE
    } else if lower.ends_with(".xls") {
        XLS_CONTENT_TYPE
    } else {
        DEFAULT_CONTENT_TYPE
    }
}

/// Store backed by a directory tree on the local disk.
///
/// Object paths are `/`-separated and relative to the root. Listings are
/// non-recursive and sorted by name.
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalDirStore {
    fn backend_tag(&self) -> &'static str {
        "localdir"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let Some(dir) = self.resolve(prefix) else {
            return Ok(Vec::new());
        };

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if matches!(e.kind(), IoErrorKind::NotFound | IoErrorKind::NotADirectory) => {
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::Unavailable(format!(
                    "list `{}` failed: {e}",
                    dir.display()
                )));
            }
        };

        let base = prefix.trim_matches('/');
        let mut objects = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(StoreError::Unavailable(format!("list failed: {e}"))),
            };
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| StoreError::Unavailable(format!("stat failed: {e}")))?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let full_path = if base.is_empty() {
                name
            } else {
                format!("{base}/{name}")
            };
            let updated_at = metadata.modified().ok().map(DateTime::<Utc>::from);

            objects.push(ObjectMeta {
                content_type: Some(content_type_for(&full_path).to_string()),
                full_path,
                size: metadata.len(),
                updated_at,
            });
        }

        objects.sort_by(|a, b| a.full_path.cmp(&b.full_path));
        Ok(objects)
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let file = self
            .resolve(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        match tokio::fs::read(&file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(e) => Err(StoreError::Unavailable(format!("read `{path}` failed: {e}"))),
        }
    }
}

/// In-memory store that keeps insertion order.
///
/// Objects can be marked unavailable to simulate a flaky backend.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    unavailable: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an object. Replacing keeps the original position.
    pub fn put(&self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let path = path.into();
        let bytes = bytes.into();
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        match objects.iter_mut().find(|(p, _)| *p == path) {
            Some(slot) => slot.1 = bytes,
            None => objects.push((path, bytes)),
        }
    }

    pub fn remove(&self, path: &str) -> bool {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let before = objects.len();
        objects.retain(|(p, _)| p != path);
        objects.len() != before
    }

    pub fn mark_unavailable(&self, path: impl Into<String>) {
        self.unavailable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.into());
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(path, bytes)| ObjectMeta {
                full_path: path.clone(),
                size: bytes.len() as u64,
                content_type: Some(content_type_for(path).to_string()),
                updated_at: None,
            })
            .collect())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if self
            .unavailable
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
        {
            return Err(StoreError::Unavailable(format!("`{path}` timed out")));
        }
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_lists_direct_children_in_insertion_order() {
        let store = MemoryStore::new();
        store.put("2024 하반기/b.xlsx", vec![1u8]);
        store.put("2024 하반기/a.xlsx", vec![2u8, 3]);
        store.put("2024 하반기/nested/c.xlsx", vec![4u8]);
        store.put("2024 상반기/a.xlsx", vec![5u8]);

        let listed = store.list("2024 하반기/").await.unwrap();
        let paths: Vec<_> = listed.iter().map(|o| o.full_path.as_str()).collect();
        assert_eq!(paths, vec!["2024 하반기/b.xlsx", "2024 하반기/a.xlsx"]);
        assert_eq!(listed[1].size, 2);
        assert_eq!(listed[1].content_type.as_deref(), Some(XLSX_CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_memory_store_get_errors() {
        let store = MemoryStore::new();
        store.put("x/a.xls", vec![9u8]);
        store.mark_unavailable("x/a.xls");

        assert!(matches!(
            store.get("x/a.xls").await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(
            store.get("x/missing.xls").await,
            Err(StoreError::NotFound("x/missing.xls".to_string()))
        );
    }

    #[tokio::test]
    async fn test_memory_store_put_replaces_in_place() {
        let store = MemoryStore::new();
        store.put("f/a.xlsx", vec![1u8]);
        store.put("f/b.xlsx", vec![2u8]);
        store.put("f/a.xlsx", vec![3u8]);

        let listed = store.list("f/").await.unwrap();
        assert_eq!(listed[0].full_path, "f/a.xlsx");
        assert_eq!(store.get("f/a.xlsx").await.unwrap(), vec![3]);
        assert!(store.remove("f/a.xlsx"));
        assert!(!store.remove("f/a.xlsx"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a/B.XLSX"), XLSX_CONTENT_TYPE);
        assert_eq!(content_type_for("a/b.xls"), XLS_CONTENT_TYPE);
        assert_eq!(content_type_for("a/b.csv"), DEFAULT_CONTENT_TYPE);
    }
}
