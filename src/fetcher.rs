use crate::error::StoreError;
use crate::store::BlobStore;

/// Download one located workbook fully into memory.
///
/// `StoreError::NotFound` means the object disappeared since it was listed;
/// `StoreError::Unavailable` is a transient failure. Neither is retried here.
pub async fn fetch(store: &dyn BlobStore, full_path: &str) -> Result<Vec<u8>, StoreError> {
    let bytes = store.get(full_path).await?;
    log::debug!("fetched `{}` ({} bytes)", full_path, bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_fetch_returns_bytes() {
        let store = MemoryStore::new();
        store.put("a/b.xlsx", b"PK\x03\x04".to_vec());
        assert_eq!(fetch(&store, "a/b.xlsx").await.unwrap(), b"PK\x03\x04");
    }

    #[tokio::test]
    async fn test_fetch_after_delete_is_not_found() {
        let store = MemoryStore::new();
        store.put("a/b.xlsx", vec![1u8]);
        store.remove("a/b.xlsx");
        assert_eq!(
            fetch(&store, "a/b.xlsx").await,
            Err(StoreError::NotFound("a/b.xlsx".to_string()))
        );
    }
}
