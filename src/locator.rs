use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{BlobStore, ObjectMeta};

lazy_static! {
    static ref WORKBOOK_EXT_REGEX: Regex = Regex::new(r"(?i)\.(xlsx|xls)$").unwrap();
}

/// Characters that may follow the user name in a file name before the
/// extension, e.g. `홍길동_2024.xlsx` or `홍길동 (1).xlsx`.
const NAME_SEPARATORS: [char; 6] = [' ', '_', '-', '(', '.', '['];

/// One workbook in the store that belongs to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    pub full_path: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<ObjectMeta> for FileDescriptor {
    fn from(meta: ObjectMeta) -> Self {
        FileDescriptor {
            name: base_name(&meta.full_path).to_string(),
            full_path: meta.full_path,
            size: meta.size,
            content_type: meta.content_type,
            updated_at: meta.updated_at,
        }
    }
}

fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Check whether a file name is a workbook belonging to `user_name`
///
/// The stem must be the user name, optionally followed by a separator and
/// anything else; the extension must be `.xlsx` or `.xls` in any case.
///
/// # Arguments
/// * `file_name` - Base name of the object (no folder part)
/// * `user_name` - Name of the user the workbook should belong to
///
/// # Returns
/// * `bool` - Whether the file should be offered as a candidate
pub fn matches_user(file_name: &str, user_name: &str) -> bool {
    let user = user_name.trim();
    if user.is_empty() {
        return false;
    }

    let file_name = file_name.trim();
    let Some(ext) = WORKBOOK_EXT_REGEX.find(file_name) else {
        return false;
    };
    let stem = file_name[..ext.start()].trim_end();

    match stem.strip_prefix(user) {
        Some("") => true,
        Some(rest) => rest.starts_with(NAME_SEPARATORS),
        None => false,
    }
}

/// Locate a user's candidate workbooks inside a semester folder
///
/// Lists the folder once and keeps the objects whose name matches the user.
/// A missing folder or no match gives an empty list; it is up to the caller
/// to turn that into a "not found".
///
/// # Arguments
/// * `store` - Blob store to list
/// * `folder_path` - Listing prefix of the semester folder
/// * `user_name` - Name of the user
///
/// # Returns
/// * `Result<Vec<FileDescriptor>, StoreError>` - Matches in listing order, or
///   the store's error if it could not be listed
pub async fn locate(
    store: &dyn BlobStore,
    folder_path: &str,
    user_name: &str,
) -> Result<Vec<FileDescriptor>, StoreError> {
    let objects = store.list(folder_path).await?;
    let files: Vec<FileDescriptor> = objects
        .into_iter()
        .filter(|meta| matches_user(base_name(&meta.full_path), user_name))
        .map(FileDescriptor::from)
        .collect();

    log::debug!(
        "located {} workbook(s) for `{}` under `{}` ({})",
        files.len(),
        user_name,
        folder_path,
        store.backend_tag()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_matches_exact_and_extension_variants() {
        assert!(matches_user("홍길동.xlsx", "홍길동"));
        assert!(matches_user("홍길동.xls", "홍길동"));
        assert!(matches_user("홍길동.XLSX", "홍길동"));
        assert!(matches_user(" 홍길동.xlsx ", " 홍길동 "));
    }

    #[test]
    fn test_matches_partial_name_variants() {
        assert!(matches_user("홍길동_2024 하반기.xlsx", "홍길동"));
        assert!(matches_user("홍길동 (1).xlsx", "홍길동"));
        assert!(matches_user("홍길동-식대.xls", "홍길동"));
        assert!(matches_user("홍길동[최종].xlsx", "홍길동"));
        assert!(matches_user("홍길동.backup.xlsx", "홍길동"));
    }

    #[test]
    fn test_rejects_other_names_and_formats() {
        assert!(!matches_user("홍길동순.xlsx", "홍길동"));
        assert!(!matches_user("김홍길동.xlsx", "홍길동"));
        assert!(!matches_user("홍길동.csv", "홍길동"));
        assert!(!matches_user("홍길동.xlsx.bak", "홍길동"));
        assert!(!matches_user("홍길동.xlsx", ""));
        assert!(!matches_user("Kim.xlsx", "kim"));
    }

    #[tokio::test]
    async fn test_locate_keeps_listing_order() {
        let store = MemoryStore::new();
        store.put("2024 하반기/홍길동.xlsx", vec![1u8]);
        store.put("2024 하반기/이몽룡.xlsx", vec![2u8]);
        store.put("2024 하반기/홍길동.xls", vec![3u8, 4]);

        let files = locate(&store, "2024 하반기/", "홍길동").await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["홍길동.xlsx", "홍길동.xls"]);
        assert_eq!(files[1].full_path, "2024 하반기/홍길동.xls");
        assert_eq!(files[1].size, 2);
    }

    #[tokio::test]
    async fn test_locate_missing_folder_is_empty() {
        let store = MemoryStore::new();
        let files = locate(&store, "2030 상반기/", "홍길동").await.unwrap();
        assert!(files.is_empty());
    }
}
