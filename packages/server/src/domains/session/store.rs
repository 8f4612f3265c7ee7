use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tokio::fs;

/// One persisted artifact, named relative to the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionFile {
    pub file: String,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to read session data at {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Session storage location. The layout inside it belongs to the messaging
/// library; this type only enumerates and reads it.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if needed. Idempotent.
    pub async fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Read every file under the storage root.
    ///
    /// Returns `None` when the root cannot be listed or holds no files, which
    /// is the normal state before the first successful pairing. Below the
    /// root, any single unreadable entry fails the whole read.
    pub async fn read_all(&self) -> Result<Option<Vec<SessionFile>>, SessionError> {
        let mut pending = vec![self.root.clone()];
        let mut paths = Vec::new();
        let mut visited = HashSet::new();

        while let Some(dir) = pending.pop() {
            // Linked directories can point back up the tree
            let real = fs::canonicalize(&dir).await.unwrap_or_else(|_| dir.clone());
            if !visited.insert(real) {
                continue;
            }

            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if dir == self.root => {
                    tracing::debug!(root = %self.root.display(), error = %e, "Session root not listable");
                    return Ok(None);
                }
                Err(source) => return Err(SessionError::Unreadable { path: dir, source }),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|source| SessionError::Unreadable {
                    path: dir.clone(),
                    source,
                })?
            {
                let path = entry.path();
                // Follows symlinks, unlike `DirEntry::file_type`
                let metadata = fs::metadata(&path)
                    .await
                    .map_err(|source| SessionError::Unreadable {
                        path: path.clone(),
                        source,
                    })?;

                if metadata.is_dir() {
                    pending.push(path);
                } else {
                    paths.push(path);
                }
            }
        }

        if paths.is_empty() {
            return Ok(None);
        }
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let bytes = fs::read(&path)
                .await
                .map_err(|source| SessionError::Unreadable {
                    path: path.clone(),
                    source,
                })?;

            files.push(SessionFile {
                file: self.relative_name(&path),
                content: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        tracing::debug!(count = files.len(), root = %self.root.display(), "Read session files");
        Ok(Some(files))
    }

    fn relative_name(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_directory_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path().join("never-created"));

        assert_eq!(store.read_all().await.unwrap(), None);
    }

    #[tokio::test]
    async fn directory_without_files_reads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("session/Default")).unwrap();
        let store = SessionStore::new(tmp.path());

        assert_eq!(store.read_all().await.unwrap(), None);
    }

    #[tokio::test]
    async fn nested_files_use_slash_separated_names_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("session/Default")).unwrap();
        std::fs::write(tmp.path().join("session/Default/Cookies"), "cookie-jar").unwrap();
        std::fs::write(tmp.path().join("creds.json"), r#"{"me":"1555"}"#).unwrap();

        let files = SessionStore::new(tmp.path()).read_all().await.unwrap().unwrap();

        assert_eq!(
            files,
            vec![
                SessionFile {
                    file: "creds.json".into(),
                    content: r#"{"me":"1555"}"#.into(),
                },
                SessionFile {
                    file: "session/Default/Cookies".into(),
                    content: "cookie-jar".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn binary_content_is_read_lossily() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blob"), [0x66, 0x6f, 0xff, 0x6f]).unwrap();

        let files = SessionStore::new(tmp.path()).read_all().await.unwrap().unwrap();
        assert_eq!(files[0].content, "fo\u{FFFD}o");
    }

    #[tokio::test]
    async fn root_that_cannot_be_listed_reads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let not_a_dir = tmp.path().join("plain-file");
        std::fs::write(&not_a_dir, "x").unwrap();

        assert_eq!(SessionStore::new(&not_a_dir).read_all().await.unwrap(), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn linked_directories_are_walked() {
        let tmp = tempfile::tempdir().unwrap();
        let outside = tmp.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("Local State"), "state").unwrap();
        let root = tmp.path().join("session");
        std::fs::create_dir_all(&root).unwrap();
        std::os::unix::fs::symlink(&outside, root.join("profile")).unwrap();

        let files = SessionStore::new(&root).read_all().await.unwrap().unwrap();

        assert_eq!(
            files,
            vec![SessionFile {
                file: "profile/Local State".into(),
                content: "state".into(),
            }]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn link_back_to_an_ancestor_is_not_followed_twice() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("a")).unwrap();
        std::fs::write(tmp.path().join("a/creds.json"), "{}").unwrap();
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("a/loop")).unwrap();

        let files = SessionStore::new(tmp.path()).read_all().await.unwrap().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file, "a/creds.json");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unreadable_file_below_the_root_fails_the_read() {
        let tmp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(tmp.path().join("gone"), tmp.path().join("dangling")).unwrap();

        let err = SessionStore::new(tmp.path()).read_all().await.unwrap_err();
        assert!(err.to_string().contains("dangling"));
    }

    #[tokio::test]
    async fn ensure_exists_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SessionStore::new(tmp.path().join("a/b"));

        store.ensure_exists().await.unwrap();
        store.ensure_exists().await.unwrap();
        assert!(store.root().is_dir());
    }
}
