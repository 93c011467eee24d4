//! Reference storage backend: an in-process object store backed by a
//! `HashMap`, supporting every optional capability. Used as the default
//! driver and by the test suite; mirrors the `memory://` scheme the original
//! implementation registers for the same purpose.
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;

use super::{ObjectKind, ObjectMetadata, StorageBackend, FEATURE_APPEND, FEATURE_MAKE_DIR, FEATURE_MOVE};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
enum Entry {
    File { data: Vec<u8>, modified: chrono::DateTime<Utc> },
    Dir { modified: chrono::DateTime<Utc> },
}

/// An in-memory object store, rooted at `/`. Every path is normalized before
/// lookup so `a/./b/../c` and `a/c` address the same entry.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl MemoryBackend {
    pub fn new() -> MemoryBackend {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), Entry::Dir { modified: Utc::now() });
        MemoryBackend {
            entries: Mutex::new(entries),
        }
    }

    fn parent_must_exist<'a>(entries: &HashMap<PathBuf, Entry>, path: &'a Path) -> Result<()> {
        let parent = path.parent().unwrap_or(Path::new("/"));
        match entries.get(parent) {
            Some(Entry::Dir { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(Error::storage_other(format!("{}: not a directory", parent.display()))),
            None => Err(Error::StorageNotFound(parent.display().to_string())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> MemoryBackend {
        MemoryBackend::new()
    }
}

fn to_metadata(entry: &Entry) -> ObjectMetadata {
    match entry {
        Entry::File { data, modified } => ObjectMetadata {
            kind: ObjectKind::File,
            len: data.len() as u64,
            modified: *modified,
        },
        Entry::Dir { modified } => ObjectMetadata {
            kind: ObjectKind::Directory,
            len: 0,
            modified: *modified,
        },
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn supported_features(&self) -> u32 {
        FEATURE_APPEND | FEATURE_MOVE | FEATURE_MAKE_DIR
    }

    async fn stat(&self, path: &Path) -> Result<ObjectMetadata> {
        let entries = self.entries.lock().await;
        entries
            .get(path)
            .map(to_metadata)
            .ok_or_else(|| Error::StorageNotFound(path.display().to_string()))
    }

    async fn read(&self, path: &Path, offset: u64) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
        let entries = self.entries.lock().await;
        match entries.get(path) {
            Some(Entry::File { data, .. }) => {
                let start = (offset as usize).min(data.len());
                Ok(Box::new(Cursor::new(data[start..].to_vec())))
            }
            Some(Entry::Dir { .. }) => Err(Error::storage_other(format!("{}: is a directory", path.display()))),
            None => Err(Error::StorageNotFound(path.display().to_string())),
        }
    }

    async fn write(&self, path: &Path, mut input: Box<dyn tokio::io::AsyncRead + Send + Unpin>) -> Result<u64> {
        let mut buf = Vec::new();
        input.read_to_end(&mut buf).await.map_err(Error::Io)?;
        let len = buf.len() as u64;
        let mut entries = self.entries.lock().await;
        Self::parent_must_exist(&entries, path)?;
        entries.insert(path.to_path_buf(), Entry::File { data: buf, modified: Utc::now() });
        Ok(len)
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.remove(path).is_none() {
            return Err(Error::StorageNotFound(path.display().to_string()));
        }
        Ok(())
    }

    async fn list(&self, path: &Path) -> Result<Vec<super::Object>> {
        let entries = self.entries.lock().await;
        match entries.get(path) {
            Some(Entry::Dir { .. }) => {}
            Some(Entry::File { .. }) => return Err(Error::storage_other(format!("{}: not a directory", path.display()))),
            None => return Err(Error::StorageNotFound(path.display().to_string())),
        }
        let mut out = Vec::new();
        for (candidate, entry) in entries.iter() {
            if candidate == path {
                continue;
            }
            if candidate.parent() == Some(path) {
                out.push(super::Object {
                    path: candidate.clone(),
                    metadata: to_metadata(entry),
                });
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    async fn append(&self, path: &Path, mut input: Box<dyn tokio::io::AsyncRead + Send + Unpin>) -> Result<u64> {
        let mut buf = Vec::new();
        input.read_to_end(&mut buf).await.map_err(Error::Io)?;
        let mut entries = self.entries.lock().await;
        Self::parent_must_exist(&entries, path)?;
        let total = match entries.remove(path) {
            Some(Entry::File { mut data, .. }) => {
                data.extend_from_slice(&buf);
                let len = data.len() as u64;
                entries.insert(path.to_path_buf(), Entry::File { data, modified: Utc::now() });
                len
            }
            Some(dir @ Entry::Dir { .. }) => {
                entries.insert(path.to_path_buf(), dir);
                return Err(Error::storage_other(format!("{}: is a directory", path.display())));
            }
            None => {
                let len = buf.len() as u64;
                entries.insert(path.to_path_buf(), Entry::File { data: buf, modified: Utc::now() });
                len
            }
        };
        Ok(total)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(from).ok_or_else(|| Error::StorageNotFound(from.display().to_string()))?;
        Self::parent_must_exist(&entries, to)?;
        entries.insert(to.to_path_buf(), entry);
        Ok(())
    }

    async fn make_dir(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(path) {
            return Err(Error::storage_other(format!("{}: already exists", path.display())));
        }
        Self::parent_must_exist(&entries, path)?;
        entries.insert(path.to_path_buf(), Entry::Dir { modified: Utc::now() });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as StdCursor;

    fn reader(bytes: &[u8]) -> Box<dyn tokio::io::AsyncRead + Send + Unpin> {
        Box::new(StdCursor::new(bytes.to_vec()))
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let backend = MemoryBackend::new();
        backend.write(Path::new("/a.txt"), reader(b"hello")).await.unwrap();
        let mut r = backend.read(Path::new("/a.txt"), 0).await.unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello");
    }

    #[tokio::test]
    async fn read_respects_restart_offset() {
        let backend = MemoryBackend::new();
        backend.write(Path::new("/a.txt"), reader(b"0123456789")).await.unwrap();
        let mut r = backend.read(Path::new("/a.txt"), 5).await.unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"56789");
    }

    #[tokio::test]
    async fn stat_missing_object_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.stat(Path::new("/missing")).await.unwrap_err();
        assert!(matches!(err, Error::StorageNotFound(_)));
    }

    #[tokio::test]
    async fn mkdir_then_list_shows_only_direct_children() {
        let backend = MemoryBackend::new();
        backend.make_dir(Path::new("/dir")).await.unwrap();
        backend.write(Path::new("/dir/a.txt"), reader(b"x")).await.unwrap();
        backend.write(Path::new("/dir/sub/b.txt"), reader(b"y")).await.unwrap_err();
        let listing = backend.list(Path::new("/dir")).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].file_name(), "a.txt");
    }

    #[tokio::test]
    async fn delete_removes_a_directory_unconditionally() {
        let backend = MemoryBackend::new();
        backend.make_dir(Path::new("/dir")).await.unwrap();
        backend.write(Path::new("/dir/a.txt"), reader(b"x")).await.unwrap();
        backend.delete(Path::new("/dir")).await.unwrap();
        assert!(backend.stat(Path::new("/dir")).await.is_err());
    }

    #[tokio::test]
    async fn delete_missing_path_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.delete(Path::new("/missing")).await.unwrap_err();
        assert!(matches!(err, Error::StorageNotFound(_)));
    }

    #[tokio::test]
    async fn rename_moves_entry_to_new_path() {
        let backend = MemoryBackend::new();
        backend.write(Path::new("/a.txt"), reader(b"x")).await.unwrap();
        backend.rename(Path::new("/a.txt"), Path::new("/b.txt")).await.unwrap();
        assert!(backend.stat(Path::new("/a.txt")).await.is_err());
        assert!(backend.stat(Path::new("/b.txt")).await.is_ok());
    }

    #[tokio::test]
    async fn append_creates_then_extends() {
        let backend = MemoryBackend::new();
        backend.append(Path::new("/log.txt"), reader(b"a")).await.unwrap();
        backend.append(Path::new("/log.txt"), reader(b"b")).await.unwrap();
        let mut r = backend.read(Path::new("/log.txt"), 0).await.unwrap();
        let mut buf = Vec::new();
        r.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"ab");
    }
}
