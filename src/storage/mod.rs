//! The storage capability interface: what a pluggable object-store driver
//! must (and may) implement, and the metadata shape the rest of the server
//! builds listings and replies from.
//!
//! Grounded on the storage-backend trait shape used by production FTP
//! servers in the Rust ecosystem (mandatory metadata/read/write/delete/list
//! plus optional capability bits, rather than deep inheritance).
pub mod memory;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Backend supports `APPE` (`CreateAppend`/`WriteAppend`/`CommitAppend`).
pub const FEATURE_APPEND: u32 = 0b0000_0001;
/// Backend supports `RNFR`/`RNTO` (move/rename).
pub const FEATURE_MOVE: u32 = 0b0000_0010;
/// Backend supports `MKD`/`XMKD` (directory creation).
pub const FEATURE_MAKE_DIR: u32 = 0b0000_0100;

/// Object kind, as reported by the driver. Covers the two kinds the listing
/// formatter and dispatcher distinguish; a symlink-aware driver can still
/// report itself as a file or directory per its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Directory,
}

/// Metadata the core needs about a storage object: enough to answer SIZE,
/// MDTM, STAT and to render one `LIST` line.
#[derive(Debug, Clone)]
pub struct ObjectMetadata {
    pub kind: ObjectKind,
    pub len: u64,
    pub modified: DateTime<Utc>,
}

impl ObjectMetadata {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, ObjectKind::Directory)
    }
}

/// A single storage object: its full virtual path plus its metadata.
#[derive(Debug, Clone)]
pub struct Object {
    pub path: PathBuf,
    pub metadata: ObjectMetadata,
}

impl Object {
    pub fn file_name(&self) -> String {
        self.path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

type AsyncReader = Box<dyn AsyncRead + Send + Unpin>;

/// The driver contract every object-store backend implements. Mandatory
/// operations (`stat`/`read`/`write`/`delete`/`list`) must exist; optional
/// capabilities are gated behind `supported_features` and surface as 502
/// when absent instead of a trait method call failing.
#[async_trait]
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Bitmask of `FEATURE_*` constants this backend implements.
    fn supported_features(&self) -> u32 {
        0
    }

    fn supports(&self, feature: u32) -> bool {
        self.supported_features() & feature == feature
    }

    async fn stat(&self, path: &Path) -> Result<ObjectMetadata>;

    /// Opens the object for reading starting at `offset` (for `REST`).
    async fn read(&self, path: &Path, offset: u64) -> Result<AsyncReader>;

    /// Writes `input` to `path`, overwriting any existing object.
    async fn write(&self, path: &Path, input: AsyncReader) -> Result<u64>;

    /// Removes the object at `path` unconditionally, whatever its kind.
    /// Backs both `DELE` and `RMD`/`XRMD` — there is no separate
    /// directory-removal operation.
    async fn delete(&self, path: &Path) -> Result<()>;

    async fn list(&self, path: &Path) -> Result<Vec<Object>>;

    /// Appends `input` to `path`, creating it if absent. Only called when
    /// `supports(FEATURE_APPEND)`.
    async fn append(&self, _path: &Path, _input: AsyncReader) -> Result<u64> {
        Err(crate::error::Error::NotImplemented("APPE"))
    }

    /// Only called when `supports(FEATURE_MOVE)`.
    async fn rename(&self, _from: &Path, _to: &Path) -> Result<()> {
        Err(crate::error::Error::NotImplemented("RNTO"))
    }

    /// Only called when `supports(FEATURE_MAKE_DIR)`.
    async fn make_dir(&self, _path: &Path) -> Result<()> {
        Err(crate::error::Error::NotImplemented("MKD"))
    }
}
