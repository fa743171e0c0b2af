// Filesystem interface abstraction
//
// The operation set the FUSE adapter drives. Read-side operations must be
// implemented; every mutating operation defaults to a read-only rejection so
// an implementation cannot accidentally accept a write.

use crate::fs::error::{FsError, FsResult};
use chrono::{DateTime, Utc};

/// File type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    RegularFile,
    Directory,
}

/// File attributes structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttr {
    pub kind: FileType,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub mode: u32, // Permission bits
    pub nlinks: u32,
}

/// Directory entry structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileType,
}

/// Timestamp update (utimens). Mode, owner and size changes go through
/// chmod, chown and truncate.
#[derive(Debug, Default)]
pub struct SetAttr {
    pub atime: Option<DateTime<Utc>>,
    pub mtime: Option<DateTime<Utc>>,
}

/// Filesystem statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatFs {
    pub blocks: u64,  // Total blocks
    pub bfree: u64,   // Free blocks
    pub bavail: u64,  // Available blocks for unprivileged users
    pub files: u64,   // Total inodes
    pub ffree: u64,   // Free inodes
    pub bsize: u32,   // Block size
    pub namelen: u32, // Maximum filename length
}

fn read_only<T>(op: &str, path: &str) -> FsResult<T> {
    Err(FsError::ReadOnly(format!("{} {}", op, path)))
}

/// Unified read-only filesystem interface
#[async_trait::async_trait]
pub trait FilesystemInterface: Send + Sync {
    // Directory operations
    /// Children of a directory, preceded by `.` and `..`.
    async fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>>;
    async fn open_dir(&self, path: &str) -> FsResult<u64>;

    // Metadata operations
    async fn get_attr(&self, path: &str) -> FsResult<FileAttr>;

    // File operations
    async fn open(&self, path: &str, flags: i32) -> FsResult<u64>;
    async fn read_file(&self, path: &str, offset: u64, size: u32) -> FsResult<Vec<u8>>;

    async fn release(&self, _path: &str, _fh: u64) -> FsResult<()> {
        Ok(())
    }

    async fn flush(&self, _path: &str, _fh: u64) -> FsResult<()> {
        Ok(())
    }

    async fn fsync(&self, _path: &str, _fh: u64, _datasync: bool) -> FsResult<()> {
        Ok(())
    }

    /// Single-tenant projection: every access check passes.
    async fn access(&self, _path: &str, _mask: i32) -> FsResult<()> {
        Ok(())
    }

    // Mutating operations: always rejected
    async fn create_file(&self, path: &str, _mode: u32) -> FsResult<FileAttr> {
        read_only("create", path)
    }

    async fn write_file(&self, path: &str, _offset: u64, _data: &[u8]) -> FsResult<u32> {
        read_only("write", path)
    }

    async fn truncate(&self, path: &str, _size: u64) -> FsResult<()> {
        read_only("truncate", path)
    }

    async fn delete_file(&self, path: &str) -> FsResult<()> {
        read_only("unlink", path)
    }

    async fn rename(&self, from: &str, _to: &str) -> FsResult<()> {
        read_only("rename", from)
    }

    async fn create_dir(&self, path: &str, _mode: u32) -> FsResult<FileAttr> {
        read_only("mkdir", path)
    }

    async fn remove_dir(&self, path: &str) -> FsResult<()> {
        read_only("rmdir", path)
    }

    async fn create_node(&self, path: &str, _mode: u32) -> FsResult<FileAttr> {
        read_only("mknod", path)
    }

    async fn set_attr(&self, path: &str, _attr: SetAttr) -> FsResult<FileAttr> {
        read_only("setattr", path)
    }

    async fn chmod(&self, path: &str, _mode: u32) -> FsResult<()> {
        read_only("chmod", path)
    }

    async fn chown(&self, path: &str, _uid: u32, _gid: u32) -> FsResult<()> {
        read_only("chown", path)
    }

    async fn create_symlink(&self, _target: &str, link: &str) -> FsResult<FileAttr> {
        read_only("symlink", link)
    }

    async fn create_link(&self, _target: &str, link: &str) -> FsResult<FileAttr> {
        read_only("link", link)
    }

    async fn setxattr(&self, path: &str, _name: &str, _value: &[u8]) -> FsResult<()> {
        read_only("setxattr", path)
    }

    async fn removexattr(&self, path: &str, _name: &str) -> FsResult<()> {
        read_only("removexattr", path)
    }

    // Extended attributes and links (nothing to report)
    async fn getxattr(&self, path: &str, name: &str) -> FsResult<Vec<u8>> {
        Err(FsError::Unsupported(format!("Extended attributes not supported: {}:{}", path, name)))
    }

    async fn listxattr(&self, _path: &str) -> FsResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn read_symlink(&self, path: &str) -> FsResult<String> {
        Err(FsError::NotFound(path.to_string()))
    }

    // Filesystem information
    async fn statfs(&self) -> FsResult<StatFs>;
}
