// FUSE adapter - bridges sync FUSE callbacks to the async FilesystemInterface
//
// fuser dispatches callbacks one at a time from its session thread. Each
// callback resolves its inode to a path and then hands the request, reply
// included, to a task on the adapter's runtime, so slow remote fetches for
// one request never hold up the others.

use super::interface::{FileAttr, FileType, FilesystemInterface, SetAttr};
use crate::fs::error::FsError;
use crate::fs::path::{join_path, parent_path};
use fuser::{
    FUSE_ROOT_ID, FileType as FuseFileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyIoctl, ReplyOpen, ReplyStatfs, ReplyWrite,
    ReplyXattr, Request, TimeOrNow,
};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::runtime::Runtime;

/// Default TTL for file attributes (1 second)
const ATTR_TTL: Duration = Duration::from_secs(1);

/// Default TTL for directory entries (1 second)
const ENTRY_TTL: Duration = Duration::from_secs(1);

/// Owner reported for every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub fn current() -> Self {
        Self { uid: nix::unistd::getuid().as_raw(), gid: nix::unistd::getgid().as_raw() }
    }
}

/// Manages inode <-> path bidirectional mapping
struct InodeMap {
    inode_to_path: HashMap<u64, String>,
    path_to_inode: HashMap<String, u64>,
    next_inode: u64,
}

impl InodeMap {
    fn new() -> Self {
        let mut map = Self {
            inode_to_path: HashMap::new(),
            path_to_inode: HashMap::new(),
            next_inode: FUSE_ROOT_ID + 1,
        };
        map.insert(FUSE_ROOT_ID, "/".to_string());
        map
    }

    fn insert(&mut self, inode: u64, path: String) {
        self.inode_to_path.insert(inode, path.clone());
        self.path_to_inode.insert(path, inode);
    }

    fn get_or_create(&mut self, path: &str) -> u64 {
        if let Some(&inode) = self.path_to_inode.get(path) {
            return inode;
        }

        let inode = self.next_inode;
        self.next_inode += 1;
        self.insert(inode, path.to_string());
        inode
    }

    fn get_path(&self, inode: u64) -> Option<&str> {
        self.inode_to_path.get(&inode).map(|s| s.as_str())
    }
}

/// Inodes are never released: the tree is a snapshot, so a path keeps its
/// number for the life of the mount.
#[derive(Clone)]
struct InodeTable(Arc<RwLock<InodeMap>>);

impl InodeTable {
    fn new() -> Self {
        Self(Arc::new(RwLock::new(InodeMap::new())))
    }

    fn path(&self, inode: u64) -> Option<String> {
        let map = self.0.read().unwrap_or_else(PoisonError::into_inner);
        map.get_path(inode).map(str::to_string)
    }

    fn get_or_create(&self, path: &str) -> u64 {
        let mut map = self.0.write().unwrap_or_else(PoisonError::into_inner);
        map.get_or_create(path)
    }
}

/// FUSE adapter that bridges sync FUSE callbacks to async FilesystemInterface
pub struct FuseAdapter {
    backend: Arc<dyn FilesystemInterface>,
    runtime: Arc<Runtime>,
    inodes: InodeTable,
    owner: Owner,
}

impl FuseAdapter {
    /// Requests are spawned onto `runtime`.
    pub fn with_runtime(backend: Arc<dyn FilesystemInterface>, runtime: Arc<Runtime>) -> Self {
        Self { backend, runtime, inodes: InodeTable::new(), owner: Owner::current() }
    }

    fn path_of(&self, inode: u64) -> Result<String, libc::c_int> {
        self.inodes.path(inode).ok_or(libc::ENOENT)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, libc::c_int> {
        let name = name.to_str().ok_or(libc::EINVAL)?;
        let parent_path = self.path_of(parent)?;
        Ok(join_path(&parent_path, name))
    }

    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }

    /// Reject a mutating request through the backend so the error is the
    /// backend's, then reply.
    fn reject<F, T>(&self, reply: impl FnOnce(libc::c_int) + Send + 'static, op: F)
    where
        F: Future<Output = Result<T, FsError>> + Send + 'static,
        T: Send + 'static,
    {
        self.spawn(async move {
            let errno = match op.await {
                Ok(_) => FsError::ReadOnly("unexpected success".to_string()).to_errno(),
                Err(e) => e.to_errno(),
            };
            reply(errno);
        });
    }
}

fn to_fuse_kind(kind: FileType) -> FuseFileType {
    match kind {
        FileType::RegularFile => FuseFileType::RegularFile,
        FileType::Directory => FuseFileType::Directory,
    }
}

/// Convert our FileAttr to fuser FileAttr
fn to_fuse_attr(attr: &FileAttr, inode: u64, owner: Owner) -> fuser::FileAttr {
    let mtime = datetime_to_systemtime(attr.mtime);
    fuser::FileAttr {
        ino: inode,
        size: attr.size,
        blocks: attr.size.div_ceil(512),
        atime: mtime,
        mtime,
        ctime: mtime,
        crtime: mtime,
        kind: to_fuse_kind(attr.kind),
        perm: attr.mode as u16,
        nlink: attr.nlinks,
        uid: owner.uid,
        gid: owner.gid,
        rdev: 0,
        blksize: 4096,
        flags: 0,
    }
}

/// Convert chrono DateTime to SystemTime
fn datetime_to_systemtime(dt: chrono::DateTime<chrono::Utc>) -> SystemTime {
    let secs = dt.timestamp();
    let nanos = dt.timestamp_subsec_nanos();
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nanos as u64)
    }
}

/// Convert SystemTime to chrono DateTime
fn systemtime_to_datetime(st: SystemTime) -> chrono::DateTime<chrono::Utc> {
    let duration = st.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
    chrono::DateTime::from_timestamp(duration.as_secs() as i64, duration.subsec_nanos())
        .unwrap_or(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH)
}

fn time_or_now(t: TimeOrNow) -> chrono::DateTime<chrono::Utc> {
    match t {
        TimeOrNow::SpecificTime(st) => systemtime_to_datetime(st),
        TimeOrNow::Now => chrono::Utc::now(),
    }
}

/// Pack xattr names as a NUL-separated list.
fn xattr_list(names: &[String]) -> Vec<u8> {
    let mut buf = Vec::new();
    for name in names {
        buf.extend_from_slice(name.as_bytes());
        buf.push(0);
    }
    buf
}

fn reply_xattr(reply: ReplyXattr, data: &[u8], size: u32) {
    if size == 0 {
        reply.size(data.len() as u32);
    } else if data.len() > size as usize {
        reply.error(libc::ERANGE);
    } else {
        reply.data(data);
    }
}

macro_rules! try_reply {
    ($expr:expr, $reply:ident) => {
        match $expr {
            Ok(v) => v,
            Err(errno) => {
                $reply.error(errno);
                return;
            }
        }
    };
}

impl Filesystem for FuseAdapter {
    fn init(
        &mut self,
        _req: &Request,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        tracing::info!("FUSE filesystem initialized");
        Ok(())
    }

    fn destroy(&mut self) {
        tracing::info!("FUSE filesystem destroyed");
    }

    fn lookup(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = try_reply!(self.child_path(parent, name), reply);
        let backend = self.backend.clone();
        let inodes = self.inodes.clone();
        let owner = self.owner;

        self.spawn(async move {
            match backend.get_attr(&path).await {
                Ok(attr) => {
                    let inode = inodes.get_or_create(&path);
                    reply.entry(&ENTRY_TTL, &to_fuse_attr(&attr, inode, owner), 0);
                }
                Err(e) => {
                    tracing::debug!(%path, error = %e, "lookup failed");
                    reply.error(e.to_errno());
                }
            }
        });
    }

    fn getattr(&mut self, _req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();
        let owner = self.owner;

        self.spawn(async move {
            match backend.get_attr(&path).await {
                Ok(attr) => reply.attr(&ATTR_TTL, &to_fuse_attr(&attr, ino, owner)),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn setattr(
        &mut self,
        _req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.reject(
            move |errno| reply.error(errno),
            async move {
                if let Some(mode) = mode {
                    backend.chmod(&path, mode).await
                } else if uid.is_some() || gid.is_some() {
                    backend.chown(&path, uid.unwrap_or(u32::MAX), gid.unwrap_or(u32::MAX)).await
                } else if let Some(size) = size {
                    backend.truncate(&path, size).await
                } else {
                    let attr = SetAttr {
                        atime: atime.map(time_or_now),
                        mtime: mtime.map(time_or_now),
                    };
                    backend.set_attr(&path, attr).await.map(|_| ())
                }
            },
        );
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.read_symlink(&path).await {
                Ok(target) => reply.data(target.as_bytes()),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn mknod(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let path = try_reply!(self.child_path(parent, name), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.create_node(&path, mode).await },
        );
    }

    fn mkdir(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let path = try_reply!(self.child_path(parent, name), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.create_dir(&path, mode).await },
        );
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = try_reply!(self.child_path(parent, name), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.delete_file(&path).await },
        );
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = try_reply!(self.child_path(parent, name), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.remove_dir(&path).await },
        );
    }

    fn symlink(
        &mut self,
        _req: &Request,
        parent: u64,
        link_name: &OsStr,
        target: &Path,
        reply: ReplyEntry,
    ) {
        let link = try_reply!(self.child_path(parent, link_name), reply);
        let target = target.to_string_lossy().into_owned();
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.create_symlink(&target, &link).await },
        );
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let from = try_reply!(self.child_path(parent, name), reply);
        let to = try_reply!(self.child_path(newparent, newname), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.rename(&from, &to).await },
        );
    }

    fn link(
        &mut self,
        _req: &Request,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let target = try_reply!(self.path_of(ino), reply);
        let link = try_reply!(self.child_path(newparent, newname), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.create_link(&target, &link).await },
        );
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.open(&path, flags).await {
                Ok(fh) => reply.opened(fh, 0),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        if offset < 0 {
            reply.error(libc::EINVAL);
            return;
        }
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.read_file(&path, offset as u64, size).await {
                Ok(data) => reply.data(&data),
                Err(e) => {
                    tracing::debug!(%path, offset, size, error = %e, "read failed");
                    reply.error(e.to_errno());
                }
            }
        });
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        let data = data.to_vec();
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.write_file(&path, offset.max(0) as u64, &data).await },
        );
    }

    fn flush(&mut self, _req: &Request, ino: u64, fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.flush(&path, fh).await {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn release(
        &mut self,
        _req: &Request,
        ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.release(&path, fh).await {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn fsync(&mut self, _req: &Request, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.fsync(&path, fh, datasync).await {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn opendir(&mut self, _req: &Request, ino: u64, _flags: i32, reply: ReplyOpen) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.open_dir(&path).await {
                Ok(fh) => reply.opened(fh, 0),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();
        let inodes = self.inodes.clone();

        self.spawn(async move {
            let entries = match backend.read_dir(&path).await {
                Ok(entries) => entries,
                Err(e) => {
                    reply.error(e.to_errno());
                    return;
                }
            };

            let skip = usize::try_from(offset).unwrap_or(0);
            for (i, entry) in entries.iter().enumerate().skip(skip) {
                let entry_ino = match entry.name.as_str() {
                    "." => ino,
                    ".." => inodes.get_or_create(parent_path(&path)),
                    name => inodes.get_or_create(&join_path(&path, name)),
                };
                let buffer_full =
                    reply.add(entry_ino, (i + 1) as i64, to_fuse_kind(entry.kind), &entry.name);
                if buffer_full {
                    break;
                }
            }

            reply.ok();
        });
    }

    fn releasedir(&mut self, _req: &Request, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn fsyncdir(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _datasync: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request, _ino: u64, reply: ReplyStatfs) {
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.statfs().await {
                Ok(stats) => reply.statfs(
                    stats.blocks,
                    stats.bfree,
                    stats.bavail,
                    stats.files,
                    stats.ffree,
                    stats.bsize,
                    stats.namelen,
                    stats.bsize,
                ),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn setxattr(
        &mut self,
        _req: &Request,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        let name = name.to_string_lossy().into_owned();
        let value = value.to_vec();
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.setxattr(&path, &name, &value).await },
        );
    }

    fn getxattr(&mut self, _req: &Request, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let path = try_reply!(self.path_of(ino), reply);
        let name = name.to_string_lossy().into_owned();
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.getxattr(&path, &name).await {
                Ok(value) => reply_xattr(reply, &value, size),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn listxattr(&mut self, _req: &Request, ino: u64, size: u32, reply: ReplyXattr) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.listxattr(&path).await {
                Ok(names) => reply_xattr(reply, &xattr_list(&names), size),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn removexattr(&mut self, _req: &Request, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = try_reply!(self.path_of(ino), reply);
        let name = name.to_string_lossy().into_owned();
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.removexattr(&path, &name).await },
        );
    }

    fn access(&mut self, _req: &Request, ino: u64, mask: i32, reply: ReplyEmpty) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();

        self.spawn(async move {
            match backend.access(&path, mask).await {
                Ok(()) => reply.ok(),
                Err(e) => reply.error(e.to_errno()),
            }
        });
    }

    fn create(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = try_reply!(self.child_path(parent, name), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.create_file(&path, mode).await },
        );
    }

    fn ioctl(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _flags: u32,
        _cmd: u32,
        _in_data: &[u8],
        _out_size: u32,
        reply: ReplyIoctl,
    ) {
        reply.error(libc::ENOTTY);
    }

    fn fallocate(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        _offset: i64,
        length: i64,
        _mode: i32,
        reply: ReplyEmpty,
    ) {
        let path = try_reply!(self.path_of(ino), reply);
        let backend = self.backend.clone();
        self.reject(
            move |errno| reply.error(errno),
            async move { backend.truncate(&path, length.max(0) as u64).await },
        );
    }
}
