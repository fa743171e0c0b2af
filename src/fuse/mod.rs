// FUSE interface implementation
//
// This module mounts the Asana projection as a read-only POSIX filesystem.

pub mod adapter;
pub mod backend;
pub mod interface;
pub mod mount;

pub use adapter::FuseAdapter;
pub use backend::AsanaBackend;
pub use interface::{DirEntry, FileAttr, FileType, FilesystemInterface, SetAttr, StatFs};
pub use mount::{MountOptions, mount};
