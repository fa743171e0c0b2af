// AsanaBackend - read-only projection of the remote task tree

use super::interface::*;
use crate::cache::Catalog;
use crate::fs::error::{FsError, FsResult};
use crate::fs::path::{is_valid_name, normalize_path, path_components, segment_name};
use crate::fs::resolver::{PathResolver, ResolvedNode};
use crate::remote::Task;
use crate::render::TaskRenderer;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

const DIR_MODE: u32 = 0o555;
const FILE_MODE: u32 = 0o444;

/// Reads hold no per-handle state, so every open hands out the same handle.
pub const FILE_HANDLE: u64 = 0;

pub struct AsanaBackend {
    resolver: PathResolver,
    renderer: TaskRenderer,
}

impl AsanaBackend {
    pub fn new(catalog: Arc<Catalog>, renderer: TaskRenderer) -> Self {
        Self { resolver: PathResolver::new(catalog), renderer }
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.resolver.catalog()
    }

    async fn resolve(&self, path: &str) -> FsResult<(String, ResolvedNode)> {
        let normalized = normalize_path(path)?;
        let components = path_components(&normalized)?;
        let node = self.resolver.resolve(&components).await?;
        Ok((normalized, node))
    }

    /// Resolve a path that must name a task and load the full task record.
    async fn task_at(&self, path: &str) -> FsResult<Arc<Task>> {
        match self.resolve(path).await? {
            (_, ResolvedNode::Task { task, .. }) => Ok(self.catalog().task(&task.gid).await?),
            (normalized, _) => Err(FsError::IsADirectory(normalized)),
        }
    }

    fn dir_attr() -> FileAttr {
        FileAttr {
            kind: FileType::Directory,
            size: 0,
            mtime: DateTime::<Utc>::UNIX_EPOCH,
            mode: DIR_MODE,
            nlinks: 2,
        }
    }

    fn file_attr(&self, task: &Task) -> FsResult<FileAttr> {
        Ok(FileAttr {
            kind: FileType::RegularFile,
            size: self.renderer.size(task)?,
            mtime: self.renderer.modified_time(task),
            mode: FILE_MODE,
            nlinks: 1,
        })
    }

    /// Child names in remote order with `/` substituted, skipping names that
    /// still cannot be path segments and repeats of a name already listed.
    fn entries<'a>(names: impl Iterator<Item = &'a str>, kind: FileType) -> Vec<DirEntry> {
        let mut seen = HashSet::new();
        let mut entries = vec![
            DirEntry { name: ".".to_string(), kind: FileType::Directory },
            DirEntry { name: "..".to_string(), kind: FileType::Directory },
        ];

        for name in names.map(segment_name) {
            if !is_valid_name(&name) {
                tracing::debug!(name = %name, "skipping entry with unrepresentable name");
                continue;
            }
            if seen.insert(name.clone()) {
                entries.push(DirEntry { name: name.into_owned(), kind });
            }
        }

        entries
    }
}

#[async_trait::async_trait]
impl FilesystemInterface for AsanaBackend {
    async fn read_dir(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let catalog = self.catalog();
        match self.resolve(path).await? {
            (_, ResolvedNode::Root) => {
                let workspaces = catalog.workspaces().await?;
                Ok(Self::entries(workspaces.iter().map(|w| w.name.as_str()), FileType::Directory))
            }
            (_, ResolvedNode::Workspace(workspace)) => {
                let projects = catalog.projects(&workspace.gid).await?;
                Ok(Self::entries(projects.iter().map(|p| p.name.as_str()), FileType::Directory))
            }
            (_, ResolvedNode::Project { project, .. }) => {
                let tasks = catalog.task_listing(&project.gid).await?;
                Ok(Self::entries(tasks.iter().map(|t| t.name.as_str()), FileType::RegularFile))
            }
            (normalized, ResolvedNode::Task { .. }) => Err(FsError::NotADirectory(normalized)),
        }
    }

    async fn open_dir(&self, path: &str) -> FsResult<u64> {
        match self.resolve(path).await? {
            (_, node) if node.is_dir() => Ok(FILE_HANDLE),
            (normalized, _) => Err(FsError::NotADirectory(normalized)),
        }
    }

    async fn get_attr(&self, path: &str) -> FsResult<FileAttr> {
        match self.resolve(path).await? {
            (_, ResolvedNode::Task { task, .. }) => {
                let task = self.catalog().task(&task.gid).await?;
                self.file_attr(&task)
            }
            _ => Ok(Self::dir_attr()),
        }
    }

    async fn open(&self, path: &str, flags: i32) -> FsResult<u64> {
        let (normalized, node) = self.resolve(path).await?;
        if node.is_dir() {
            return Err(FsError::IsADirectory(normalized));
        }
        if flags & libc::O_ACCMODE != libc::O_RDONLY || flags & libc::O_TRUNC != 0 {
            return Err(FsError::ReadOnly(format!("open for writing {}", normalized)));
        }
        Ok(FILE_HANDLE)
    }

    async fn read_file(&self, path: &str, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let task = self.task_at(path).await?;
        let data = self.renderer.render(&task)?;

        let len = data.len() as u64;
        if offset >= len {
            return Ok(Vec::new());
        }
        let start = offset as usize;
        let end = std::cmp::min(offset.saturating_add(size as u64), len) as usize;
        Ok(data[start..end].to_vec())
    }

    async fn statfs(&self) -> FsResult<StatFs> {
        Ok(StatFs { blocks: 0, bfree: 0, bavail: 0, files: 0, ffree: 0, bsize: 4096, namelen: 255 })
    }
}
