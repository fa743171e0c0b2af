// FUSE mount management
//
// Mounts an asanafs backend via FUSE. The mount is always read-only.

use super::{FilesystemInterface, FuseAdapter};
use crate::config::FuseConfig;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Mount options for FUSE filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Allow other users to access the filesystem
    pub allow_other: bool,

    /// Auto-unmount on process exit
    pub auto_unmount: bool,

    /// Filesystem name (for mtab)
    pub fsname: String,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self { allow_other: false, auto_unmount: false, fsname: "asanafs".to_string() }
    }
}

impl From<&FuseConfig> for MountOptions {
    fn from(config: &FuseConfig) -> Self {
        Self {
            allow_other: config.allow_other,
            auto_unmount: config.auto_unmount,
            fsname: config.fsname.clone(),
        }
    }
}

impl MountOptions {
    /// Convert to fuser mount options
    fn to_fuser_options(&self) -> Vec<fuser::MountOption> {
        let mut options = vec![
            fuser::MountOption::RO,
            fuser::MountOption::FSName(self.fsname.clone()),
            fuser::MountOption::Subtype("asanafs".to_string()),
            fuser::MountOption::NoExec,
        ];

        if self.allow_other {
            options.push(fuser::MountOption::AllowOther);
        }

        if self.auto_unmount {
            options.push(fuser::MountOption::AutoUnmount);
        }

        options
    }
}

/// Mount a filesystem backend via FUSE
///
/// Requests are served on `runtime`. The returned session keeps the
/// filesystem mounted until dropped.
pub fn mount(
    backend: Arc<dyn FilesystemInterface>,
    runtime: Arc<Runtime>,
    mountpoint: impl AsRef<Path>,
    options: &MountOptions,
) -> Result<fuser::BackgroundSession> {
    let mountpoint = mountpoint.as_ref();

    // Validate mountpoint exists and is a directory
    if !mountpoint.exists() {
        anyhow::bail!("Mount point does not exist: {}", mountpoint.display());
    }

    if !mountpoint.is_dir() {
        anyhow::bail!("Mount point is not a directory: {}", mountpoint.display());
    }

    let adapter = FuseAdapter::with_runtime(backend, runtime);
    let fuser_options = options.to_fuser_options();

    tracing::info!(mountpoint = %mountpoint.display(), fsname = %options.fsname, "Mounting");

    let session = fuser::spawn_mount2(adapter, mountpoint, &fuser_options)
        .with_context(|| format!("Failed to mount filesystem at {}", mountpoint.display()))?;

    tracing::info!("Filesystem mounted successfully");

    Ok(session)
}
