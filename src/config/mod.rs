use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub fuse: FuseConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub page_size: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Populate workspaces, projects and task listings before mounting.
    pub eager: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    pub mount_point: String,
    pub allow_other: bool,
    pub auto_unmount: bool,
    pub fsname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Notes at least this many characters long are emitted as a folded block.
    pub line_width: usize,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.asana.com/api/1.0".to_string(),
            timeout_secs: 30,
            page_size: 100,
        }
    }
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            mount_point: "/mnt/asana".to_string(),
            allow_other: false,
            auto_unmount: false,
            fsname: "asanafs".to_string(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { line_width: 80 }
    }
}

impl Config {
    /// Defaults, then `asanafs.toml` (or `path`), then `ASANAFS__*` variables.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name("asanafs").required(false),
        };

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("ASANAFS").separator("__").try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
