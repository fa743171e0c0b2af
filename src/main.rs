use anyhow::Context;
use asanafs::cache::Catalog;
use asanafs::config::Config;
use asanafs::fuse::{AsanaBackend, MountOptions};
use asanafs::remote::AsanaHttpClient;
use asanafs::render::TaskRenderer;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mount Asana workspaces, projects and tasks as a read-only filesystem.
#[derive(Debug, Parser)]
#[command(name = "asanafs", version, about)]
struct Cli {
    /// Directory to mount at (defaults to fuse.mount_point)
    mountpoint: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Asana personal access token
    #[arg(long, env = "ASANA_API_KEY", hide_env_values = true)]
    token: Option<String>,

    /// Fetch every workspace, project and task listing before mounting
    #[arg(long)]
    eager: bool,

    /// Allow other users to access the mount
    #[arg(long)]
    allow_other: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "asanafs=debug,info" } else { "asanafs=info,warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    if cli.eager {
        config.cache.eager = true;
    }
    if cli.allow_other {
        config.fuse.allow_other = true;
    }
    let mountpoint = cli.mountpoint.unwrap_or_else(|| PathBuf::from(&config.fuse.mount_point));

    let token = cli.token.context("No access token: set ASANA_API_KEY or pass --token")?;
    let client = AsanaHttpClient::new(&token, &config.remote)
        .context("Failed to build the Asana HTTP client")?;

    let runtime = Arc::new(
        tokio::runtime::Builder::new_multi_thread()
            .thread_name("asanafs")
            .enable_all()
            .build()
            .context("Failed to create tokio runtime")?,
    );

    let catalog = Arc::new(Catalog::new(Arc::new(client)));
    if config.cache.eager {
        let stats = runtime.block_on(catalog.warm()).context("Eager warm-up failed")?;
        tracing::info!(
            workspaces = stats.workspaces,
            projects = stats.projects,
            task_listings = stats.task_listings,
            "Catalog warmed"
        );
    }

    let backend = Arc::new(AsanaBackend::new(
        catalog,
        TaskRenderer::new(config.render.line_width),
    ));
    let options = MountOptions::from(&config.fuse);
    let session = asanafs::fuse::mount(backend, runtime.clone(), &mountpoint, &options)?;

    tracing::info!(mountpoint = %mountpoint.display(), "Serving; press Ctrl-C to unmount");
    runtime.block_on(tokio::signal::ctrl_c()).context("Failed to wait for Ctrl-C")?;

    tracing::info!("Unmounting");
    drop(session);

    Ok(())
}
