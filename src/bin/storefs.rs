//! storefs CLI
//!
//! Mount an ordered list of store directories as one flat namespace, or
//! inspect how names resolve without mounting.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use storefs::config::StoreFsConfig;
use storefs::{PathResolver, StoreEntries};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "storefs")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Union filesystem over an ordered list of store directories")]
#[command(long_about = "storefs - present several store directories as one\n\n\
    Every name is served from the first store that holds it. New files are\n\
    always created in the first store. Listings show every store's entries\n\
    in store order, duplicates included.\n\n\
    Examples:\n\
      storefs mount -s /data/s1 -s /data/s2 /mnt/union\n\
      storefs mount --config storefs.json\n\
      storefs resolve -s /data/s1 -s /data/s2 report.txt\n\
      storefs list -s /data/s1 -s /data/s2")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Store directory; repeat in priority order
    #[arg(short, long = "store", value_name = "DIR")]
    stores: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl StoreArgs {
    fn load(&self) -> Result<StoreFsConfig, Box<dyn std::error::Error>> {
        let base = match &self.config {
            Some(path) => StoreFsConfig::load(path)?,
            None => StoreFsConfig::default(),
        };
        Ok(base.with_stores(self.stores.clone()))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Mount the stores at a mount point (blocks until unmounted or signaled)
    #[cfg(feature = "fuse")]
    Mount {
        #[command(flatten)]
        stores: StoreArgs,

        /// Mount point; created if missing
        #[arg(value_name = "MOUNTPOINT")]
        mountpoint: Option<PathBuf>,

        /// Allow other users to access the mount
        #[arg(long)]
        allow_other: bool,

        /// Mount read-only
        #[arg(long)]
        read_only: bool,

        /// Kernel attribute cache lifetime in seconds
        #[arg(long, value_name = "SECS")]
        ttl: Option<u64>,
    },

    /// Print the physical path a name resolves to
    Resolve {
        #[command(flatten)]
        stores: StoreArgs,

        /// Virtual name (only the final component is used)
        #[arg(value_name = "NAME")]
        name: OsString,
    },

    /// List the merged namespace, one entry per line
    List {
        #[command(flatten)]
        stores: StoreArgs,

        /// Prefix each entry with the index of its store
        #[arg(long)]
        show_store: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        #[cfg(feature = "fuse")]
        Commands::Mount {
            stores,
            mountpoint,
            allow_other,
            read_only,
            ttl,
        } => {
            let mut config = stores.load()?.with_mountpoint(mountpoint);
            config.allow_other |= allow_other;
            config.read_only |= read_only;
            if let Some(ttl) = ttl {
                config.ttl_secs = ttl;
            }
            mount(&config)
        }

        Commands::Resolve { stores, name } => {
            let resolver = PathResolver::new(stores.load()?.store_list()?);
            let found = resolver.resolve(Path::new(&name))?;
            println!("{}\t{}", found.store, found.path.display());
            Ok(())
        }

        Commands::List { stores, show_store } => {
            let list = stores.load()?.store_list()?;
            for entry in StoreEntries::new(list) {
                let entry = entry?;
                if show_store {
                    println!("{}\t{}", entry.store, entry.name.to_string_lossy());
                } else {
                    println!("{}", entry.name.to_string_lossy());
                }
            }
            Ok(())
        }
    }
}

#[cfg(feature = "fuse")]
fn mount(config: &StoreFsConfig) -> Result<(), Box<dyn std::error::Error>> {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;
    use storefs::signal::{install_signal_handlers, ShutdownSignal};
    use storefs::{spawn_mount, MountOptions, StoreFs, StoreFuse, StoreOps};

    let stores = config.store_list()?;
    let mountpoint = config.mountpoint()?;
    fs::create_dir_all(mountpoint)?;

    let options = MountOptions {
        read_only: config.read_only,
        allow_other: config.allow_other,
        fsname: config.fsname.clone(),
        ..MountOptions::default()
    };

    for (i, root) in stores.iter().enumerate() {
        tracing::info!(store = i, root = %root.display(), "store");
    }

    let store_fs = StoreFs::new(stores);
    // Probe the creation target before handing it to the kernel.
    store_fs.statfs(Path::new("/"))?;

    let shutdown = Arc::new(ShutdownSignal::new());
    install_signal_handlers(shutdown.clone())?;

    let session = spawn_mount(
        StoreFuse::new(store_fs).with_ttl(config.ttl()),
        mountpoint,
        &options,
    )?;
    tracing::info!(mountpoint = %mountpoint.display(), "mounted");

    let signaled = shutdown.wait_until(Duration::from_millis(200), || session.guard.is_finished());
    if signaled {
        tracing::info!(signal = shutdown.signal_name(), "unmounting");
        drop(session);
        return Ok(());
    }

    tracing::info!(mountpoint = %mountpoint.display(), "unmounted externally");
    let fuser::BackgroundSession { guard, .. } = session;
    match guard.join() {
        Ok(result) => Ok(result?),
        Err(_) => Err("FUSE session thread panicked".into()),
    }
}
