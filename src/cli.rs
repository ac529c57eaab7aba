use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Pull newer versions of every registry-backed local image
    UpdateImages,

    /// Remove dangling (<none>:<none>) images
    RemoveNoneImages,

    /// List registry tags of an image with their architectures
    ListTags {
        /// Image name, e.g. nginx or grafana/grafana
        image: String,
    },

    /// Print which running container uses which volume
    PrintVolumeToContainerMappings,

    /// Back up volumes into compressed archives via a helper container
    #[command(
        after_long_help = "Examples:\n  dockertools snapshot-volumes -d ./backup vol1 vol2\n  dockertools snapshot-volumes -d /srv/backup -a\n  dockertools snapshot-volumes -d ./backup --use-compress-program gzip vol1\n"
    )]
    SnapshotVolumes {
        /// Host directory receiving <volume>.tar.zstd files
        #[arg(short = 'd', long = "destination-dir")]
        destination_dir: Option<PathBuf>,

        /// Snapshot every volume the runtime lists
        #[arg(short = 'a', long = "all")]
        all: bool,

        /// Compressor command fed by bsdtar (default: zstd -T0)
        #[arg(long = "use-compress-program")]
        use_compress_program: Option<String>,

        /// Print what would run, but do not execute
        #[arg(long)]
        dry_run: bool,

        /// Volumes to snapshot, in order
        volumes: Vec<String>,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "dockertools",
    version,
    about = "Maintain local Docker images and back up volumes."
)]
pub(crate) struct Cli {
    /// Print every docker/curl invocation
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    /// Colorize stderr output: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<dockertools::ColorMode>,

    #[command(subcommand)]
    pub(crate) command: Command,
}
