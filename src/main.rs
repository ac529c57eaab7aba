mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

use crate::cli::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        dockertools::set_color_mode(mode);
    }
    let cfg = dockertools::Config::load();
    let _ = dockertools::telemetry_init();

    let runner = dockertools::SystemRunner::new(cli.verbose);
    match cli.command {
        Command::UpdateImages => commands::run_update_images(&runner, &cfg),
        Command::RemoveNoneImages => commands::run_remove_none_images(&runner, &cfg),
        Command::ListTags { image } => commands::run_list_tags(&runner, &cfg, &image),
        Command::PrintVolumeToContainerMappings => {
            commands::run_print_volume_mappings(&runner, &cfg)
        }
        Command::SnapshotVolumes {
            destination_dir,
            all,
            use_compress_program,
            dry_run,
            volumes,
        } => commands::run_snapshot_volumes(
            &runner,
            &cfg,
            destination_dir,
            all,
            use_compress_program,
            dry_run,
            volumes,
        ),
    }
}
