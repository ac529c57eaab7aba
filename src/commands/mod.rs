use std::path::PathBuf;
use std::process::ExitCode;

use dockertools::{
    color_enabled_stderr, exit_code_for_anyhow, exit_code_for_snapshot_error, log_error_stderr,
    log_info_stderr, log_warn_stderr, CommandRunner, Config, MaintenanceReport, SnapshotArgs,
    SnapshotEvent, SnapshotOptions,
};

fn report_maintenance(what: &str, report: &MaintenanceReport) -> ExitCode {
    let use_err = color_enabled_stderr();
    for image in &report.done {
        log_info_stderr(use_err, &format!("dockertools: {what}: {image}"));
    }
    for image in &report.skipped {
        log_warn_stderr(use_err, &format!("dockertools: skipped {image}"));
    }
    for (image, reason) in &report.failed {
        log_error_stderr(use_err, &format!("dockertools: {what} failed for {image}: {reason}"));
    }
    if report.ok() {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}

fn report_error(e: &anyhow::Error) -> ExitCode {
    log_error_stderr(color_enabled_stderr(), &format!("dockertools: {e:#}"));
    ExitCode::from(exit_code_for_anyhow(e))
}

pub fn run_update_images(runner: &dyn CommandRunner, cfg: &Config) -> ExitCode {
    match dockertools::update_images(runner, &cfg.docker) {
        Ok(report) => report_maintenance("updated", &report),
        Err(e) => report_error(&e),
    }
}

pub fn run_remove_none_images(runner: &dyn CommandRunner, cfg: &Config) -> ExitCode {
    match dockertools::remove_none_images(runner, &cfg.docker) {
        Ok(report) => report_maintenance("removed", &report),
        Err(e) => report_error(&e),
    }
}

pub fn run_list_tags(runner: &dyn CommandRunner, cfg: &Config, image: &str) -> ExitCode {
    match dockertools::list_tags(runner, &cfg.curl, &cfg.registry_api, image) {
        Ok(lines) => {
            for l in lines {
                println!("{l}");
            }
            ExitCode::from(0)
        }
        Err(e) => report_error(&e),
    }
}

pub fn run_print_volume_mappings(runner: &dyn CommandRunner, cfg: &Config) -> ExitCode {
    match dockertools::volume_mappings(runner, &cfg.docker) {
        Ok(mapping) => {
            for l in mapping.render_lines() {
                println!("{l}");
            }
            ExitCode::from(0)
        }
        Err(e) => report_error(&e),
    }
}

pub fn run_snapshot_volumes(
    runner: &dyn CommandRunner,
    cfg: &Config,
    destination_dir: Option<PathBuf>,
    all: bool,
    use_compress_program: Option<String>,
    dry_run: bool,
    volumes: Vec<String>,
) -> ExitCode {
    let args = SnapshotArgs {
        destination_dir,
        all,
        compress_program: use_compress_program,
        volumes,
    };
    let plan = match args.validate() {
        Ok(p) => p,
        Err(e) => {
            // Validation messages go to stdout; scripts grep for them.
            println!("{e}");
            return ExitCode::from(exit_code_for_snapshot_error(&e));
        }
    };
    let opts = SnapshotOptions {
        docker: cfg.docker.clone(),
        helper_image: cfg.helper_image.clone(),
        dry_run,
    };

    let use_err = color_enabled_stderr();
    let mut on_event = |ev: &SnapshotEvent<'_>| match ev {
        SnapshotEvent::NoVolumes => {
            log_warn_stderr(use_err, "dockertools: no volumes to snapshot.")
        }
        SnapshotEvent::PullingHelper(image) => log_info_stderr(
            use_err,
            &format!("dockertools: helper image {image} not present; pulling."),
        ),
        SnapshotEvent::Started(job) => log_info_stderr(
            use_err,
            &format!(
                "dockertools: snapshot {} -> {}",
                job.volume,
                job.output_file.display()
            ),
        ),
        SnapshotEvent::Finished(job) => {
            log_info_stderr(use_err, &format!("dockertools: snapshot {} done.", job.volume))
        }
        SnapshotEvent::Failed(job, reason) => log_error_stderr(
            use_err,
            &format!("dockertools: snapshot {} failed: {}", job.volume, reason),
        ),
        SnapshotEvent::DryRun(preview) => {
            eprintln!("dockertools: docker: {preview}");
        }
    };

    match dockertools::snapshot_volumes(runner, &plan, &opts, &mut on_event) {
        Ok(_) => {
            if dry_run {
                log_info_stderr(use_err, "dockertools: dry-run requested; not executing Docker.");
            }
            ExitCode::from(0)
        }
        Err(e) => {
            log_error_stderr(use_err, &format!("dockertools: {e}"));
            ExitCode::from(exit_code_for_snapshot_error(&e))
        }
    }
}
