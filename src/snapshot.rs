#![allow(clippy::module_name_repetitions)]
//! Volume snapshots through an ephemeral helper container.
//!
//! For each volume we run, one at a time:
//!
//! ```text
//! docker run --rm -v <vol>:/source:ro -v <dest>:/backup <helper> \
//!     sh -c "bsdtar -cf - -C /source . | <compress> > /backup/<vol>.tar.zstd"
//! ```
//!
//! The archive is always named `<vol>.tar.zstd`, whatever `--use-compress-program`
//! selects; consumers of the backups key on that name.
//!
//! Volumes run strictly sequentially so only one writer touches the
//! destination directory at a time. A failed volume does not stop the run:
//! remaining volumes are still attempted and the run then fails with the
//! first failing volume's exit code.
//!
//! An interrupted run can leave a truncated archive behind; such files are not
//! cleaned up and must not be trusted.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, instrument};

use crate::docker::{image_exists, pull_image};
use crate::errors::{exit_code_for_anyhow, SnapshotError};
use crate::inventory::list_volumes;
use crate::runner::{argv, CommandRunner, Invocation};
use crate::util::{reject_newlines, shell_escape};

pub const DEFAULT_HELPER_IMAGE: &str = "ghcr.io/ly4096x/dockertools-helper:latest";
pub const DEFAULT_COMPRESS_PROGRAM: &str = "zstd -T0";
pub const SOURCE_MOUNT: &str = "/source";
pub const BACKUP_MOUNT: &str = "/backup";
pub const ARCHIVE_EXTENSION: &str = "tar.zstd";

pub const MSG_DESTINATION_REQUIRED: &str = "Destination directory -d/--destination-dir is required.";
pub const MSG_ALL_WITH_VOLUMES: &str = "Cannot specify volumes when using -a/--all.";
pub const MSG_NO_VOLUMES: &str = "No volumes specified. Use -a/--all or name volumes.";

/// Raw `snapshot-volumes` arguments as parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct SnapshotArgs {
    pub destination_dir: Option<PathBuf>,
    pub all: bool,
    pub compress_program: Option<String>,
    pub volumes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeSelection {
    /// Every volume the runtime lists at resolution time.
    All,
    /// Exactly these, in the given order.
    Named(Vec<String>),
}

/// Validated arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotPlan {
    pub destination_dir: PathBuf,
    pub selection: VolumeSelection,
    pub compress_program: String,
}

impl SnapshotArgs {
    /// Check flag combinations; performs no I/O.
    pub fn validate(self) -> Result<SnapshotPlan, SnapshotError> {
        let destination_dir = match self.destination_dir {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => return Err(SnapshotError::Validation(MSG_DESTINATION_REQUIRED.to_string())),
        };
        if self.all && !self.volumes.is_empty() {
            return Err(SnapshotError::Validation(MSG_ALL_WITH_VOLUMES.to_string()));
        }
        if !self.all && self.volumes.is_empty() {
            return Err(SnapshotError::Validation(MSG_NO_VOLUMES.to_string()));
        }
        for v in &self.volumes {
            reject_newlines(v, "volume name").map_err(SnapshotError::Validation)?;
        }
        let compress_program = self
            .compress_program
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_COMPRESS_PROGRAM.to_string());
        reject_newlines(&compress_program, "compress program").map_err(SnapshotError::Validation)?;

        let selection = if self.all {
            VolumeSelection::All
        } else {
            VolumeSelection::Named(self.volumes)
        };
        Ok(SnapshotPlan {
            destination_dir,
            selection,
            compress_program,
        })
    }
}

/// One volume's backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotJob {
    pub volume: String,
    pub destination_dir: PathBuf,
    pub compress_program: String,
    pub output_file: PathBuf,
}

impl SnapshotJob {
    pub fn new(volume: &str, destination_dir: &Path, compress_program: &str) -> Self {
        Self {
            volume: volume.to_string(),
            destination_dir: destination_dir.to_path_buf(),
            compress_program: compress_program.to_string(),
            output_file: destination_dir.join(archive_name(volume)),
        }
    }

    /// Shell pipeline executed inside the helper container.
    pub fn pipeline(&self) -> String {
        let target = format!("{BACKUP_MOUNT}/{}", archive_name(&self.volume));
        format!(
            "bsdtar -cf - -C {SOURCE_MOUNT} . | {} > {}",
            self.compress_program,
            shell_escape(&target)
        )
    }

    /// Arguments to `docker` for this job.
    pub fn docker_args(&self, helper_image: &str) -> Vec<String> {
        vec![
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{}:{SOURCE_MOUNT}:ro", self.volume),
            "-v".to_string(),
            format!("{}:{BACKUP_MOUNT}", self.destination_dir.display()),
            helper_image.to_string(),
            "sh".to_string(),
            "-c".to_string(),
            self.pipeline(),
        ]
    }
}

/// `<volume>.tar.zstd`, independent of the compressor.
pub fn archive_name(volume: &str) -> String {
    format!("{volume}.{ARCHIVE_EXTENSION}")
}

/// Runtime settings for a snapshot run.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub docker: String,
    pub helper_image: String,
    /// Report what would run without touching the runtime or the filesystem.
    pub dry_run: bool,
}

/// Progress notifications for the caller to render.
#[derive(Debug)]
pub enum SnapshotEvent<'a> {
    NoVolumes,
    PullingHelper(&'a str),
    Started(&'a SnapshotJob),
    Finished(&'a SnapshotJob),
    Failed(&'a SnapshotJob, String),
    DryRun(String),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub written: Vec<PathBuf>,
}

/// Make a destination path absolute against the working directory.
pub fn absolute_destination(dir: &Path) -> Result<PathBuf, SnapshotError> {
    if dir.is_absolute() {
        Ok(dir.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(dir))
    }
}

/// Volumes to back up, resolved at call time.
pub fn resolve_volumes(
    runner: &dyn CommandRunner,
    docker: &str,
    selection: &VolumeSelection,
) -> Result<Vec<String>, SnapshotError> {
    match selection {
        VolumeSelection::Named(v) => Ok(v.clone()),
        VolumeSelection::All => {
            list_volumes(runner, docker).map_err(SnapshotError::Resolve)
        }
    }
}

/// Make sure the helper image is present locally, pulling it if not.
///
/// Returns whether a pull was needed.
pub fn ensure_helper_image(
    runner: &dyn CommandRunner,
    docker: &str,
    image: &str,
    on_event: &mut dyn FnMut(&SnapshotEvent<'_>),
) -> Result<bool, SnapshotError> {
    let present = image_exists(runner, docker, image).map_err(SnapshotError::Helper)?;
    if present {
        return Ok(false);
    }
    on_event(&SnapshotEvent::PullingHelper(image));
    pull_image(runner, docker, image).map_err(SnapshotError::Helper)?;
    Ok(true)
}

/// Run a validated snapshot plan.
#[instrument(level = "info", skip(runner, on_event), fields(dest = %plan.destination_dir.display()))]
pub fn snapshot_volumes(
    runner: &dyn CommandRunner,
    plan: &SnapshotPlan,
    opts: &SnapshotOptions,
    on_event: &mut dyn FnMut(&SnapshotEvent<'_>),
) -> Result<SnapshotSummary, SnapshotError> {
    let destination = absolute_destination(&plan.destination_dir)?;

    if opts.dry_run {
        return dry_run(plan, opts, &destination, on_event);
    }

    let volumes = resolve_volumes(runner, &opts.docker, &plan.selection)?;
    if volumes.is_empty() {
        on_event(&SnapshotEvent::NoVolumes);
        return Ok(SnapshotSummary::default());
    }

    ensure_helper_image(runner, &opts.docker, &opts.helper_image, on_event)?;
    fs::create_dir_all(&destination)?;

    let mut summary = SnapshotSummary::default();
    let mut failed: Vec<String> = Vec::new();
    let mut first_code: Option<i32> = None;

    for volume in &volumes {
        let job = SnapshotJob::new(volume, &destination, &plan.compress_program);
        on_event(&SnapshotEvent::Started(&job));
        info!(volume = %job.volume, output = %job.output_file.display(), "snapshot started");

        let (code, reason) = match runner.run(&opts.docker, &job.docker_args(&opts.helper_image)) {
            Ok(out) if out.success() => {
                summary.written.push(job.output_file.clone());
                on_event(&SnapshotEvent::Finished(&job));
                continue;
            }
            Ok(out) => (out.exit_code, out.stderr.trim().to_string()),
            Err(e) => (i32::from(exit_code_for_anyhow(&e)), format!("{e:#}")),
        };
        error!(volume = %job.volume, exit_code = code, "snapshot failed");
        on_event(&SnapshotEvent::Failed(&job, reason));
        failed.push(job.volume);
        first_code.get_or_insert(code);
    }

    match first_code {
        None => Ok(summary),
        Some(exit_code) => Err(SnapshotError::Volumes { failed, exit_code }),
    }
}

fn dry_run(
    plan: &SnapshotPlan,
    opts: &SnapshotOptions,
    destination: &Path,
    on_event: &mut dyn FnMut(&SnapshotEvent<'_>),
) -> Result<SnapshotSummary, SnapshotError> {
    let preview = |args: Vec<String>| {
        Invocation {
            program: opts.docker.clone(),
            args,
        }
        .preview()
    };
    on_event(&SnapshotEvent::DryRun(preview(argv([
        "image",
        "inspect",
        opts.helper_image.as_str(),
    ]))));
    let volumes = match &plan.selection {
        VolumeSelection::Named(v) => v.clone(),
        VolumeSelection::All => {
            on_event(&SnapshotEvent::DryRun(preview(argv(["volume", "ls", "-q"]))));
            return Ok(SnapshotSummary::default());
        }
    };
    let mut summary = SnapshotSummary::default();
    for volume in &volumes {
        let job = SnapshotJob::new(volume, destination, &plan.compress_program);
        on_event(&SnapshotEvent::DryRun(preview(job.docker_args(&opts.helper_image))));
        summary.written.push(job.output_file);
    }
    Ok(summary)
}
