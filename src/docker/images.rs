#![allow(clippy::module_name_repetitions)]
//! Docker image helpers and the image maintenance commands
//! (`update-images`, `remove-none-images`).

use anyhow::{bail, Context, Result};
use tracing::{instrument, warn};

use crate::runner::{argv, CommandRunner};
use crate::util::non_empty_lines;

/// Return true if a docker image exists locally (without pulling).
pub fn image_exists(runner: &dyn CommandRunner, docker: &str, image: &str) -> Result<bool> {
    let out = runner.run(docker, &argv(["image", "inspect", image]))?;
    Ok(out.success())
}

/// `docker pull <image>`; a non-zero exit is an error carrying the runtime's stderr.
pub fn pull_image(runner: &dyn CommandRunner, docker: &str, image: &str) -> Result<()> {
    let out = runner
        .run(docker, &argv(["pull", image]))
        .with_context(|| format!("failed to run docker pull {image}"))?;
    if !out.success() {
        bail!(
            "docker pull {} exited with {}: {}",
            image,
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(())
}

/// `docker image inspect <image> --format <template>`, trimmed stdout.
pub fn inspect_image_format(
    runner: &dyn CommandRunner,
    docker: &str,
    image: &str,
    template: &str,
) -> Result<String> {
    let out = runner
        .run(
            docker,
            &argv(["image", "inspect", image, "--format", template]),
        )
        .with_context(|| format!("failed to run docker image inspect {image}"))?;
    if !out.success() {
        bail!(
            "docker image inspect {} exited with {}: {}",
            image,
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(out.stdout.trim().to_string())
}

fn list_images(
    runner: &dyn CommandRunner,
    docker: &str,
    dangling: bool,
    template: &str,
) -> Result<Vec<String>> {
    let filter = format!("dangling={dangling}");
    let out = runner.run(
        docker,
        &argv(["images", "--filter", filter.as_str(), "--format", template]),
    )?;
    if !out.success() {
        bail!(
            "docker images exited with {}: {}",
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(non_empty_lines(&out.stdout))
}

/// Outcome of one maintenance pass over a set of images.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Images the command acted on successfully.
    pub done: Vec<String>,
    /// Images skipped on purpose, e.g. locally built without a repo digest.
    pub skipped: Vec<String>,
    /// Images whose action failed, with a reason.
    pub failed: Vec<(String, String)>,
}

impl MaintenanceReport {
    pub fn ok(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Pull every tagged image that came from a registry.
///
/// Images without a repo digest were built locally; pulling them would fail or
/// replace them with an unrelated upstream image, so they are skipped.
#[instrument(level = "info", skip(runner))]
pub fn update_images(runner: &dyn CommandRunner, docker: &str) -> Result<MaintenanceReport> {
    let refs = list_images(runner, docker, false, "{{.Repository}}:{{.Tag}}")?;
    let mut report = MaintenanceReport::default();
    for image in refs {
        if image.contains("<none>") {
            report.skipped.push(image);
            continue;
        }
        let digests = match inspect_image_format(runner, docker, &image, "{{.RepoDigests}}") {
            Ok(d) => d,
            Err(e) => {
                warn!(%image, error = %e, "repo digest lookup failed");
                report.failed.push((image, e.to_string()));
                continue;
            }
        };
        if digests.is_empty() || digests == "[]" {
            report.skipped.push(image);
            continue;
        }
        match pull_image(runner, docker, &image) {
            Ok(()) => report.done.push(image),
            Err(e) => report.failed.push((image, e.to_string())),
        }
    }
    Ok(report)
}

/// Remove every dangling (`<none>:<none>`) image.
#[instrument(level = "info", skip(runner))]
pub fn remove_none_images(runner: &dyn CommandRunner, docker: &str) -> Result<MaintenanceReport> {
    let ids = list_images(runner, docker, true, "{{.ID}}")?;
    let mut report = MaintenanceReport::default();
    for id in ids {
        let out = runner.run(docker, &argv(["rmi", id.as_str()]))?;
        if out.success() {
            report.done.push(id);
        } else {
            report.failed.push((id, out.stderr.trim().to_string()));
        }
    }
    Ok(report)
}
