#![allow(clippy::module_name_repetitions)]
//! Base image update detection for CI.
//!
//! The tracked images are the `FROM` lines of a build file. Each is compared
//! against one reference image (the last published package); a tracked image
//! created after the reference means the package needs a rebuild.
//!
//! Every uncertainty resolves toward "rebuild": a missing build file, an
//! unresolvable reference, or a tracked image that cannot be probed all count
//! as an update.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, instrument, warn};

use crate::docker::{inspect_image_format, pull_image};
use crate::runner::CommandRunner;
use crate::timestamp::NormalizedTimestamp;

/// Inputs of one update check, handed in by the caller.
#[derive(Debug, Clone)]
pub struct UpdateCheckConfig {
    pub build_file: PathBuf,
    /// Reference image; `None` behaves like a failed reference probe.
    pub reference_image: Option<String>,
    /// docker CLI to invoke.
    pub docker: String,
}

/// Per tracked image result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageCheck {
    Newer(NormalizedTimestamp),
    NotNewer(NormalizedTimestamp),
    ProbeFailed(String),
}

impl ImageCheck {
    pub fn has_update(&self) -> bool {
        !matches!(self, ImageCheck::NotNewer(_))
    }
}

#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub reference: NormalizedTimestamp,
    pub reference_error: Option<String>,
    pub images: Vec<(String, ImageCheck)>,
}

impl UpdateReport {
    pub fn has_update(&self) -> bool {
        self.images.iter().any(|(_, c)| c.has_update())
    }

    /// `1` when a rebuild is needed, `0` otherwise.
    pub fn result_value(&self) -> u8 {
        u8::from(self.has_update())
    }
}

/// Second whitespace-separated token of every line starting with `FROM `.
pub fn extract_from_images(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|l| l.starts_with("FROM "))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

pub fn read_tracked_images(build_file: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(build_file)?;
    Ok(extract_from_images(&content))
}

/// Pull `image`, read its creation time, and normalize it.
///
/// Output whose leading `YYYYMMDD_HHMMSS` does not parse is an error, so an
/// empty or placeholder answer takes the same fail-open path as a failed probe.
pub fn probe_timestamp(
    runner: &dyn CommandRunner,
    docker: &str,
    image: &str,
) -> Result<NormalizedTimestamp> {
    pull_image(runner, docker, image)?;
    let created = inspect_image_format(runner, docker, image, "{{.Created}}")
        .with_context(|| format!("failed to read creation time of {image}"))?;
    let ts = NormalizedTimestamp::normalize(&created);
    if ts.to_datetime().is_none() {
        bail!("unusable creation time for {image}: {created:?}");
    }
    Ok(ts)
}

/// Compare each tracked image against the reference, failing open.
#[instrument(level = "info", skip(runner, tracked, on_progress), fields(tracked = tracked.len()))]
pub fn check_images(
    runner: &dyn CommandRunner,
    docker: &str,
    reference_image: Option<&str>,
    tracked: &[String],
    on_progress: &mut dyn FnMut(&Progress<'_>),
) -> UpdateReport {
    let (reference, reference_error) = match reference_image {
        Some(r) => {
            on_progress(&Progress::Reference(r));
            match probe_timestamp(runner, docker, r) {
                Ok(ts) => (ts, None),
                Err(e) => {
                    warn!(reference = r, error = %e, "reference probe failed; assuming every image is newer");
                    on_progress(&Progress::ReferenceFailed(r));
                    (NormalizedTimestamp::min(), Some(format!("{e:#}")))
                }
            }
        }
        None => {
            warn!("no reference image configured; assuming every image is newer");
            (
                NormalizedTimestamp::min(),
                Some("no reference image configured".to_string()),
            )
        }
    };
    on_progress(&Progress::ReferenceTimestamp(&reference));

    let mut images = Vec::with_capacity(tracked.len());
    for image in tracked {
        let check = match probe_timestamp(runner, docker, image) {
            Ok(ts) if ts > reference => ImageCheck::Newer(ts),
            Ok(ts) => ImageCheck::NotNewer(ts),
            Err(e) => ImageCheck::ProbeFailed(format!("{e:#}")),
        };
        info!(%image, update = check.has_update(), "checked tracked image");
        on_progress(&Progress::Image(image, &check));
        images.push((image.clone(), check));
    }

    UpdateReport {
        reference,
        reference_error,
        images,
    }
}

/// Progress events, rendered by the caller.
#[derive(Debug)]
pub enum Progress<'a> {
    Reference(&'a str),
    ReferenceFailed(&'a str),
    ReferenceTimestamp(&'a NormalizedTimestamp),
    Image(&'a str, &'a ImageCheck),
}

impl Progress<'_> {
    /// Human-readable line for CI logs.
    pub fn render(&self) -> String {
        match self {
            Progress::Reference(r) => format!("Checking image {r}"),
            Progress::ReferenceFailed(r) => {
                format!("Could not fetch timestamp for {r}, assuming new.")
            }
            Progress::ReferenceTimestamp(ts) => format!("Latest package T={ts}"),
            Progress::Image(image, ImageCheck::Newer(ts)) => {
                format!("Checking image {image} ... has an update, T={ts}")
            }
            Progress::Image(image, ImageCheck::NotNewer(ts)) => {
                format!("Checking image {image} ... no update, T={ts}")
            }
            Progress::Image(image, ImageCheck::ProbeFailed(e)) => {
                format!("Checking image {image} ... Failed to check image {image}: {e}")
            }
        }
    }
}

/// Outcome of a full check including the build-file read.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Build file unreadable; treated as "update needed".
    BuildFileMissing(io::Error),
    Checked(UpdateReport),
}

impl CheckOutcome {
    pub fn result_value(&self) -> u8 {
        match self {
            CheckOutcome::BuildFileMissing(_) => 1,
            CheckOutcome::Checked(r) => r.result_value(),
        }
    }
}

/// Full update check: read the build file, then probe.
pub fn run_update_check(
    runner: &dyn CommandRunner,
    config: &UpdateCheckConfig,
    on_progress: &mut dyn FnMut(&Progress<'_>),
) -> CheckOutcome {
    let tracked = match read_tracked_images(&config.build_file) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %config.build_file.display(), error = %e, "build file unreadable");
            return CheckOutcome::BuildFileMissing(e);
        }
    };
    CheckOutcome::Checked(check_images(
        runner,
        &config.docker,
        config.reference_image.as_deref(),
        &tracked,
        on_progress,
    ))
}

/// The workflow command line consumed by CI.
pub fn set_output_line(value: u8) -> String {
    format!("::set-output name=result::{value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, ScriptedRunner};

    fn created(image: &str, raw: &str, r: ScriptedRunner) -> ScriptedRunner {
        r.on(
            "docker",
            &["image", "inspect", image, "--format", "{{.Created}}"],
            CommandOutput::ok(format!("{raw}\n")),
        )
    }

    fn check(r: &ScriptedRunner, reference: Option<&str>, tracked: &[&str]) -> UpdateReport {
        let tracked: Vec<String> = tracked.iter().map(|s| s.to_string()).collect();
        check_images(r, "docker", reference, &tracked, &mut |_: &Progress<'_>| {})
    }

    #[test]
    fn test_extract_from_images() {
        let df = "# syntax=docker/dockerfile:1\nFROM debian:bookworm AS base\nRUN echo FROM x\n\
                  FROM   alpine:3.20\nfrom lower:case\nFROM\nCOPY . .\n";
        assert_eq!(
            extract_from_images(df),
            vec!["debian:bookworm".to_string(), "alpine:3.20".to_string()]
        );
    }

    #[test]
    fn test_older_tracked_images_mean_no_update() {
        let r = ScriptedRunner::new();
        let r = created("ghcr.io/me/pkg:latest", "2024-05-01T00:00:00.5Z", r);
        let r = created("debian:bookworm", "2024-04-01T00:00:00.1Z", r);
        let r = created("alpine:3.20", "2024-05-01T00:00:00.9Z", r);
        let report = check(&r, Some("ghcr.io/me/pkg:latest"), &["debian:bookworm", "alpine:3.20"]);
        assert!(!report.has_update());
        assert_eq!(report.result_value(), 0);
        assert_eq!(report.reference.as_str(), "20240501_000000");
    }

    #[test]
    fn test_one_newer_image_means_update() {
        let r = ScriptedRunner::new();
        let r = created("pkg", "2024-05-01T00:00:00.0Z", r);
        let r = created("debian:bookworm", "2024-04-01T00:00:00.0Z", r);
        let r = created("alpine:3.20", "2024-05-02T08:00:00.0Z", r);
        let report = check(&r, Some("pkg"), &["debian:bookworm", "alpine:3.20"]);
        assert!(report.has_update());
        assert_eq!(
            report.images[1].1,
            ImageCheck::Newer(NormalizedTimestamp::normalize("2024-05-02T08:00:00.0Z"))
        );
        let log = r.log();
        assert_eq!(log[0], "docker pull pkg");
        assert_eq!(log[1], "docker image inspect pkg --format {{.Created}}");
        assert_eq!(log[2], "docker pull debian:bookworm");
    }

    #[test]
    fn test_reference_probe_failure_forces_update() {
        let r = ScriptedRunner::new()
            .on("docker", &["pull", "pkg"], CommandOutput::failed(1, "manifest unknown"));
        let r = created("debian:bookworm", "2001-01-01T00:00:00.0Z", r);
        let report = check(&r, Some("pkg"), &["debian:bookworm"]);
        assert_eq!(report.reference, NormalizedTimestamp::min());
        assert!(report.reference_error.is_some());
        assert_eq!(report.result_value(), 1);
    }

    #[test]
    fn test_missing_reference_config_forces_update() {
        let r = created("debian:bookworm", "2001-01-01T00:00:00.0Z", ScriptedRunner::new());
        let report = check(&r, None, &["debian:bookworm"]);
        assert_eq!(report.result_value(), 1);
    }

    #[test]
    fn test_tracked_probe_failure_fails_open() {
        let r = ScriptedRunner::new();
        let r = created("pkg", "2030-01-01T00:00:00.0Z", r);
        let r = r.on("docker", &["pull", "gone:1"], CommandOutput::failed(1, "not found"));
        let report = check(&r, Some("pkg"), &["gone:1"]);
        assert!(matches!(report.images[0].1, ImageCheck::ProbeFailed(_)));
        assert!(report.has_update());
    }

    #[test]
    fn test_empty_tracked_creation_time_fails_open() {
        let r = ScriptedRunner::new();
        let r = created("pkg", "2024-05-01T00:00:00.0Z", r);
        let r = created("base:1", "", r);
        let report = check(&r, Some("pkg"), &["base:1"]);
        assert!(
            matches!(report.images[0].1, ImageCheck::ProbeFailed(_)),
            "{:?}",
            report.images[0].1
        );
        assert_eq!(report.result_value(), 1);
    }

    #[test]
    fn test_garbage_reference_creation_time_fails_open() {
        let r = ScriptedRunner::new();
        let r = created("pkg", "<no value>", r);
        let r = created("base:1", "2030-01-01T00:00:00.0Z", r);
        let report = check(&r, Some("pkg"), &["base:1"]);
        assert_eq!(report.reference, NormalizedTimestamp::min());
        assert!(report.reference_error.is_some());
        assert!(matches!(report.images[0].1, ImageCheck::Newer(_)));
        assert_eq!(report.result_value(), 1);
    }

    #[test]
    fn test_creation_time_without_fraction_is_accepted() {
        let r = created("base:1", "2024-01-02T03:04:05Z", ScriptedRunner::new());
        let ts = probe_timestamp(&r, "docker", "base:1").expect("probe");
        assert_eq!(ts.as_str(), "20240102_030405Z");
    }

    #[test]
    fn test_no_tracked_images_means_no_update() {
        let r = created("pkg", "2030-01-01T00:00:00.0Z", ScriptedRunner::new());
        assert_eq!(check(&r, Some("pkg"), &[]).result_value(), 0);
    }

    #[test]
    fn test_missing_build_file_outcome_is_update() {
        let td = tempfile::tempdir().expect("tmpdir");
        let cfg = UpdateCheckConfig {
            build_file: td.path().join("Dockerfile"),
            reference_image: Some("pkg".into()),
            docker: "docker".into(),
        };
        let r = ScriptedRunner::new();
        let outcome = run_update_check(&r, &cfg, &mut |_: &Progress<'_>| {});
        assert!(matches!(outcome, CheckOutcome::BuildFileMissing(_)));
        assert_eq!(outcome.result_value(), 1);
        assert!(r.transcript().is_empty());
    }

    #[test]
    fn test_progress_lines() {
        let ts = NormalizedTimestamp::normalize("2024-01-02T03:04:05.0Z");
        assert_eq!(
            Progress::Image("a:1", &ImageCheck::Newer(ts.clone())).render(),
            "Checking image a:1 ... has an update, T=20240102_030405"
        );
        assert_eq!(
            Progress::ReferenceTimestamp(&ts).render(),
            "Latest package T=20240102_030405"
        );
        assert_eq!(set_output_line(1), "::set-output name=result::1");
    }
}
