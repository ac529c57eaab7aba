#![allow(clippy::module_name_repetitions)]
//! Volume inventory: which running container uses which volume.
//!
//! Recomputed from the runtime on every call; nothing is cached.

use anyhow::{bail, Result};
use tracing::{instrument, warn};

use crate::runner::{argv, CommandRunner};
use crate::util::non_empty_lines;

/// Rendered for volumes no running container mounts.
pub const UNMAPPED: &str = "NONE";

/// Prints one volume name per line for every `volume`-type mount.
const MOUNTS_TEMPLATE: &str = r#"{{range .Mounts}}{{if eq .Type "volume"}}{{println .Name}}{{end}}{{end}}"#;

/// `docker volume ls -q`.
pub fn list_volumes(runner: &dyn CommandRunner, docker: &str) -> Result<Vec<String>> {
    let out = runner.run(docker, &argv(["volume", "ls", "-q"]))?;
    if !out.success() {
        bail!(
            "docker volume ls exited with {}: {}",
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(non_empty_lines(&out.stdout))
}

/// Names of running containers, in `docker ps` order.
pub fn list_running_containers(runner: &dyn CommandRunner, docker: &str) -> Result<Vec<String>> {
    let out = runner.run(docker, &argv(["ps", "--format", "{{.Names}}"]))?;
    if !out.success() {
        bail!(
            "docker ps exited with {}: {}",
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(non_empty_lines(&out.stdout))
}

/// Volumes mounted by `container`.
pub fn container_volumes(
    runner: &dyn CommandRunner,
    docker: &str,
    container: &str,
) -> Result<Vec<String>> {
    let out = runner.run(docker, &argv(["inspect", "--format", MOUNTS_TEMPLATE, container]))?;
    if !out.success() {
        bail!(
            "docker inspect {} exited with {}: {}",
            container,
            out.exit_code,
            out.stderr.trim()
        );
    }
    Ok(non_empty_lines(&out.stdout)
        .into_iter()
        .filter_map(|l| l.split_whitespace().next().map(str::to_string))
        .collect())
}

/// Every listed volume with the running containers mounting it (possibly none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMapping {
    pub entries: Vec<(String, Vec<String>)>,
}

impl VolumeMapping {
    /// Pair volumes with containers; keeps volume order, then container order.
    pub fn build(volumes: Vec<String>, pairs: &[(String, String)]) -> Self {
        let entries = volumes
            .into_iter()
            .map(|v| {
                let containers = pairs
                    .iter()
                    .filter(|(pv, _)| *pv == v)
                    .map(|(_, c)| c.clone())
                    .collect();
                (v, containers)
            })
            .collect();
        Self { entries }
    }

    /// Padding width: the longest volume name across all entries.
    pub fn width(&self) -> usize {
        self.entries
            .iter()
            .map(|(v, _)| v.chars().count())
            .max()
            .unwrap_or(0)
    }

    /// `volume -> container` lines; one per container, `NONE` when unmapped.
    pub fn render_lines(&self) -> Vec<String> {
        let width = self.width();
        let mut lines = Vec::new();
        for (volume, containers) in &self.entries {
            if containers.is_empty() {
                lines.push(format!("{volume:<width$} -> {UNMAPPED}"));
            } else {
                for c in containers {
                    lines.push(format!("{volume:<width$} -> {c}"));
                }
            }
        }
        lines
    }
}

/// Query the runtime and build the mapping.
#[instrument(level = "info", skip(runner))]
pub fn volume_mappings(runner: &dyn CommandRunner, docker: &str) -> Result<VolumeMapping> {
    let volumes = list_volumes(runner, docker)?;
    let containers = list_running_containers(runner, docker)?;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for container in containers {
        match container_volumes(runner, docker, &container) {
            Ok(vols) => {
                for v in vols {
                    pairs.push((v, container.clone()));
                }
            }
            // The container may have exited between `ps` and `inspect`.
            Err(e) => warn!(%container, error = %e, "skipping container"),
        }
    }
    Ok(VolumeMapping::build(volumes, &pairs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, ScriptedRunner};

    fn runtime() -> ScriptedRunner {
        ScriptedRunner::new()
            .on("docker", &["volume", "ls"], CommandOutput::ok("vol1\nvol2\nlonger_volume\n"))
            .on("docker", &["ps"], CommandOutput::ok("web\ndb\nworker\n"))
            .on_contains("docker", " web", CommandOutput::ok("vol1\nvol2\n"))
            .on_contains("docker", " db", CommandOutput::ok("vol2\n"))
            .on_contains("docker", " worker", CommandOutput::ok("\n"))
    }

    #[test]
    fn test_every_volume_appears_with_container_or_none() {
        let r = runtime();
        let m = volume_mappings(&r, "docker").expect("mappings");
        assert_eq!(
            m.render_lines(),
            vec![
                "vol1          -> web",
                "vol2          -> web",
                "vol2          -> db",
                "longer_volume -> NONE",
            ]
        );
    }

    #[test]
    fn test_width_is_longest_volume_even_if_unmapped() {
        let m = VolumeMapping::build(
            vec!["a".into(), "bbbbbb".into()],
            &[("a".into(), "c1".into())],
        );
        assert_eq!(m.width(), 6);
        assert_eq!(m.render_lines(), vec!["a      -> c1", "bbbbbb -> NONE"]);
    }

    #[test]
    fn test_no_running_containers_maps_everything_to_none() {
        let r = ScriptedRunner::new()
            .on("docker", &["volume", "ls"], CommandOutput::ok("vol1\nvol3\n"))
            .on("docker", &["ps"], CommandOutput::ok(""));
        let m = volume_mappings(&r, "docker").expect("mappings");
        assert_eq!(m.render_lines(), vec!["vol1 -> NONE", "vol3 -> NONE"]);
    }

    #[test]
    fn test_vanished_container_is_skipped() {
        let r = ScriptedRunner::new()
            .on("docker", &["volume", "ls"], CommandOutput::ok("vol1\n"))
            .on("docker", &["ps"], CommandOutput::ok("gone\nalive\n"))
            .on_contains("docker", " gone", CommandOutput::failed(1, "No such object: gone"))
            .on_contains("docker", " alive", CommandOutput::ok("vol1\n"));
        let m = volume_mappings(&r, "docker").expect("mappings");
        assert_eq!(m.render_lines(), vec!["vol1 -> alive"]);
    }

    #[test]
    fn test_volume_listing_failure_is_error() {
        let r = ScriptedRunner::new().on(
            "docker",
            &["volume", "ls"],
            CommandOutput::failed(1, "permission denied"),
        );
        assert!(volume_mappings(&r, "docker").is_err());
    }

    #[test]
    fn test_inspect_uses_exact_argument_vector() {
        let r = runtime();
        volume_mappings(&r, "docker").expect("mappings");
        let calls = r.transcript();
        assert_eq!(calls[0].args, argv(["volume", "ls", "-q"]));
        assert_eq!(calls[1].args, argv(["ps", "--format", "{{.Names}}"]));
        assert_eq!(calls[2].args, argv(["inspect", "--format", MOUNTS_TEMPLATE, "web"]));
    }
}
