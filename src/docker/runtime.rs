#![allow(clippy::module_name_repetitions)]
//! Docker runtime discovery.

use std::env;
use std::io;
use std::path::PathBuf;

use which::which;

/// Locate the docker CLI: `DOCKERTOOLS_DOCKER` first, then `PATH`.
pub fn container_runtime_path() -> io::Result<PathBuf> {
    if let Ok(p) = env::var("DOCKERTOOLS_DOCKER") {
        let p = p.trim();
        if !p.is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    if let Ok(p) = which("docker") {
        return Ok(p);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "Docker is required but was not found in PATH.",
    ))
}
