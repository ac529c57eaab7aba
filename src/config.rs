#![allow(clippy::module_name_repetitions)]
//! Process configuration from the environment.
//!
//! Only the CLI entry points read the environment; the components receive the
//! resolved values explicitly.
//!
//! Recognized variables (a `.env` file in the working directory is honored):
//! - DOCKERTOOLS_DOCKER: docker CLI path (default: `docker` from PATH)
//! - DOCKERTOOLS_CURL: curl path (default: `curl` from PATH)
//! - DOCKERTOOLS_HELPER_IMAGE: snapshot helper image
//! - DOCKERTOOLS_REGISTRY_API: tag listing API base URL
//! - DOCKERTOOLS_COLOR: auto|always|never

use std::env;

use which::which;

use crate::docker::container_runtime_path;
use crate::snapshot::DEFAULT_HELPER_IMAGE;
use crate::tags::DEFAULT_REGISTRY_API;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub docker: String,
    pub curl: String,
    pub helper_image: String,
    pub registry_api: String,
}

fn env_nonempty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Config {
    /// Load `.env` (if any), then read the environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_env() -> Self {
        // Unresolvable binaries keep their bare name; the spawn error reports them later.
        let docker = container_runtime_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "docker".to_string());
        let curl = env_nonempty("DOCKERTOOLS_CURL")
            .or_else(|| which("curl").ok().map(|p| p.display().to_string()))
            .unwrap_or_else(|| "curl".to_string());
        Self {
            docker,
            curl,
            helper_image: env_nonempty("DOCKERTOOLS_HELPER_IMAGE")
                .unwrap_or_else(|| DEFAULT_HELPER_IMAGE.to_string()),
            registry_api: env_nonempty("DOCKERTOOLS_REGISTRY_API")
                .unwrap_or_else(|| DEFAULT_REGISTRY_API.to_string()),
        }
    }
}

/// Reference image for the CI update check (`package_tag`).
pub fn package_tag_from_env() -> Option<String> {
    env_nonempty("package_tag")
}
