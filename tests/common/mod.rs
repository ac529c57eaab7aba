#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Fake `docker`: logs `docker <args>` and answers like a small host with
/// three volumes, two running containers and a present helper image.
const MOCK_DOCKER: &str = r#"#!/usr/bin/env bash
echo "docker $*" >> "__LOG__"
ARGS="$*"
case "$1" in
  ps)
    printf 'container1\ncontainer2\n'
    ;;
  inspect)
    case "${@: -1}" in
      container1) echo "vol1" ;;
      container2) echo "vol2" ;;
      *) echo "Error: No such object" >&2; exit 1 ;;
    esac
    ;;
  image)
    img="$3"
    if [[ "$ARGS" == *"{{.RepoDigests}}"* ]]; then
      if [[ "$img" == "myrepo:latest" ]]; then echo "[myrepo@sha256:12345]"; else echo "[]"; fi
    elif [[ "$ARGS" == *"{{.Created}}"* ]]; then
      case "$img" in
        pkg:latest) echo "2024-05-01T10:00:00.123456789Z" ;;
        base:old) echo "2024-04-01T10:00:00.5Z" ;;
        base:new) echo "2024-06-01T10:00:00.5Z" ;;
        base:blank) echo "" ;;
        *) echo "Error: No such image: $img" >&2; exit 1 ;;
      esac
    else
      if [[ -n "${MOCK_HELPER_ABSENT:-}" ]]; then echo "Error: No such image: $img" >&2; exit 1; fi
      echo "[{}]"
    fi
    ;;
  pull)
    case "$2" in
      missing:*|pkg:gone) echo "manifest unknown" >&2; exit 1 ;;
    esac
    ;;
  volume)
    printf 'vol1\nvol2\nvol3\n'
    ;;
  images)
    if [[ "$ARGS" == *"dangling=false"* ]]; then printf 'myrepo:latest\nlocal/dev:1\n'; fi
    if [[ "$ARGS" == *"dangling=true"* ]]; then echo "deadbeef0001"; fi
    ;;
  rmi)
    echo "Deleted: $2"
    ;;
  run)
    if [[ "$ARGS" == *"-v broken:/source"* ]]; then echo "bsdtar: read error" >&2; exit 3; fi
    hostdir=""
    for a in "$@"; do
      case "$a" in
        *:/backup) hostdir="${a%:/backup}" ;;
      esac
    done
    script="${@: -1}"
    target="${script##*> /backup/}"
    if [[ -n "$hostdir" ]]; then touch "$hostdir/$target"; fi
    ;;
esac
exit 0
"#;

const MOCK_CURL: &str = r#"#!/usr/bin/env bash
echo "curl $*" >> "__LOG__"
echo '{"results": [{"name": "v1", "images": [{"architecture": "amd64"}]}, {"name": "latest", "images": [{"architecture": "amd64"}, {"architecture": "arm64"}]}]}'
"#;

pub struct MockHost {
    pub dir: TempDir,
    pub bin_dir: PathBuf,
    pub log: PathBuf,
}

#[cfg(unix)]
fn write_executable(path: &Path, content: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, content).expect("write mock");
    let mut perm = fs::metadata(path).expect("stat mock").permissions();
    perm.set_mode(0o755);
    fs::set_permissions(path, perm).expect("chmod mock");
}

impl MockHost {
    #[cfg(unix)]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tmpdir");
        let bin_dir = dir.path().join("bin");
        fs::create_dir_all(&bin_dir).expect("mkdir bin");
        let log = dir.path().join("docker.log");
        let log_s = log.display().to_string();
        write_executable(&bin_dir.join("docker"), &MOCK_DOCKER.replace("__LOG__", &log_s));
        write_executable(&bin_dir.join("curl"), &MOCK_CURL.replace("__LOG__", &log_s));
        Self { dir, bin_dir, log }
    }

    /// Command for one of the crate's binaries wired to the mocks.
    pub fn command(&self, bin: &str) -> Command {
        let mut cmd = Command::new(bin);
        let path = std::env::var("PATH").unwrap_or_default();
        cmd.env("PATH", format!("{}:{}", self.bin_dir.display(), path))
            .env("DOCKERTOOLS_DOCKER", self.bin_dir.join("docker"))
            .env("DOCKERTOOLS_CURL", self.bin_dir.join("curl"))
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("DOCKERTOOLS_HELPER_IMAGE")
            .env_remove("DOCKERTOOLS_REGISTRY_API")
            .env_remove("package_tag")
            .env_remove("GITHUB_OUTPUT")
            .current_dir(self.dir.path());
        cmd
    }

    pub fn dockertools(&self, args: &[&str]) -> Output {
        self.command(env!("CARGO_BIN_EXE_dockertools"))
            .args(args)
            .output()
            .expect("failed to run dockertools")
    }

    pub fn log(&self) -> String {
        fs::read_to_string(&self.log).unwrap_or_default()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }
}

pub fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

pub fn describe(out: &Output) -> String {
    format!(
        "status: {:?}\nstdout:\n{}\nstderr:\n{}",
        out.status.code(),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}
